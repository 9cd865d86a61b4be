use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{now_stamp, Assignment, Grade, Submission};
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.create" => Some(handle_assignment_create(state, req)),
        "assignments.list" => Some(handle_assignment_list(state, req)),
        "submissions.create" => Some(handle_submission_create(state, req)),
        "submissions.list" => Some(handle_submission_list(state, req)),
        "grades.set" => Some(handle_grade_set(state, req)),
        "grades.listByStudent" => Some(handle_grades_by_student(state, req)),
        _ => None,
    }
}

fn handle_assignment_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_id = req.params.get("courseId").and_then(|v| v.as_str());
    let teacher_id = req.params.get("teacherId").and_then(|v| v.as_str());
    let title = req.params.get("title").and_then(|v| v.as_str());
    let (Some(course_id), Some(teacher_id), Some(title)) = (course_id, teacher_id, title) else {
        return err(
            &req.id,
            "bad_params",
            "missing params.courseId, params.teacherId or params.title",
            None,
        );
    };

    let assignment = Assignment {
        id: workspace
            .assignments
            .records()
            .iter()
            .map(|a| a.id)
            .max()
            .unwrap_or(0)
            + 1,
        course_id: course_id.to_string(),
        teacher_id: teacher_id.to_string(),
        title: title.to_string(),
        description: req
            .params
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        due_date: req
            .params
            .get("dueDate")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    };

    match workspace.assignments.append(assignment.clone()) {
        Ok(()) => ok(&req.id, json!({ "assignment": assignment })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

fn handle_assignment_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_filter = req.params.get("courseId").and_then(|v| v.as_str());
    let assignments: Vec<&Assignment> = workspace
        .assignments
        .records()
        .iter()
        .filter(|a| course_filter.map_or(true, |c| a.course_id == c))
        .collect();
    ok(
        &req.id,
        json!({ "assignments": assignments, "total": assignments.len() }),
    )
}

fn handle_submission_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let assignment_id = req.params.get("assignmentId").and_then(|v| v.as_i64());
    let student_id = req.params.get("studentId").and_then(|v| v.as_str());
    let file_name = req.params.get("fileName").and_then(|v| v.as_str());
    let (Some(assignment_id), Some(student_id), Some(file_name)) =
        (assignment_id, student_id, file_name)
    else {
        return err(
            &req.id,
            "bad_params",
            "missing params.assignmentId, params.studentId or params.fileName",
            None,
        );
    };

    if !workspace
        .assignments
        .records()
        .iter()
        .any(|a| a.id == assignment_id)
    {
        return err(
            &req.id,
            "not_found",
            format!("no assignment with id {}", assignment_id),
            None,
        );
    }

    let submission = Submission {
        submission_id: workspace
            .submissions
            .records()
            .iter()
            .map(|s| s.submission_id)
            .max()
            .unwrap_or(0)
            + 1,
        assignment_id,
        student_id: student_id.to_string(),
        file_name: file_name.to_string(),
        file_path: req
            .params
            .get("filePath")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        timestamp: now_stamp(),
    };

    match workspace.submissions.append(submission.clone()) {
        Ok(()) => ok(&req.id, json!({ "submission": submission })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

fn handle_submission_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let assignment_filter = req.params.get("assignmentId").and_then(|v| v.as_i64());
    let submissions: Vec<&Submission> = workspace
        .submissions
        .records()
        .iter()
        .filter(|s| assignment_filter.map_or(true, |a| s.assignment_id == a))
        .collect();
    ok(
        &req.id,
        json!({ "submissions": submissions, "total": submissions.len() }),
    )
}

/// One grade per student+course pair; setting it again overwrites.
fn handle_grade_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = req.params.get("studentId").and_then(|v| v.as_str());
    let course_id = req.params.get("courseId").and_then(|v| v.as_str());
    let teacher_id = req.params.get("teacherId").and_then(|v| v.as_str());
    let grade = req.params.get("grade").and_then(|v| v.as_str());
    let (Some(student_id), Some(course_id), Some(teacher_id), Some(grade)) =
        (student_id, course_id, teacher_id, grade)
    else {
        return err(
            &req.id,
            "bad_params",
            "missing params.studentId, courseId, teacherId or grade",
            None,
        );
    };

    let record = Grade {
        student_id: student_id.to_string(),
        course_id: course_id.to_string(),
        teacher_id: teacher_id.to_string(),
        grade: grade.to_string(),
    };

    let mut next = workspace.grades.records().to_vec();
    match next
        .iter()
        .position(|g| g.student_id == student_id && g.course_id == course_id)
    {
        Some(idx) => next[idx] = record.clone(),
        None => next.push(record.clone()),
    }

    match workspace.grades.commit(next) {
        Ok(()) => ok(&req.id, json!({ "grade": record })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

fn handle_grades_by_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(student_id) = req.params.get("studentId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.studentId", None);
    };

    let grades: Vec<&Grade> = workspace
        .grades
        .records()
        .iter()
        .filter(|g| g.student_id == student_id)
        .collect();
    ok(&req.id, json!({ "grades": grades, "total": grades.len() }))
}
