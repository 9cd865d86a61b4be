use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Course;
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.create" => Some(handle_create(state, req)),
        "courses.list" => Some(handle_list(state, req)),
        "courses.update" => Some(handle_update(state, req)),
        "courses.delete" => Some(handle_delete(state, req)),
        "courses.enroll" => Some(handle_enroll(state, req, true)),
        "courses.drop" => Some(handle_enroll(state, req, false)),
        _ => None,
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_id = req.params.get("courseId").and_then(|v| v.as_str());
    let course_name = req.params.get("courseName").and_then(|v| v.as_str());
    let credit_hours = req.params.get("creditHours").and_then(|v| v.as_i64());
    let (Some(course_id), Some(course_name), Some(credit_hours)) =
        (course_id, course_name, credit_hours)
    else {
        return err(
            &req.id,
            "bad_params",
            "missing params.courseId, courseName or creditHours",
            None,
        );
    };

    if workspace
        .courses
        .records()
        .iter()
        .any(|c| c.course_id == course_id)
    {
        return err(
            &req.id,
            "validation_failed",
            format!("course {} already exists", course_id),
            None,
        );
    }

    let course = Course {
        course_id: course_id.to_string(),
        course_name: course_name.to_string(),
        credit_hours: credit_hours as i32,
        faculty_name: req
            .params
            .get("facultyName")
            .and_then(|v| v.as_str())
            .map(String::from),
        class_days: req
            .params
            .get("classDays")
            .and_then(|v| v.as_str())
            .map(String::from),
        class_times: req
            .params
            .get("classTimes")
            .and_then(|v| v.as_str())
            .map(String::from),
        class_dates: req
            .params
            .get("classDates")
            .and_then(|v| v.as_str())
            .map(String::from),
    };

    match workspace.courses.append(course.clone()) {
        Ok(()) => ok(&req.id, json!({ "course": course })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let courses = workspace.courses.records();
    ok(
        &req.id,
        json!({ "courses": courses, "total": courses.len() }),
    )
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(course_id) = req.params.get("courseId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.courseId", None);
    };

    let Some(idx) = workspace
        .courses
        .records()
        .iter()
        .position(|c| c.course_id == course_id)
    else {
        return err(
            &req.id,
            "not_found",
            format!("no course with id {}", course_id),
            None,
        );
    };

    let mut next = workspace.courses.records().to_vec();
    let course = &mut next[idx];
    if let Some(v) = req.params.get("courseName").and_then(|v| v.as_str()) {
        course.course_name = v.to_string();
    }
    if let Some(v) = req.params.get("creditHours").and_then(|v| v.as_i64()) {
        course.credit_hours = v as i32;
    }
    if let Some(v) = req.params.get("facultyName").and_then(|v| v.as_str()) {
        course.faculty_name = Some(v.to_string());
    }
    if let Some(v) = req.params.get("classDays").and_then(|v| v.as_str()) {
        course.class_days = Some(v.to_string());
    }
    if let Some(v) = req.params.get("classTimes").and_then(|v| v.as_str()) {
        course.class_times = Some(v.to_string());
    }
    if let Some(v) = req.params.get("classDates").and_then(|v| v.as_str()) {
        course.class_dates = Some(v.to_string());
    }
    let updated = next[idx].clone();

    match workspace.courses.commit(next) {
        Ok(()) => ok(&req.id, json!({ "course": updated })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(course_id) = req.params.get("courseId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.courseId", None);
    };

    let Some(idx) = workspace
        .courses
        .records()
        .iter()
        .position(|c| c.course_id == course_id)
    else {
        return err(
            &req.id,
            "not_found",
            format!("no course with id {}", course_id),
            None,
        );
    };
    let mut next = workspace.courses.records().to_vec();
    next.remove(idx);

    match workspace.courses.commit(next) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

/// Enrollment mutates the student record's course list. Adding is
/// idempotent; dropping a course the student never had is a no-op.
fn handle_enroll(state: &mut AppState, req: &Request, add: bool) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = req.params.get("studentId").and_then(|v| v.as_str());
    let course_id = req.params.get("courseId").and_then(|v| v.as_str());
    let (Some(student_id), Some(course_id)) = (student_id, course_id) else {
        return err(
            &req.id,
            "bad_params",
            "missing params.studentId or params.courseId",
            None,
        );
    };

    if add
        && !workspace
            .courses
            .records()
            .iter()
            .any(|c| c.course_id == course_id)
    {
        return err(
            &req.id,
            "not_found",
            format!("no course with id {}", course_id),
            None,
        );
    }

    let Some(idx) = workspace
        .students
        .records()
        .iter()
        .position(|u| u.user_id == student_id)
    else {
        return err(
            &req.id,
            "not_found",
            format!("no student with id {}", student_id),
            None,
        );
    };

    let mut next = workspace.students.records().to_vec();
    let courses = &mut next[idx].enrolled_courses;
    if add {
        if !courses.iter().any(|c| c == course_id) {
            courses.push(course_id.to_string());
        }
    } else {
        courses.retain(|c| c != course_id);
    }
    let enrolled = next[idx].enrolled_courses.clone();

    match workspace.students.commit(next) {
        Ok(()) => ok(&req.id, json!({ "enrolledCourses": enrolled })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}
