use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{Role, User};
use crate::store::{Collection, Workspace};
use crate::validate;
use serde_json::json;
use uuid::Uuid;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.create" => Some(handle_create(state, req)),
        "users.list" => Some(handle_list(state, req)),
        "users.update" => Some(handle_update(state, req)),
        "users.delete" => Some(handle_delete(state, req)),
        "users.find" => Some(handle_find(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        _ => None,
    }
}

/// Serialized user for responses: the plaintext password never leaves the
/// store files.
fn user_json(user: &User) -> serde_json::Value {
    let mut value = json!(user);
    if let Some(obj) = value.as_object_mut() {
        obj.remove("password");
    }
    value
}

fn with_each_pool<R>(
    workspace: &mut Workspace,
    mut f: impl FnMut(&mut Collection<User>) -> Option<R>,
) -> Option<R> {
    if let Some(r) = f(&mut workspace.students) {
        return Some(r);
    }
    if let Some(r) = f(&mut workspace.teachers) {
        return Some(r);
    }
    f(&mut workspace.admins)
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let role = req.params.get("role").and_then(|v| v.as_str());
    let first_name = req.params.get("firstName").and_then(|v| v.as_str());
    let last_name = req.params.get("lastName").and_then(|v| v.as_str());
    let email = req.params.get("email").and_then(|v| v.as_str());
    let password = req.params.get("password").and_then(|v| v.as_str());
    let (Some(role), Some(first_name), Some(last_name), Some(email), Some(password)) =
        (role, first_name, last_name, email, password)
    else {
        return err(
            &req.id,
            "bad_params",
            "missing params.role, firstName, lastName, email or password",
            None,
        );
    };
    let Some(role) = Role::parse(role) else {
        return err(&req.id, "bad_params", format!("unknown role: {}", role), None);
    };

    let full_name = format!("{} {}", first_name, last_name);
    for check in [
        validate::validate_name(&full_name),
        validate::validate_email(email),
        validate::validate_password(password),
    ] {
        if let Err(msg) = check {
            return err(&req.id, "validation_failed", msg, None);
        }
    }

    if workspace
        .all_users()
        .any(|u| u.email.eq_ignore_ascii_case(email))
    {
        return err(
            &req.id,
            "validation_failed",
            format!("a user with email {} already exists", email),
            None,
        );
    }

    let user_id = match req.params.get("userId").and_then(|v| v.as_str()) {
        Some(id) => {
            if let Err(msg) = validate::validate_user_id(id) {
                return err(&req.id, "validation_failed", msg, None);
            }
            id.to_string()
        }
        None => Uuid::new_v4().to_string(),
    };

    let user = User {
        user_id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role,
        active: true,
        student_no: req
            .params
            .get("studentNo")
            .and_then(|v| v.as_str())
            .map(String::from),
        major: req
            .params
            .get("major")
            .and_then(|v| v.as_str())
            .map(String::from),
        year: req
            .params
            .get("year")
            .and_then(|v| v.as_i64())
            .map(|y| y as i32),
        department: req
            .params
            .get("department")
            .and_then(|v| v.as_str())
            .map(String::from),
        specialization: req
            .params
            .get("specialization")
            .and_then(|v| v.as_str())
            .map(String::from),
        enrolled_courses: Vec::new(),
    };

    match workspace.users_for_role_mut(role).append(user.clone()) {
        Ok(()) => ok(&req.id, json!({ "user": user_json(&user) })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let users: Vec<serde_json::Value> = match req.params.get("role").and_then(|v| v.as_str()) {
        Some(tag) => {
            let Some(role) = Role::parse(tag) else {
                return err(&req.id, "bad_params", format!("unknown role: {}", tag), None);
            };
            workspace
                .users_for_role(role)
                .records()
                .iter()
                .filter(|u| u.role == role)
                .map(user_json)
                .collect()
        }
        None => workspace.all_users().map(user_json).collect(),
    };
    ok(&req.id, json!({ "users": users, "total": users.len() }))
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(user_id) = req.params.get("userId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.userId", None);
    };

    if let Some(email) = req.params.get("email").and_then(|v| v.as_str()) {
        if let Err(msg) = validate::validate_email(email) {
            return err(&req.id, "validation_failed", msg, None);
        }
    }
    if let Some(password) = req.params.get("password").and_then(|v| v.as_str()) {
        if let Err(msg) = validate::validate_password(password) {
            return err(&req.id, "validation_failed", msg, None);
        }
    }

    let params = req.params.clone();
    let updated = with_each_pool(workspace, |pool| {
        let idx = pool
            .records()
            .iter()
            .position(|u| u.user_id == user_id)?;
        let mut next = pool.records().to_vec();
        apply_user_fields(&mut next[idx], &params);
        let user = next[idx].clone();
        Some(pool.commit(next).map(|()| user))
    });

    match updated {
        Some(Ok(user)) => ok(&req.id, json!({ "user": user_json(&user) })),
        Some(Err(e)) => err(&req.id, "persist_failed", format!("{e:#}"), None),
        None => err(
            &req.id,
            "not_found",
            format!("no user with id {}", user_id),
            None,
        ),
    }
}

fn apply_user_fields(user: &mut User, params: &serde_json::Value) {
    if let Some(v) = params.get("firstName").and_then(|v| v.as_str()) {
        user.first_name = v.to_string();
    }
    if let Some(v) = params.get("lastName").and_then(|v| v.as_str()) {
        user.last_name = v.to_string();
    }
    if let Some(v) = params.get("email").and_then(|v| v.as_str()) {
        user.email = v.to_string();
    }
    if let Some(v) = params.get("password").and_then(|v| v.as_str()) {
        user.password = v.to_string();
    }
    if let Some(v) = params.get("active").and_then(|v| v.as_bool()) {
        user.active = v;
    }
    if let Some(v) = params.get("studentNo").and_then(|v| v.as_str()) {
        user.student_no = Some(v.to_string());
    }
    if let Some(v) = params.get("major").and_then(|v| v.as_str()) {
        user.major = Some(v.to_string());
    }
    if let Some(v) = params.get("year").and_then(|v| v.as_i64()) {
        user.year = Some(v as i32);
    }
    if let Some(v) = params.get("department").and_then(|v| v.as_str()) {
        user.department = Some(v.to_string());
    }
    if let Some(v) = params.get("specialization").and_then(|v| v.as_str()) {
        user.specialization = Some(v.to_string());
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(user_id) = req.params.get("userId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.userId", None);
    };

    let removed = with_each_pool(workspace, |pool| {
        let idx = pool
            .records()
            .iter()
            .position(|u| u.user_id == user_id)?;
        let mut next = pool.records().to_vec();
        next.remove(idx);
        Some(pool.commit(next))
    });

    match removed {
        Some(Ok(())) => ok(&req.id, json!({ "deleted": true })),
        Some(Err(e)) => err(&req.id, "persist_failed", format!("{e:#}"), None),
        None => err(
            &req.id,
            "not_found",
            format!("no user with id {}", user_id),
            None,
        ),
    }
}

fn handle_find(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(query) = req.params.get("query").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.query", None);
    };

    let needle = query.to_lowercase();
    let users: Vec<serde_json::Value> = workspace
        .all_users()
        .filter(|u| {
            u.full_name().to_lowercase().contains(&needle)
                || u.email.to_lowercase().contains(&needle)
                || u.user_id.to_lowercase().contains(&needle)
        })
        .map(user_json)
        .collect();
    ok(&req.id, json!({ "users": users, "total": users.len() }))
}

/// Plaintext equality against the stored password. Inactive accounts
/// cannot log in.
fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let email = req.params.get("email").and_then(|v| v.as_str());
    let password = req.params.get("password").and_then(|v| v.as_str());
    let (Some(email), Some(password)) = (email, password) else {
        return err(
            &req.id,
            "bad_params",
            "missing params.email or params.password",
            None,
        );
    };

    let found = workspace
        .all_users()
        .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password && u.active);
    match found {
        Some(user) => ok(&req.id, json!({ "user": user_json(user) })),
        None => err(&req.id, "auth_failed", "invalid email or password", None),
    }
}
