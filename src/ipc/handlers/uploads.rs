use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::upload::{self, UploadError, UploadPolicy};
use serde_json::json;
use std::path::PathBuf;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "uploads.create" => Some(handle_create(state, req)),
        "uploads.visible" => Some(handle_visible(state, req)),
        "uploads.list" => Some(handle_list(state, req)),
        "uploads.listByRole" => Some(handle_list_by_role(state, req)),
        "uploads.listByUploader" => Some(handle_list_by_uploader(state, req)),
        _ => None,
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let source = req
        .params
        .get("sourcePath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let uploaded_by = req.params.get("uploadedBy").and_then(|v| v.as_str());
    let role = req.params.get("role").and_then(|v| v.as_str());
    let (Some(source), Some(uploaded_by), Some(role)) = (source, uploaded_by, role) else {
        return err(
            &req.id,
            "bad_params",
            "missing params.sourcePath, params.uploadedBy or params.role",
            None,
        );
    };

    // Caller-chosen visibility, trusted as-is. Order and duplicates kept.
    let visible_to: Vec<String> = req
        .params
        .get("visibleTo")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    match upload::upload_file(
        workspace,
        &UploadPolicy::default(),
        &source,
        uploaded_by,
        role,
        visible_to,
    ) {
        Ok(record) => ok(&req.id, json!({ "upload": record })),
        Err(UploadError::Validation(msg)) => err(&req.id, "validation_failed", msg, None),
        Err(UploadError::Storage(e)) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

fn handle_visible(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let viewer_email = req.params.get("viewerEmail").and_then(|v| v.as_str());
    let viewer_role = req.params.get("viewerRole").and_then(|v| v.as_str());
    let (Some(viewer_email), Some(viewer_role)) = (viewer_email, viewer_role) else {
        return err(
            &req.id,
            "bad_params",
            "missing params.viewerEmail or params.viewerRole",
            None,
        );
    };

    let visible =
        upload::visible_records_for(workspace.uploads.records(), viewer_email, viewer_role);
    ok(
        &req.id,
        json!({ "uploads": visible, "total": visible.len() }),
    )
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let records = workspace.uploads.records();

    if let Some(needle) = req.params.get("find").and_then(|v| v.as_str()) {
        let found = upload::find(records, needle);
        return ok(&req.id, json!({ "uploads": found, "total": found.len() }));
    }

    let sort_by = req
        .params
        .get("sortBy")
        .and_then(|v| v.as_str())
        .unwrap_or("id");
    let uploads = upload::sorted(records, sort_by);
    ok(
        &req.id,
        json!({ "uploads": uploads, "total": uploads.len() }),
    )
}

fn handle_list_by_role(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(role) = req.params.get("role").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.role", None);
    };
    let uploads = upload::records_by_role(workspace.uploads.records(), role);
    ok(
        &req.id,
        json!({ "uploads": uploads, "total": uploads.len() }),
    )
}

fn handle_list_by_uploader(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(email) = req.params.get("email").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.email", None);
    };
    let uploads = upload::records_by_uploader(workspace.uploads.records(), email);
    ok(
        &req.id,
        json!({ "uploads": uploads, "total": uploads.len() }),
    )
}
