use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::Workspace;
use serde_json::json;
use std::path::PathBuf;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state
                .workspace_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match Workspace::open(&path) {
        Ok(workspace) => {
            let counts = json!({
                "students": workspace.students.len(),
                "teachers": workspace.teachers.len(),
                "admins": workspace.admins.len(),
                "courses": workspace.courses.len(),
                "uploads": workspace.uploads.len(),
            });
            state.workspace_path = Some(path.clone());
            state.workspace = Some(workspace);
            ok(
                &req.id,
                json!({ "workspacePath": path.to_string_lossy(), "counts": counts }),
            )
        }
        Err(e) => err(&req.id, "store_open_failed", format!("{e:#}"), None),
    }
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace_path) = state.workspace_path.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out = req
        .params
        .get("outPath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(out_path) = out else {
        return err(&req.id, "bad_params", "missing params.outPath", None);
    };

    match backup::export_workspace_bundle(&workspace_path, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

/// Restores the bundle into the target directory and opens it as the
/// current workspace so callers see the restored data immediately.
fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = req
        .params
        .get("inPath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(in_path) = in_path else {
        return err(&req.id, "bad_params", "missing params.inPath", None);
    };
    let target = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .or_else(|| state.workspace_path.clone());
    let Some(target) = target else {
        return err(
            &req.id,
            "bad_params",
            "missing params.path and no workspace selected",
            None,
        );
    };

    let summary = match backup::import_workspace_bundle(&in_path, &target) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "persist_failed", format!("{e:#}"), None),
    };
    match Workspace::open(&target) {
        Ok(workspace) => {
            state.workspace_path = Some(target.clone());
            state.workspace = Some(workspace);
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "restoredFiles": summary.restored_files,
                    "workspacePath": target.to_string_lossy(),
                }),
            )
        }
        Err(e) => err(&req.id, "store_open_failed", format!("{e:#}"), None),
    }
}
