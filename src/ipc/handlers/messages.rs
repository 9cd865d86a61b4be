use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{now_stamp, Message};
use serde_json::json;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "messages.send" => Some(handle_send(state, req)),
        "messages.inbox" => Some(handle_inbox(state, req)),
        "messages.markRead" => Some(handle_mark_read(state, req)),
        _ => None,
    }
}

fn handle_send(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let from_id = req.params.get("fromUserId").and_then(|v| v.as_str());
    let to_id = req.params.get("toUserId").and_then(|v| v.as_str());
    let body = req.params.get("message").and_then(|v| v.as_str());
    let (Some(from_id), Some(to_id), Some(body)) = (from_id, to_id, body) else {
        return err(
            &req.id,
            "bad_params",
            "missing params.fromUserId, params.toUserId or params.message",
            None,
        );
    };

    // Sender and recipient names/roles are denormalized into the record, so
    // both ends must exist at send time.
    let Some(from) = workspace.all_users().find(|u| u.user_id == from_id).cloned() else {
        return err(
            &req.id,
            "not_found",
            format!("no user with id {}", from_id),
            None,
        );
    };
    let Some(to) = workspace.all_users().find(|u| u.user_id == to_id).cloned() else {
        return err(
            &req.id,
            "not_found",
            format!("no user with id {}", to_id),
            None,
        );
    };

    let message = Message {
        message_id: workspace
            .messages
            .records()
            .iter()
            .map(|m| m.message_id)
            .max()
            .unwrap_or(0)
            + 1,
        from_user_id: from.user_id.clone(),
        from_user_name: from.full_name(),
        from_role: from.role.tag().to_string(),
        to_user_id: to.user_id.clone(),
        to_user_name: to.full_name(),
        to_role: to.role.tag().to_string(),
        message: body.to_string(),
        timestamp: now_stamp(),
        read: false,
    };

    match workspace.messages.append(message.clone()) {
        Ok(()) => ok(&req.id, json!({ "message": message })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}

fn handle_inbox(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(user_id) = req.params.get("userId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.userId", None);
    };

    let mut inbox: Vec<&Message> = workspace
        .messages
        .records()
        .iter()
        .filter(|m| m.to_user_id == user_id)
        .collect();
    // Unread first, newest first within each group.
    inbox.sort_by_key(|m| (m.read, std::cmp::Reverse(m.message_id)));
    let unread = inbox.iter().filter(|m| !m.read).count();
    ok(
        &req.id,
        json!({ "messages": inbox, "total": inbox.len(), "unread": unread }),
    )
}

fn handle_mark_read(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(message_id) = req.params.get("messageId").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing params.messageId", None);
    };

    let Some(idx) = workspace
        .messages
        .records()
        .iter()
        .position(|m| m.message_id == message_id)
    else {
        return err(
            &req.id,
            "not_found",
            format!("no message with id {}", message_id),
            None,
        );
    };

    let mut next = workspace.messages.records().to_vec();
    next[idx].read = true;
    match workspace.messages.commit(next) {
        Ok(()) => ok(&req.id, json!({ "read": true })),
        Err(e) => err(&req.id, "persist_failed", format!("{e:#}"), None),
    }
}
