use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

const MAX_LOGIN_CHARS: usize = 100;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let user = match req.params.get("user").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing user", None),
    };
    if user.is_empty() || user.chars().count() > MAX_LOGIN_CHARS {
        return err(
            &req.id,
            "bad_params",
            format!("user must be 1..={} chars", MAX_LOGIN_CHARS),
            None,
        );
    }
    if state.user.as_deref() != Some(user.as_str()) {
        // Approval of a pending import is tied to the user who saw it.
        state.pending_import = None;
    }
    tracing::info!(user = %user, "session opened");
    state.user = Some(user.clone());
    ok(&req.id, json!({ "user": user }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let previous = state.user.take();
    state.pending_import = None;
    ok(&req.id, json!({ "user": previous }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        _ => None,
    }
}
