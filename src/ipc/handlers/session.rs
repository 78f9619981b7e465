use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::{self, CurrentUser};
use serde_json::json;
use tracing::info;

fn handle_session_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = req.params.get("email").and_then(|v| v.as_str());
    let password = req.params.get("password").and_then(|v| v.as_str());
    let (Some(email), Some(password)) = (email, password) else {
        return err(&req.id, "bad_params", "missing email or password", None);
    };

    match session::login(email, password) {
        Ok(user) => {
            info!(user_id = %user.id, role = ?user.role, "signed in");
            state.expanded_dates.clear();
            state.user = Some(user.clone());
            ok(&req.id, json!({ "user": user }))
        }
        Err(e) => err(&req.id, "unauthenticated", e.to_string(), None),
    }
}

fn handle_session_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("user") else {
        return err(&req.id, "bad_params", "missing user", None);
    };
    let user: CurrentUser = match serde_json::from_value(raw.clone()) {
        Ok(u) => u,
        Err(e) => return err(&req.id, "bad_params", format!("invalid user: {e}"), None),
    };
    if user.id.trim().is_empty() {
        return err(&req.id, "bad_params", "user.id must not be empty", None);
    }
    info!(user_id = %user.id, role = ?user.role, "session user set");
    state.expanded_dates.clear();
    state.user = Some(user.clone());
    ok(&req.id, json!({ "user": user }))
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "user": state.user }))
}

fn handle_session_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(user) = state.user.take() {
        info!(user_id = %user.id, "signed out");
    }
    state.expanded_dates.clear();
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_session_login(state, req)),
        "session.set" => Some(handle_session_set(state, req)),
        "session.get" => Some(handle_session_get(state, req)),
        "session.logout" => Some(handle_session_logout(state, req)),
        _ => None,
    }
}
