use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::state::SharedState;

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct EditUserRequest {
    old_name: String,
    name: String,
    #[serde(rename = "class")]
    class: String,
    roll: String,
}

#[derive(Deserialize)]
struct DeleteUserRequest {
    name: String,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
        // Older kiosk builds call the flat path.
        .route("/api/admin-logout", post(logout))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/logs", get(list_logs))
        .route("/api/admin/user", put(edit_user).delete(delete_user))
}

async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    match state.admin.login(&req.username, &req.password) {
        Ok(token) => {
            state
                .audit
                .append(&format!("ADMIN LOGIN: {}", req.username));
            Ok(Json(json!({
                "success": true,
                "token": token,
                "message": "Login successful"
            })))
        }
        Err(err) => {
            state
                .audit
                .append(&format!("FAILED ADMIN LOGIN ATTEMPT: {}", req.username));
            Err(err)
        }
    }
}

/// Revoke the caller's token. Safe to call when not logged in.
async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Json<serde_json::Value> {
    if let Some(token) = bearer(&headers) {
        state.admin.logout(token);
    }
    Json(json!({ "success": true, "message": "Logged out" }))
}

async fn list_users(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    state.admin.require(bearer(&headers))?;
    Ok(Json(json!({ "users": state.store.list()? })))
}

async fn list_logs(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    state.admin.require(bearer(&headers))?;
    Ok(Json(json!({ "logs": state.audit.snapshot() })))
}

async fn edit_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<EditUserRequest>,
) -> Result<Json<serde_json::Value>> {
    state.admin.require(bearer(&headers))?;

    let name = req.name.trim();
    let class = req.class.trim();
    let roll = req.roll.trim();
    if name.is_empty() || class.is_empty() || roll.is_empty() {
        return Err(Error::BadRequest("all fields are required".into()));
    }

    state.store.update(&req.old_name, name, class, roll)?;
    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully"
    })))
}

async fn delete_user(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<DeleteUserRequest>,
) -> Result<Json<serde_json::Value>> {
    state.admin.require(bearer(&headers))?;
    state.store.delete(&req.name)?;
    Ok(Json(json!({
        "success": true,
        "message": format!("User '{}' deleted successfully", req.name)
    })))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
