use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::matcher;
use crate::session::Session;
use crate::state::SharedState;

/// Cookie identifying one kiosk client context; at most one pending capture
/// is tracked per context.
const CLIENT_COOKIE: &str = "kiosk_client";

#[derive(Deserialize)]
struct FaceImageRequest {
    face_image: String,
}

#[derive(Deserialize)]
struct RegisterEntryRequest {
    name: String,
    #[serde(rename = "class")]
    class: String,
    roll: String,
}

#[derive(Deserialize)]
struct EndSessionRequest {
    session_id: String,
}

#[derive(Serialize)]
struct ApproveResponse {
    success: bool,
    session_id: String,
    name: String,
    class: String,
    roll: String,
    code: String,
    confidence: f32,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/capture-face", post(capture_face))
        .route("/api/clear-face", post(clear_face))
        .route("/api/register-entry", post(register_entry))
        .route("/api/approve-face", post(approve_face))
        .route("/api/session/{session_id}", get(get_session))
        .route("/api/end-session", post(end_session))
}

/// Validate a captured image and park its embedding as the client's pending
/// capture. The client context cookie is issued here if absent.
async fn capture_face(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<FaceImageRequest>,
) -> Result<Response> {
    let bytes = decode_face_image(&req.face_image)?;
    let embedding = state.encoder.encode(&bytes)?;

    let client =
        client_id(&headers).unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    state.captures.set(&client, embedding);
    state.audit.append(&format!(
        "Face captured and validated for registration (Client: {}...)",
        &client[..8.min(client.len())]
    ));

    let cookie = format!("{CLIENT_COOKIE}={client}; Path=/; HttpOnly; SameSite=Lax");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "success": true,
            "message": "Face captured and validated successfully"
        })),
    )
        .into_response())
}

/// Discard the client's pending capture. Always succeeds.
async fn clear_face(State(state): State<SharedState>, headers: HeaderMap) -> Json<serde_json::Value> {
    if let Some(client) = client_id(&headers) {
        state.captures.clear(&client);
    }
    Json(json!({ "success": true, "message": "Face data cleared" }))
}

/// Register a new identity from the pending capture. The capture is consumed
/// whether or not registration succeeds; a failed attempt requires a fresh
/// capture.
async fn register_entry(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<RegisterEntryRequest>,
) -> Result<Json<serde_json::Value>> {
    let name = req.name.trim();
    let class = req.class.trim();
    let roll = req.roll.trim();
    if name.is_empty() || class.is_empty() || roll.is_empty() {
        return Err(Error::BadRequest(
            "all fields are required (name, class, roll)".into(),
        ));
    }

    let client = client_id(&headers).ok_or(Error::NoPendingCapture)?;
    let embedding = state
        .captures
        .consume(&client)
        .ok_or(Error::NoPendingCapture)?;

    let identity = state.store.register(name, class, roll, embedding)?;
    Ok(Json(json!({
        "success": true,
        "name": identity.name,
        "code": identity.code,
        "message": "Registration successful"
    })))
}

/// Match a fresh capture against the store and open a check-in session.
/// Runs directly on the submitted image, not through the pending capture.
async fn approve_face(
    State(state): State<SharedState>,
    Json(req): Json<FaceImageRequest>,
) -> Result<Json<ApproveResponse>> {
    let bytes = decode_face_image(&req.face_image)?;
    let probe = state.encoder.encode(&bytes)?;

    let records = state.store.records()?;
    let Some(m) = matcher::best_match(&records, &probe, state.config.threshold) else {
        state.audit.append("APPROVAL DENIED: face not recognized");
        return Err(Error::NotRecognized);
    };

    let confidence = (m.score.clamp(0.0, 1.0) * 10000.0).round() / 100.0;
    let session = state.sessions.open(&m.identity, confidence)?;
    state.audit.append(&format!(
        "APPROVAL SUCCESS: {} | Class: {} | Roll: {} | Confidence: {confidence}%",
        m.identity.name, m.identity.class, m.identity.roll
    ));

    Ok(Json(ApproveResponse {
        success: true,
        session_id: session.session_id,
        name: m.identity.name,
        class: m.identity.class,
        roll: m.identity.roll,
        code: m.identity.code,
        confidence,
    }))
}

async fn get_session(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>> {
    state
        .sessions
        .lookup(&session_id)
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("session '{session_id}'")))
}

async fn end_session(
    State(state): State<SharedState>,
    Json(req): Json<EndSessionRequest>,
) -> Result<Json<serde_json::Value>> {
    state.sessions.close(&req.session_id)?;
    state.audit.append(&format!(
        "SESSION ENDED: {}...",
        &req.session_id[..8.min(req.session_id.len())]
    ));
    Ok(Json(json!({
        "success": true,
        "message": "Session ended successfully"
    })))
}

/// Extract the client context id from the request cookies.
fn client_id(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|c| c.strip_prefix(CLIENT_COOKIE)?.strip_prefix('='))
        .map(str::to_owned)
}

/// Decode a captured image sent as a data URL or raw base64 string.
fn decode_face_image(face_image: &str) -> Result<Vec<u8>> {
    if face_image.len() < 100 {
        return Err(Error::BadRequest(
            "invalid face data - image too small or empty".into(),
        ));
    }
    let payload = match face_image.split_once("base64,") {
        Some((_, rest)) => rest,
        None => face_image,
    };
    BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Decode(e.to_string()))
}
