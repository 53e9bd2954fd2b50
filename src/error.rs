use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facegate_vision::EncodeError;
use serde_json::json;

/// Engine error taxonomy.
///
/// Two wire shapes exist: validation-type outcomes the client is expected to
/// branch on travel as HTTP 200 `{"success": false, "message": ...}`, while
/// transport and auth failures use an HTTP error status with `{"detail"}`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no face detected in the image; ensure your face is clearly visible and well-lit")]
    NoFace,
    #[error("multiple faces detected ({0}); only one person should be in frame")]
    MultipleFaces(usize),
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("'{0}' is already registered")]
    DuplicateName(String),
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("no face captured; capture your face first using the camera")]
    NoPendingCapture,
    #[error("face not recognized; register first or try again")]
    NotRecognized,
    #[error("session already ended")]
    AlreadyClosed,
    #[error("admin authentication required")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Decode(msg) => Error::Decode(msg),
            EncodeError::NoFace => Error::NoFace,
            EncodeError::MultipleFaces(n) => Error::MultipleFaces(n),
            EncodeError::Inference(msg) => Error::Internal(msg),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            Error::NoFace
            | Error::MultipleFaces(_)
            | Error::Decode(_)
            | Error::DuplicateName(_)
            | Error::NotFound(_)
            | Error::NoPendingCapture
            | Error::NotRecognized
            | Error::AlreadyClosed => (
                StatusCode::OK,
                Json(json!({ "success": false, "message": message })),
            )
                .into_response(),
            Error::Unauthorized | Error::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": message })),
            )
                .into_response(),
            Error::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": message }))).into_response()
            }
            Error::Internal(_) => {
                log::error!("{message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": message })),
                )
                    .into_response()
            }
        }
    }
}
