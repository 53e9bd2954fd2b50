use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::SharedState;

pub mod admin;
pub mod health;
pub mod kiosk;

/// Assemble the full application router. CORS is permissive: the kiosk UI
/// may be served from anywhere on the local network.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(kiosk::router())
        .merge(admin::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
