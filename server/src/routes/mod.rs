//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST store endpoints and the realtime websocket
//! endpoint under a single Axum router, with CORS and request tracing.

pub mod boards;
pub mod users;
pub mod ws;

use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::{Config, LOCAL_FRONTEND_ORIGIN};
use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/api/boards", post(boards::create_board))
        .route("/api/boards/{slug}", get(boards::get_board))
        .route("/api/boards/{slug}/strokes", post(boards::append_stroke))
        .route("/api/boards/{slug}/clear", post(boards::clear_board))
        .route("/api/boards/{slug}/settings", post(boards::update_settings))
        .route("/api/boards/{slug}/presence", get(boards::presence))
        .route("/api/users/upsert", post(users::upsert_user))
        .route("/api/users/boards/{slug}", get(users::list_collaborators))
        .route("/api/users/boards/{slug}/add", post(users::add_collaborator))
        .route("/api/users/boards/{slug}/remove", post(users::remove_collaborator))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .route("/health", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin by default; with `FRONTEND_URL` set, only the local dev
/// frontend and that URL.
fn cors_layer(config: &Config) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let Some(frontend) = &config.frontend_url else {
        return base.allow_origin(Any);
    };

    let origins: Vec<HeaderValue> = [LOCAL_FRONTEND_ORIGIN, frontend.as_str()]
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
