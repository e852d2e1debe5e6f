//! Board REST routes: the durable side of drawing and settings.
//!
//! Clients call these fire-and-forget after applying an edit locally and
//! relaying it over the websocket. `GET /presence` is the one read that comes
//! from the live room instead of Postgres.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use frames::model::{Board, Presence, SettingsPatch, Stroke};
use serde::Deserialize;
use tracing::error;

use crate::services::{StoreError, board};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateBoardBody {
    pub slug: String,
    pub title: Option<String>,
}

#[derive(Deserialize)]
pub struct AppendStrokeBody {
    pub stroke: Stroke,
}

/// `POST /api/boards`: get or create a board by slug.
pub async fn create_board(
    State(state): State<AppState>,
    Json(body): Json<CreateBoardBody>,
) -> Result<Json<Board>, StatusCode> {
    board::create_board(&state.pool, &body.slug, body.title.as_deref())
        .await
        .map(Json)
        .map_err(store_error_to_status)
}

/// `GET /api/boards/{slug}`: fetch one board.
pub async fn get_board(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Board>, StatusCode> {
    board::get_board(&state.pool, &slug)
        .await
        .map(Json)
        .map_err(store_error_to_status)
}

/// `POST /api/boards/{slug}/strokes`: append one finalized stroke.
pub async fn append_stroke(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<AppendStrokeBody>,
) -> Result<Json<Board>, StatusCode> {
    board::append_stroke(&state.pool, &slug, &body.stroke)
        .await
        .map(Json)
        .map_err(store_error_to_status)
}

/// `POST /api/boards/{slug}/clear`: drop every stroke.
pub async fn clear_board(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Board>, StatusCode> {
    board::clear_strokes(&state.pool, &slug)
        .await
        .map(Json)
        .map_err(store_error_to_status)
}

/// `POST /api/boards/{slug}/settings`: partial settings update.
pub async fn update_settings(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Board>, StatusCode> {
    board::update_settings(&state.pool, &slug, &patch)
        .await
        .map(Json)
        .map_err(store_error_to_status)
}

/// `GET /api/boards/{slug}/presence`: who is in the live room right now.
pub async fn presence(State(state): State<AppState>, Path(slug): Path<String>) -> Json<Vec<Presence>> {
    Json(state.hub.roster(&slug).await)
}

pub(crate) fn store_error_to_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        StoreError::Database(e) => {
            error!(error = %e, "store query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "boards_test.rs"]
mod tests;
