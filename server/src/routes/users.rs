//! User and collaborator routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use frames::model::User;
use serde::Deserialize;
use uuid::Uuid;

use super::boards::store_error_to_status;
use crate::services::user;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpsertUserBody {
    pub email: String,
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct CollaboratorBody {
    pub user_id: Uuid,
}

/// `POST /api/users/upsert`: create or update a user by email.
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(body): Json<UpsertUserBody>,
) -> Result<Json<User>, StatusCode> {
    user::upsert_user(&state.pool, &body.email, body.name.as_deref(), body.color.as_deref())
        .await
        .map(Json)
        .map_err(store_error_to_status)
}

/// `POST /api/users/boards/{slug}/add`: register a collaborator.
pub async fn add_collaborator(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<CollaboratorBody>,
) -> Result<Json<Vec<User>>, StatusCode> {
    user::add_collaborator(&state.pool, &slug, body.user_id)
        .await
        .map(Json)
        .map_err(store_error_to_status)
}

/// `POST /api/users/boards/{slug}/remove`: drop a collaborator.
pub async fn remove_collaborator(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<CollaboratorBody>,
) -> Result<Json<Vec<User>>, StatusCode> {
    user::remove_collaborator(&state.pool, &slug, body.user_id)
        .await
        .map(Json)
        .map_err(store_error_to_status)
}

/// `GET /api/users/boards/{slug}`: list collaborators.
pub async fn list_collaborators(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<User>>, StatusCode> {
    user::list_collaborators(&state.pool, &slug)
        .await
        .map(Json)
        .map_err(store_error_to_status)
}
