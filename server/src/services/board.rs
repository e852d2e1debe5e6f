//! Board store: get-or-create, append-only strokes, settings.
//!
//! DESIGN
//! ======
//! Strokes live in one JSONB array per board and are only ever appended or
//! cleared wholesale, mirroring how the realtime path treats them. Settings
//! updates are last-write-wins; absent patch fields keep their stored value.

use frames::model::{Board, DEFAULT_BOARD_TITLE, SettingsPatch, Stroke};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::info;
use uuid::Uuid;

use super::StoreError;

type BoardRow = (String, String, Json<Vec<Stroke>>, bool, String);

const SELECT_BOARD: &str = "SELECT slug, title, strokes, is_layer_locked, collaboration_mode FROM boards WHERE slug = $1";

// =============================================================================
// VALIDATION
// =============================================================================

/// Trim and check a board slug.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] for an empty slug.
pub fn normalize_slug(slug: &str) -> Result<&str, StoreError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(StoreError::Invalid("slug is required".into()));
    }
    Ok(slug)
}

/// Check a stroke before it is persisted.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] naming the offending field.
pub fn validate_stroke(stroke: &Stroke) -> Result<(), StoreError> {
    stroke.validate().map_err(|e| StoreError::Invalid(e.to_string()))
}

// =============================================================================
// QUERIES
// =============================================================================

/// Load one board with its collaborator ids.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] when no board has this slug.
pub async fn get_board(pool: &PgPool, slug: &str) -> Result<Board, StoreError> {
    let row = sqlx::query_as::<_, BoardRow>(SELECT_BOARD)
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("board {slug}")))?;

    let collaborator_ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT user_id FROM board_collaborators WHERE board_slug = $1 ORDER BY added_at, user_id",
    )
    .bind(slug)
    .fetch_all(pool)
    .await?;

    Ok(row_to_board(row, collaborator_ids))
}

/// Get the board with `slug`, creating it first if needed.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] for an empty slug, or a database error.
pub async fn create_board(pool: &PgPool, slug: &str, title: Option<&str>) -> Result<Board, StoreError> {
    let slug = normalize_slug(slug)?;
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_BOARD_TITLE);

    let created = sqlx::query("INSERT INTO boards (slug, title) VALUES ($1, $2) ON CONFLICT (slug) DO NOTHING")
        .bind(slug)
        .bind(title)
        .execute(pool)
        .await?;
    if created.rows_affected() > 0 {
        info!(%slug, "board created");
    }

    get_board(pool, slug).await
}

/// Append one finalized stroke.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] for a malformed stroke and
/// [`StoreError::NotFound`] for an unknown board.
pub async fn append_stroke(pool: &PgPool, slug: &str, stroke: &Stroke) -> Result<Board, StoreError> {
    validate_stroke(stroke)?;

    let result = sqlx::query("UPDATE boards SET strokes = strokes || $2, updated_at = now() WHERE slug = $1")
        .bind(slug)
        .bind(Json(std::slice::from_ref(stroke)))
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("board {slug}")));
    }

    get_board(pool, slug).await
}

/// Drop every stroke on a board.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown board.
pub async fn clear_strokes(pool: &PgPool, slug: &str) -> Result<Board, StoreError> {
    let result = sqlx::query("UPDATE boards SET strokes = '[]'::jsonb, updated_at = now() WHERE slug = $1")
        .bind(slug)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("board {slug}")));
    }
    info!(%slug, "board cleared");

    get_board(pool, slug).await
}

/// Apply a partial settings update.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown board.
pub async fn update_settings(pool: &PgPool, slug: &str, patch: &SettingsPatch) -> Result<Board, StoreError> {
    let result = sqlx::query(
        "UPDATE boards
         SET is_layer_locked = COALESCE($2, is_layer_locked),
             collaboration_mode = COALESCE($3, collaboration_mode),
             updated_at = now()
         WHERE slug = $1",
    )
    .bind(slug)
    .bind(patch.is_layer_locked)
    .bind(patch.collaboration_mode.map(|m| m.as_str()))
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("board {slug}")));
    }

    get_board(pool, slug).await
}

// =============================================================================
// HELPERS
// =============================================================================

fn row_to_board(row: BoardRow, collaborator_ids: Vec<Uuid>) -> Board {
    let (slug, title, Json(strokes), is_layer_locked, mode) = row;
    Board {
        slug,
        title,
        strokes,
        is_layer_locked,
        collaboration_mode: mode.parse().unwrap_or_default(),
        collaborator_ids,
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
