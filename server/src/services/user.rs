//! Identity store: users keyed by email, and per-board collaborator lists.

use frames::model::{DEFAULT_COLOR, User};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::StoreError;

type UserRow = (Uuid, String, String, String);

/// Trim and lowercase an email.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] when nothing is left.
pub fn normalize_email(email: &str) -> Result<String, StoreError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(StoreError::Invalid("email is required".into()));
    }
    Ok(email)
}

/// Display name for a user created without one: the email's local part.
#[must_use]
pub fn default_name(email: &str) -> &str {
    email.split('@').next().filter(|s| !s.is_empty()).unwrap_or(email)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Create the user for `email`, or update the fields that were provided.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] for a blank email, or a database error.
pub async fn upsert_user(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
    color: Option<&str>,
) -> Result<User, StoreError> {
    let email = normalize_email(email)?;
    let name = non_blank(name);
    let color = non_blank(color);

    let (id, name, email, color) = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, email, name, color)
         VALUES ($1, $2, COALESCE($3, $4), COALESCE($5, $6))
         ON CONFLICT (email) DO UPDATE
         SET name = COALESCE($3, users.name),
             color = COALESCE($5, users.color),
             updated_at = now()
         RETURNING id, name, email, color",
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(name)
    .bind(default_name(&email))
    .bind(color)
    .bind(DEFAULT_COLOR)
    .fetch_one(pool)
    .await?;

    Ok(User { id, name, email, color })
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Users registered as collaborators of a board, oldest first.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown board.
pub async fn list_collaborators(pool: &PgPool, slug: &str) -> Result<Vec<User>, StoreError> {
    ensure_board(pool, slug).await?;

    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT u.id, u.name, u.email, u.color
         FROM board_collaborators bc
         JOIN users u ON u.id = bc.user_id
         WHERE bc.board_slug = $1
         ORDER BY bc.added_at, u.id",
    )
    .bind(slug)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, email, color)| User { id, name, email, color })
        .collect())
}

/// Register `user_id` as a collaborator. Adding twice is a no-op.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] when the board or the user is unknown.
pub async fn add_collaborator(pool: &PgPool, slug: &str, user_id: Uuid) -> Result<Vec<User>, StoreError> {
    ensure_board(pool, slug).await?;
    let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if !user_exists {
        return Err(StoreError::NotFound(format!("user {user_id}")));
    }

    let added = sqlx::query(
        "INSERT INTO board_collaborators (board_slug, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(slug)
    .bind(user_id)
    .execute(pool)
    .await?;
    if added.rows_affected() > 0 {
        info!(%slug, %user_id, "collaborator added");
    }

    list_collaborators(pool, slug).await
}

/// Remove `user_id` from a board's collaborators.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown board.
pub async fn remove_collaborator(pool: &PgPool, slug: &str, user_id: Uuid) -> Result<Vec<User>, StoreError> {
    ensure_board(pool, slug).await?;
    sqlx::query("DELETE FROM board_collaborators WHERE board_slug = $1 AND user_id = $2")
        .bind(slug)
        .bind(user_id)
        .execute(pool)
        .await?;

    list_collaborators(pool, slug).await
}

async fn ensure_board(pool: &PgPool, slug: &str) -> Result<(), StoreError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM boards WHERE slug = $1)")
        .bind(slug)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(StoreError::NotFound(format!("board {slug}")));
    }
    Ok(())
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
