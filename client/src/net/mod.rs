//! Network seams: the durable board store and the live relay.
//!
//! The driver only sees these traits, so tests swap in in-memory fakes and
//! the CLI plugs in [`api::HttpBoardStore`] and [`relay::WsRelay`].

pub mod api;
pub mod relay;

use frames::Frame;
use frames::model::{Board, SettingsPatch, Stroke, User};
use uuid::Uuid;

use crate::error::SyncError;

/// Persisted board and collaborator store.
#[async_trait::async_trait]
pub trait BoardStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] when the board does not exist.
    async fn get_board(&self, slug: &str) -> Result<Board, SyncError>;

    /// Get-or-create a board by slug.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error.
    async fn create_board(&self, slug: &str, title: Option<&str>) -> Result<Board, SyncError>;

    /// # Errors
    ///
    /// Returns a transport or status error.
    async fn append_stroke(&self, slug: &str, stroke: &Stroke) -> Result<(), SyncError>;

    /// # Errors
    ///
    /// Returns a transport or status error.
    async fn clear_strokes(&self, slug: &str) -> Result<(), SyncError>;

    /// # Errors
    ///
    /// Returns a transport or status error.
    async fn update_settings(&self, slug: &str, patch: SettingsPatch) -> Result<(), SyncError>;

    /// # Errors
    ///
    /// Returns a transport or status error.
    async fn list_collaborators(&self, slug: &str) -> Result<Vec<User>, SyncError>;

    /// # Errors
    ///
    /// Returns a transport or status error.
    async fn add_collaborator(&self, slug: &str, user_id: Uuid) -> Result<Vec<User>, SyncError>;
}

/// Outbound half of the live websocket.
#[async_trait::async_trait]
pub trait Relay: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SyncError::Ws`] when the socket write fails.
    async fn send(&self, frame: Frame) -> Result<(), SyncError>;
}

/// Fetch a board, creating it when the store has none.
///
/// # Errors
///
/// Returns the first non-`NotFound` store error.
pub async fn load_or_create(store: &dyn BoardStore, slug: &str, title: Option<&str>) -> Result<Board, SyncError> {
    match store.get_board(slug).await {
        Err(SyncError::NotFound(_)) => store.create_board(slug, title).await,
        other => other,
    }
}

/// Derive the websocket endpoint from an http(s) base URL.
///
/// # Errors
///
/// Returns [`SyncError::InvalidBaseUrl`] for any other scheme.
pub fn ws_url(base_url: &str) -> Result<String, SyncError> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/api/ws"));
    }
    if let Some(rest) = base.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/api/ws"));
    }
    Err(SyncError::InvalidBaseUrl(base_url.to_owned()))
}

#[cfg(test)]
pub(crate) mod test_helpers;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
