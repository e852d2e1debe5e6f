//! Persisted store services used by the REST routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own SQL and validation so route handlers stay focused on
//! request/response translation. The realtime path never calls into here:
//! clients persist through REST, fire-and-forget.

pub mod board;
pub mod user;

use frames::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Invalid(_) => "E_INVALID",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
