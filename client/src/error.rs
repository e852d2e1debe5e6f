//! Client error taxonomy.
//!
//! Nothing here is fatal to a running session: the driver logs store and
//! relay failures and keeps the optimistic view. Only `NotFound` changes
//! control flow, by triggering board creation on load.

use frames::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The store has no record at this path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The HTTP request could not be sent or its body not read.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The websocket handshake or a socket write failed.
    #[error("websocket failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),

    /// An inbound binary frame did not decode.
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),

    /// An inbound text frame was not a JSON frame.
    #[error("invalid JSON frame: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The base URL has no http(s) scheme to derive a websocket URL from.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The driver or socket is gone.
    #[error("channel closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(err))
    }
}

impl ErrorCode for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Http(_) => "E_HTTP",
            Self::Status { .. } => "E_STATUS",
            Self::Ws(_) => "E_WS",
            Self::Decode(_) | Self::InvalidJson(_) => "E_INVALID_FRAME",
            Self::InvalidBaseUrl(_) => "E_INVALID_BASE_URL",
            Self::Closed => "E_CLOSED",
        }
    }
}
