//! Typed views over the room protocol's frames.
//!
//! [`ClientEvent`] covers everything a participant sends into a room and
//! [`ServerEvent`] everything the gateway pushes back out. Both convert to and
//! from [`Frame`] so the transport layers only ever move frames around, while
//! the room logic and the client synchronizer work with closed enums.
//!
//! DESIGN
//! ======
//! Relayable client events (`stroke:add`, `canvas:clear`, `layer:lock`,
//! `mode:set`) map one-to-one onto their server-side names through
//! [`relayed_syscall`]. The payload is forwarded untouched, so a relayed
//! frame decodes as the matching [`ServerEvent`] without re-encoding.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::model::{CollaborationMode, Cursor, DEFAULT_COLOR, Identity, Presence, Stroke};
use crate::{ErrorCode, Frame};

// =============================================================================
// SYSCALLS
// =============================================================================

pub const ROOM_JOIN: &str = "room:join";
pub const STROKE_ADD: &str = "stroke:add";
pub const CANVAS_CLEAR: &str = "canvas:clear";
pub const CURSOR_UPDATE: &str = "cursor:update";
pub const LAYER_LOCK: &str = "layer:lock";
pub const MODE_SET: &str = "mode:set";

pub const SESSION_CONNECTED: &str = "session:connected";
pub const USERS_LIST: &str = "users:list";
pub const USER_JOINED: &str = "user:joined";
pub const USER_LEFT: &str = "user:left";
pub const CURSOR_UPDATED: &str = "cursor:updated";
pub const STROKE_ADDED: &str = "stroke:added";
pub const CANVAS_CLEARED: &str = "canvas:cleared";
pub const LAYER_LOCKED: &str = "layer:locked";
pub const MODE_UPDATED: &str = "mode:updated";
pub const ONLINE_COUNT: &str = "online:count";
pub const GATEWAY_ERROR: &str = "gateway:error";

/// Server-side name of a relayable client syscall.
#[must_use]
pub fn relayed_syscall(syscall: &str) -> Option<&'static str> {
    match syscall {
        STROKE_ADD => Some(STROKE_ADDED),
        CANVAS_CLEAR => Some(CANVAS_CLEARED),
        LAYER_LOCK => Some(LAYER_LOCKED),
        MODE_SET => Some(MODE_UPDATED),
        _ => None,
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
    #[error("{syscall}: missing field '{field}'")]
    MissingField { syscall: String, field: &'static str },
    #[error("{syscall}: invalid field '{field}': {reason}")]
    InvalidField { syscall: String, field: &'static str, reason: String },
}

impl ErrorCode for EventError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
            Self::MissingField { .. } | Self::InvalidField { .. } => "E_INVALID_EVENT",
        }
    }
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    Join(Identity),
    StrokeAdd(Stroke),
    CanvasClear,
    CursorUpdate(Cursor),
    LayerLock { locked: bool },
    ModeSet { mode: CollaborationMode },
}

impl ClientEvent {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::Join(_) => ROOM_JOIN,
            Self::StrokeAdd(_) => STROKE_ADD,
            Self::CanvasClear => CANVAS_CLEAR,
            Self::CursorUpdate(_) => CURSOR_UPDATE,
            Self::LayerLock { .. } => LAYER_LOCK,
            Self::ModeSet { .. } => MODE_SET,
        }
    }

    /// Build the request frame for this event, addressed to `room`.
    #[must_use]
    pub fn to_frame(&self, room: &str) -> Frame {
        let mut data = Map::new();
        match self {
            Self::Join(identity) => {
                data.insert("identity_id".into(), Value::String(identity.id.clone()));
                data.insert("name".into(), Value::String(identity.name.clone()));
                data.insert("color".into(), Value::String(identity.color.clone()));
            }
            Self::StrokeAdd(stroke) => {
                data.insert("stroke".into(), json(stroke));
            }
            Self::CanvasClear => {}
            Self::CursorUpdate(cursor) => {
                data.insert("x".into(), Value::from(cursor.x));
                data.insert("y".into(), Value::from(cursor.y));
            }
            Self::LayerLock { locked } => {
                data.insert("locked".into(), Value::Bool(*locked));
            }
            Self::ModeSet { mode } => {
                data.insert("mode".into(), Value::String(mode.as_str().to_owned()));
            }
        }
        Frame::request(self.syscall(), data).with_room(room)
    }

    /// Parse an inbound request frame.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] for unknown syscalls and malformed payloads.
    pub fn from_frame(frame: &Frame) -> Result<Self, EventError> {
        match frame.syscall.as_str() {
            ROOM_JOIN => {
                let id: String = field(frame, "identity_id")?;
                if id.trim().is_empty() {
                    return Err(invalid(frame, "identity_id", "must not be empty"));
                }
                let name = optional::<String>(frame, "name")?
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| id.clone());
                let color = optional::<String>(frame, "color")?
                    .filter(|color| !color.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_COLOR.to_owned());
                Ok(Self::Join(Identity { id, name, color }))
            }
            STROKE_ADD => Ok(Self::StrokeAdd(field(frame, "stroke")?)),
            CANVAS_CLEAR => Ok(Self::CanvasClear),
            CURSOR_UPDATE => Ok(Self::CursorUpdate(Cursor { x: field(frame, "x")?, y: field(frame, "y")? })),
            LAYER_LOCK => Ok(Self::LayerLock { locked: field(frame, "locked")? }),
            MODE_SET => Ok(Self::ModeSet { mode: field(frame, "mode")? }),
            other => Err(EventError::UnknownSyscall(other.to_owned())),
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    SessionConnected { connection_id: Uuid },
    UsersList { users: Vec<Presence> },
    UserJoined(Presence),
    UserLeft { identity_id: String },
    CursorUpdated { identity_id: String, connection_id: Uuid, cursor: Cursor },
    StrokeAdded(Stroke),
    CanvasCleared,
    LayerLocked { locked: bool },
    ModeUpdated { mode: CollaborationMode },
    OnlineCount { count: u64 },
    GatewayError { code: String, message: String },
}

impl ServerEvent {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::SessionConnected { .. } => SESSION_CONNECTED,
            Self::UsersList { .. } => USERS_LIST,
            Self::UserJoined(_) => USER_JOINED,
            Self::UserLeft { .. } => USER_LEFT,
            Self::CursorUpdated { .. } => CURSOR_UPDATED,
            Self::StrokeAdded(_) => STROKE_ADDED,
            Self::CanvasCleared => CANVAS_CLEARED,
            Self::LayerLocked { .. } => LAYER_LOCKED,
            Self::ModeUpdated { .. } => MODE_UPDATED,
            Self::OnlineCount { .. } => ONLINE_COUNT,
            Self::GatewayError { .. } => GATEWAY_ERROR,
        }
    }

    /// Build the notification frame for this event.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let mut data = Map::new();
        match self {
            Self::SessionConnected { connection_id } => {
                data.insert("connection_id".into(), Value::String(connection_id.to_string()));
            }
            Self::UsersList { users } => {
                data.insert("users".into(), json(users));
            }
            Self::UserJoined(presence) => {
                data.insert("presence".into(), json(presence));
            }
            Self::UserLeft { identity_id } => {
                data.insert("identity_id".into(), Value::String(identity_id.clone()));
            }
            Self::CursorUpdated { identity_id, connection_id, cursor } => {
                data.insert("identity_id".into(), Value::String(identity_id.clone()));
                data.insert("connection_id".into(), Value::String(connection_id.to_string()));
                data.insert("x".into(), Value::from(cursor.x));
                data.insert("y".into(), Value::from(cursor.y));
            }
            Self::StrokeAdded(stroke) => {
                data.insert("stroke".into(), json(stroke));
            }
            Self::CanvasCleared => {}
            Self::LayerLocked { locked } => {
                data.insert("locked".into(), Value::Bool(*locked));
            }
            Self::ModeUpdated { mode } => {
                data.insert("mode".into(), Value::String(mode.as_str().to_owned()));
            }
            Self::OnlineCount { count } => {
                data.insert("count".into(), Value::from(*count));
            }
            Self::GatewayError { code, message } => {
                data.insert(crate::FRAME_CODE.into(), Value::String(code.clone()));
                data.insert(crate::FRAME_MESSAGE.into(), Value::String(message.clone()));
            }
        }
        let frame = Frame::request(self.syscall(), data);
        match self {
            Self::GatewayError { .. } => frame.with_status(crate::Status::Error),
            _ => frame,
        }
    }

    /// Parse an outbound frame received by a client.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] for unknown syscalls and malformed payloads.
    pub fn from_frame(frame: &Frame) -> Result<Self, EventError> {
        match frame.syscall.as_str() {
            SESSION_CONNECTED => Ok(Self::SessionConnected { connection_id: field(frame, "connection_id")? }),
            USERS_LIST => Ok(Self::UsersList { users: field(frame, "users")? }),
            USER_JOINED => Ok(Self::UserJoined(field(frame, "presence")?)),
            USER_LEFT => Ok(Self::UserLeft { identity_id: field(frame, "identity_id")? }),
            CURSOR_UPDATED => Ok(Self::CursorUpdated {
                identity_id: field(frame, "identity_id")?,
                connection_id: field(frame, "connection_id")?,
                cursor: Cursor { x: field(frame, "x")?, y: field(frame, "y")? },
            }),
            STROKE_ADDED => Ok(Self::StrokeAdded(field(frame, "stroke")?)),
            CANVAS_CLEARED => Ok(Self::CanvasCleared),
            LAYER_LOCKED => Ok(Self::LayerLocked { locked: field(frame, "locked")? }),
            MODE_UPDATED => Ok(Self::ModeUpdated { mode: field(frame, "mode")? }),
            ONLINE_COUNT => {
                // Protobuf numbers arrive as doubles.
                let count: f64 = field(frame, "count")?;
                if !count.is_finite() || count < 0.0 {
                    return Err(invalid(frame, "count", "must be a non-negative number"));
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let count = count as u64;
                Ok(Self::OnlineCount { count })
            }
            GATEWAY_ERROR => Ok(Self::GatewayError {
                code: optional(frame, crate::FRAME_CODE)?.unwrap_or_default(),
                message: optional(frame, crate::FRAME_MESSAGE)?.unwrap_or_default(),
            }),
            other => Err(EventError::UnknownSyscall(other.to_owned())),
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn json(value: &impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn invalid(frame: &Frame, field: &'static str, reason: impl Into<String>) -> EventError {
    EventError::InvalidField { syscall: frame.syscall.clone(), field, reason: reason.into() }
}

fn field<T: DeserializeOwned>(frame: &Frame, key: &'static str) -> Result<T, EventError> {
    let Some(value) = frame.field(key) else {
        return Err(EventError::MissingField { syscall: frame.syscall.clone(), field: key });
    };
    serde_json::from_value(value.clone()).map_err(|err| invalid(frame, key, err.to_string()))
}

fn optional<T: DeserializeOwned>(frame: &Frame, key: &'static str) -> Result<Option<T>, EventError> {
    match frame.field(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => field(frame, key).map(Some),
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
