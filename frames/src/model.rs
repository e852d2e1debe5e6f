//! Domain records shared by the server, the client and the REST surface.
//!
//! All numeric fields are `f64`: frames cross the wire as protobuf `Value`s,
//! which only carry doubles.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default stroke/user color.
pub const DEFAULT_COLOR: &str = "#3b82f6";

/// Default title for boards created without one.
pub const DEFAULT_BOARD_TITLE: &str = "Untitled Board";

// =============================================================================
// IDENTITY / PRESENCE
// =============================================================================

/// A logical user, stable across reconnects, tabs and devices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

/// One identity's visible state inside a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    pub identity_id: String,
    pub name: String,
    pub color: String,
    pub cursor: Cursor,
    /// Live connections backing this identity. Never empty on the server.
    #[serde(default)]
    pub connections: BTreeSet<Uuid>,
}

impl Presence {
    #[must_use]
    pub fn new(identity: &Identity, connection_id: Uuid) -> Self {
        Self {
            identity_id: identity.id.clone(),
            name: identity.name.clone(),
            color: identity.color.clone(),
            cursor: Cursor::default(),
            connections: BTreeSet::from([connection_id]),
        }
    }
}

// =============================================================================
// STROKES
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Draw,
    Erase,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One freehand drawing or erase path. Immutable once finalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: String,
    pub tool: Tool,
    pub color: String,
    pub size: f64,
    pub points: Vec<Point>,
    pub author_id: String,
}

/// Reasons a stroke payload is rejected by the store.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StrokeError {
    #[error("stroke id is required")]
    MissingId,
    #[error("stroke color is required")]
    MissingColor,
    #[error("stroke author is required")]
    MissingAuthor,
    #[error("stroke size must be a positive number")]
    InvalidSize,
}

impl Stroke {
    /// Check the fields every persisted stroke must carry.
    ///
    /// # Errors
    ///
    /// Returns the first [`StrokeError`] found.
    pub fn validate(&self) -> Result<(), StrokeError> {
        if self.id.trim().is_empty() {
            return Err(StrokeError::MissingId);
        }
        if self.color.trim().is_empty() {
            return Err(StrokeError::MissingColor);
        }
        if self.author_id.trim().is_empty() {
            return Err(StrokeError::MissingAuthor);
        }
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(StrokeError::InvalidSize);
        }
        Ok(())
    }
}

// =============================================================================
// BOARD SETTINGS
// =============================================================================

/// Advisory sharing mode. Stored and displayed, never enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollaborationMode {
    #[default]
    InviteOnly,
    Open,
    ViewOnly,
}

impl CollaborationMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InviteOnly => "invite-only",
            Self::Open => "open",
            Self::ViewOnly => "view-only",
        }
    }
}

impl fmt::Display for CollaborationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown collaboration mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for CollaborationMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invite-only" => Ok(Self::InviteOnly),
            "open" => Ok(Self::Open),
            "view-only" => Ok(Self::ViewOnly),
            other => Err(UnknownMode(other.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSettings {
    pub is_layer_locked: bool,
    pub collaboration_mode: CollaborationMode,
}

/// Partial settings update; absent fields are left untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_layer_locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration_mode: Option<CollaborationMode>,
}

impl SettingsPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_layer_locked.is_none() && self.collaboration_mode.is_none()
    }

    /// Apply the patch on top of `settings`.
    #[must_use]
    pub fn apply(&self, settings: BoardSettings) -> BoardSettings {
        BoardSettings {
            is_layer_locked: self.is_layer_locked.unwrap_or(settings.is_layer_locked),
            collaboration_mode: self.collaboration_mode.unwrap_or(settings.collaboration_mode),
        }
    }
}

// =============================================================================
// PERSISTED RECORDS
// =============================================================================

/// A board as held by the persisted store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub slug: String,
    pub title: String,
    pub strokes: Vec<Stroke>,
    pub is_layer_locked: bool,
    pub collaboration_mode: CollaborationMode,
    #[serde(default)]
    pub collaborator_ids: Vec<Uuid>,
}

impl Board {
    #[must_use]
    pub fn settings(&self) -> BoardSettings {
        BoardSettings {
            is_layer_locked: self.is_layer_locked,
            collaboration_mode: self.collaboration_mode,
        }
    }
}

/// A user account as held by the persisted identity store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub color: String,
}

impl User {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity { id: self.id.to_string(), name: self.name.clone(), color: self.color.clone() }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
