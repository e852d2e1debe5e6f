//! Client view state and its reducer.
//!
//! DESIGN
//! ======
//! `ClientView` is mutated only through [`ClientView::apply`]. Each
//! [`Action`] is one fact: a local gesture step, a relayed event, or a load
//! result. The reducer never does I/O; deciding what to emit is the
//! synchronizer's job.
//!
//! Strokes are an ordered list. Only the local in-progress stroke (tracked
//! by `drawing`) ever gains points; every other stroke is immutable once in
//! the list.

use frames::model::{
    Board, BoardSettings, CollaborationMode, Cursor, DEFAULT_COLOR, Identity, Point, Presence, Stroke, Tool, User,
};
use uuid::Uuid;

use super::roster::Roster;

/// Local drawing tool settings applied to new strokes.
#[derive(Clone, Debug, PartialEq)]
pub struct Brush {
    pub tool: Tool,
    pub color: String,
    pub size: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self { tool: Tool::Draw, color: DEFAULT_COLOR.to_owned(), size: 3.0 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Connected(Uuid),
    OnlineCount(u64),
    LocalIdentity(Identity),
    SetBrush(Brush),
    /// Start a local stroke. Finalizes any stroke still in progress.
    BeginStroke(Stroke),
    ExtendStroke(Point),
    FinishStroke,
    /// A finalized stroke from a peer. Ignored if its id is already listed.
    AddStroke(Stroke),
    Clear,
    SetLayerLock(bool),
    SetMode(CollaborationMode),
    Snapshot(Vec<Presence>),
    Joined(Presence),
    Left(String),
    MoveCursor { identity_id: String, cursor: Cursor },
    Collaborators(Vec<User>),
    Hydrate(Board),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientView {
    title: Option<String>,
    strokes: Vec<Stroke>,
    users: Roster,
    settings: BoardSettings,
    brush: Brush,
    /// Id of the local stroke still being drawn.
    drawing: Option<String>,
    /// Id of the most recent local stroke that was finalized.
    last_stroke: Option<String>,
    connection_id: Option<Uuid>,
    online_count: u64,
}

impl ClientView {
    // =========================================================================
    // READ
    // =========================================================================

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    #[must_use]
    pub fn users(&self) -> &Roster {
        &self.users
    }

    #[must_use]
    pub fn settings(&self) -> BoardSettings {
        self.settings
    }

    #[must_use]
    pub fn is_layer_locked(&self) -> bool {
        self.settings.is_layer_locked
    }

    #[must_use]
    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    #[must_use]
    pub fn drawing(&self) -> Option<&str> {
        self.drawing.as_deref()
    }

    #[must_use]
    pub fn last_stroke(&self) -> Option<&str> {
        self.last_stroke.as_deref()
    }

    #[must_use]
    pub fn connection_id(&self) -> Option<Uuid> {
        self.connection_id
    }

    #[must_use]
    pub fn online_count(&self) -> u64 {
        self.online_count
    }

    // =========================================================================
    // REDUCER
    // =========================================================================

    /// Apply one action. Returns the local stroke this action finalized, if
    /// any.
    pub fn apply(&mut self, action: Action) -> Option<Stroke> {
        match action {
            Action::Connected(connection_id) => {
                self.connection_id = Some(connection_id);
                None
            }
            Action::OnlineCount(count) => {
                self.online_count = count;
                None
            }
            Action::LocalIdentity(identity) => {
                self.users.set_local(&identity);
                None
            }
            Action::SetBrush(brush) => {
                self.brush = brush;
                None
            }
            Action::BeginStroke(stroke) => {
                let finished = self.finish_stroke();
                self.drawing = Some(stroke.id.clone());
                self.strokes.push(stroke);
                finished
            }
            Action::ExtendStroke(point) => {
                if let Some(stroke) = self.drawing_stroke_mut() {
                    stroke.points.push(point);
                }
                None
            }
            Action::FinishStroke => self.finish_stroke(),
            Action::AddStroke(stroke) => {
                if !self.has_stroke(&stroke.id) {
                    self.strokes.push(stroke);
                }
                None
            }
            Action::Clear => {
                self.strokes.clear();
                self.drawing = None;
                None
            }
            Action::SetLayerLock(locked) => {
                self.settings.is_layer_locked = locked;
                if locked { self.finish_stroke() } else { None }
            }
            Action::SetMode(mode) => {
                self.settings.collaboration_mode = mode;
                None
            }
            Action::Snapshot(presences) => {
                self.users.apply_snapshot(&presences);
                None
            }
            Action::Joined(presence) => {
                self.users.apply_joined(&presence);
                None
            }
            Action::Left(identity_id) => {
                self.users.apply_left(&identity_id);
                None
            }
            Action::MoveCursor { identity_id, cursor } => {
                self.users.apply_cursor(&identity_id, cursor);
                None
            }
            Action::Collaborators(users) => {
                self.users.merge_collaborators(&users);
                None
            }
            Action::Hydrate(board) => self.hydrate(board),
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn has_stroke(&self, id: &str) -> bool {
        self.strokes.iter().any(|stroke| stroke.id == id)
    }

    fn drawing_stroke_mut(&mut self) -> Option<&mut Stroke> {
        let id = self.drawing.as_deref()?;
        self.strokes.iter_mut().rev().find(|stroke| stroke.id == id)
    }

    fn finish_stroke(&mut self) -> Option<Stroke> {
        let id = self.drawing.take()?;
        let stroke = self.strokes.iter().rev().find(|stroke| stroke.id == id).cloned()?;
        self.last_stroke = Some(stroke.id.clone());
        Some(stroke)
    }

    /// Persisted strokes not seen yet go in front of everything already
    /// drawn or relayed this session.
    fn hydrate(&mut self, board: Board) -> Option<Stroke> {
        let settings = board.settings();
        let mut strokes: Vec<Stroke> = board
            .strokes
            .into_iter()
            .filter(|stroke| !self.has_stroke(&stroke.id))
            .collect();
        strokes.append(&mut self.strokes);
        self.strokes = strokes;
        self.title = Some(board.title);
        self.apply(Action::SetMode(settings.collaboration_mode));
        self.apply(Action::SetLayerLock(settings.is_layer_locked))
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
