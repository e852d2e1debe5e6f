//! Client synchronizer: local gestures and relayed events in, effects out.
//!
//! DESIGN
//! ======
//! The synchronizer owns the [`ClientView`] and the local identity. Every
//! entry point applies its change to the view first and then returns the
//! [`Effect`]s the outside world must see:
//! - `Effect::Relay` for live peers, sent over the websocket
//! - `Effect::Persist` for the durable store, sent over REST
//!
//! Both effects of one edit are independent and fire-and-forget; a failure
//! of either never rolls back the view.
//!
//! GESTURES
//! ========
//! Pointer-down starts a stroke (rejected while the layer is locked),
//! pointer-move adds points locally and only relays the cursor, pointer-up
//! relays and persists the finished stroke once. A lock arriving mid-gesture
//! finishes the stroke as if the pointer went up.
//!
//! JOIN ORDER
//! ==========
//! The server ignores everything a connection sends before `room:join`, and
//! the join goes out when `session:connected` arrives. Until then relayed
//! edits queue in `pending` and are released right behind the join. Cursor
//! moves made before the join are stale by then and are dropped.

use frames::model::{
    Board, BoardSettings, CollaborationMode, Cursor, Identity, Point, SettingsPatch, Stroke, User,
};
use frames::{ClientEvent, Frame, ServerEvent};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{Action, Brush, ClientView};

/// Durable store call produced by a local edit.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreOp {
    AppendStroke(Stroke),
    Clear,
    UpdateSettings(SettingsPatch),
    AddCollaborator(Uuid),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Relay(ClientEvent),
    Persist(StoreOp),
}

pub struct Synchronizer {
    room: String,
    identity: Identity,
    view: ClientView,
    joined: bool,
    pending: Vec<ClientEvent>,
}

impl Synchronizer {
    #[must_use]
    pub fn new(room: impl Into<String>, identity: Identity) -> Self {
        let mut view = ClientView::default();
        view.apply(Action::LocalIdentity(identity.clone()));
        Self { room: room.into(), identity, view, joined: false, pending: Vec::new() }
    }

    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn view(&self) -> &ClientView {
        &self.view
    }

    /// Whether `room:join` has been emitted on the current connection.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    // =========================================================================
    // LOCAL GESTURES
    // =========================================================================

    pub fn pointer_down(&mut self, point: Point) -> Vec<Effect> {
        if self.view.is_layer_locked() {
            debug!(room = %self.room, "sync: stroke rejected, layer locked");
            return Vec::new();
        }
        let brush = self.view.brush().clone();
        let stroke = Stroke {
            id: Uuid::new_v4().to_string(),
            tool: brush.tool,
            color: brush.color,
            size: brush.size,
            points: vec![point],
            author_id: self.identity.id.clone(),
        };
        let mut effects = finished(self.view.apply(Action::BeginStroke(stroke)));
        effects.push(cursor_effect(point));
        self.outbound(effects)
    }

    pub fn pointer_move(&mut self, point: Point) -> Vec<Effect> {
        if self.view.drawing().is_some() {
            self.view.apply(Action::ExtendStroke(point));
        }
        self.outbound(vec![cursor_effect(point)])
    }

    pub fn pointer_up(&mut self) -> Vec<Effect> {
        let effects = finished(self.view.apply(Action::FinishStroke));
        self.outbound(effects)
    }

    pub fn clear(&mut self) -> Vec<Effect> {
        self.view.apply(Action::Clear);
        self.outbound(vec![Effect::Relay(ClientEvent::CanvasClear), Effect::Persist(StoreOp::Clear)])
    }

    pub fn set_layer_lock(&mut self, locked: bool) -> Vec<Effect> {
        let mut effects = finished(self.view.apply(Action::SetLayerLock(locked)));
        effects.push(Effect::Relay(ClientEvent::LayerLock { locked }));
        effects.push(Effect::Persist(StoreOp::UpdateSettings(SettingsPatch {
            is_layer_locked: Some(locked),
            collaboration_mode: None,
        })));
        self.outbound(effects)
    }

    pub fn set_mode(&mut self, mode: CollaborationMode) -> Vec<Effect> {
        self.view.apply(Action::SetMode(mode));
        self.outbound(vec![
            Effect::Relay(ClientEvent::ModeSet { mode }),
            Effect::Persist(StoreOp::UpdateSettings(SettingsPatch { is_layer_locked: None, collaboration_mode: Some(mode) })),
        ])
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.view.apply(Action::SetBrush(brush));
    }

    // =========================================================================
    // REMOTE EVENTS
    // =========================================================================

    /// Apply one frame received from the server. Unparseable frames are
    /// logged and dropped.
    pub fn receive(&mut self, frame: &Frame) -> Vec<Effect> {
        match ServerEvent::from_frame(frame) {
            Ok(event) => self.apply_remote(event),
            Err(e) => {
                warn!(syscall = %frame.syscall, error = %e, "sync: dropping unparseable frame");
                Vec::new()
            }
        }
    }

    pub fn apply_remote(&mut self, event: ServerEvent) -> Vec<Effect> {
        match event {
            ServerEvent::SessionConnected { connection_id } => {
                info!(%connection_id, room = %self.room, "sync: connected, joining room");
                self.view.apply(Action::Connected(connection_id));
                self.joined = true;
                let mut effects = vec![Effect::Relay(ClientEvent::Join(self.identity.clone()))];
                effects.extend(self.pending.drain(..).map(Effect::Relay));
                effects
            }
            ServerEvent::UsersList { users } => {
                self.view.apply(Action::Snapshot(users));
                Vec::new()
            }
            ServerEvent::UserJoined(presence) => {
                self.view.apply(Action::Joined(presence));
                Vec::new()
            }
            ServerEvent::UserLeft { identity_id } => {
                self.view.apply(Action::Left(identity_id));
                Vec::new()
            }
            ServerEvent::CursorUpdated { identity_id, cursor, .. } => {
                self.view.apply(Action::MoveCursor { identity_id, cursor });
                Vec::new()
            }
            ServerEvent::StrokeAdded(stroke) => {
                self.view.apply(Action::AddStroke(stroke));
                Vec::new()
            }
            ServerEvent::CanvasCleared => {
                self.view.apply(Action::Clear);
                Vec::new()
            }
            ServerEvent::LayerLocked { locked } => {
                let effects = finished(self.view.apply(Action::SetLayerLock(locked)));
                self.outbound(effects)
            }
            ServerEvent::ModeUpdated { mode } => {
                self.view.apply(Action::SetMode(mode));
                Vec::new()
            }
            ServerEvent::OnlineCount { count } => {
                self.view.apply(Action::OnlineCount(count));
                Vec::new()
            }
            ServerEvent::GatewayError { code, message } => {
                warn!(%code, %message, "sync: server rejected a frame");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // LOAD
    // =========================================================================

    /// Merge the persisted board. A lock in the stored settings finishes any
    /// gesture already under way.
    pub fn hydrate(&mut self, board: Board) -> Vec<Effect> {
        let settings: BoardSettings = board.settings();
        debug!(room = %self.room, strokes = board.strokes.len(), ?settings, "sync: hydrating");
        let effects = finished(self.view.apply(Action::Hydrate(board)));
        self.outbound(effects)
    }

    /// Merge the persisted collaborator list, then register the local
    /// identity if it is a store user that is not listed yet.
    pub fn collaborators_loaded(&mut self, users: Vec<User>) -> Vec<Effect> {
        let local_id = Uuid::parse_str(&self.identity.id).ok();
        let listed = local_id.is_some_and(|id| users.iter().any(|user| user.id == id));
        self.view.apply(Action::Collaborators(users));
        match local_id {
            Some(id) if !listed => vec![Effect::Persist(StoreOp::AddCollaborator(id))],
            _ => Vec::new(),
        }
    }

    /// Pass effects through, holding relayed edits until the room is joined.
    fn outbound(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        if self.joined {
            return effects;
        }
        let mut out = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::Relay(ClientEvent::CursorUpdate(_)) => {}
                Effect::Relay(event) => {
                    debug!(room = %self.room, syscall = event.syscall(), "sync: holding edit until joined");
                    self.pending.push(event);
                }
                Effect::Persist(op) => out.push(Effect::Persist(op)),
            }
        }
        out
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn cursor_effect(point: Point) -> Effect {
    Effect::Relay(ClientEvent::CursorUpdate(Cursor { x: point.x, y: point.y }))
}

/// Relay and persist a stroke the reducer just finalized.
fn finished(stroke: Option<Stroke>) -> Vec<Effect> {
    match stroke {
        Some(stroke) => vec![
            Effect::Relay(ClientEvent::StrokeAdd(stroke.clone())),
            Effect::Persist(StoreOp::AppendStroke(stroke)),
        ],
        None => Vec::new(),
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
