//! Room hub: routes connection events into per-room actors.
//!
//! DESIGN
//! ======
//! The hub owns two indexes and no room state:
//! - `rooms`: room id -> handle of the actor currently serving it.
//! - `connections`: connection id -> room id it has joined.
//!
//! Rooms are spawned lazily by the first join and retired once a leave
//! reports them empty. Retirement is a handshake done while holding the
//! `rooms` lock: the actor re-checks emptiness itself, so a join that slipped
//! into its mailbox first keeps it alive. A join that lands on an actor which
//! has already exited sees its reply channel dropped and retries against a
//! fresh actor.

mod actor;
pub mod broadcast;
pub mod registry;
pub mod relay;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use frames::model::{Cursor, Identity, Presence};
use frames::{ErrorCode, Frame};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use actor::{RoomCommand, RoomHandle, spawn_room};
pub use registry::{JoinKind, JoinOutcome, LeaveOutcome, Outbox};

const JOIN_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("room unavailable: {0}")]
    RoomUnavailable(String),
}

impl ErrorCode for HubError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RoomUnavailable(_) => "E_ROOM_UNAVAILABLE",
        }
    }
}

#[derive(Clone)]
pub struct RoomHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    rooms: Mutex<HashMap<String, RoomHandle>>,
    connections: Mutex<HashMap<Uuid, String>>,
    next_actor_id: AtomicU64,
    mailbox_capacity: usize,
}

impl RoomHub {
    #[must_use]
    pub fn new(mailbox_capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                rooms: Mutex::new(HashMap::new()),
                connections: Mutex::new(HashMap::new()),
                next_actor_id: AtomicU64::new(1),
                mailbox_capacity: mailbox_capacity.max(1),
            }),
        }
    }

    // =========================================================================
    // CONNECTION LIFECYCLE
    // =========================================================================

    /// Join `connection_id` to `room` as `identity`.
    ///
    /// A connection that already sits in another room leaves it first.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::RoomUnavailable`] if no live actor accepted the
    /// join after a few attempts.
    pub async fn join(
        &self,
        room: &str,
        connection_id: Uuid,
        identity: Identity,
        outbox: Outbox,
        join_frame_id: Option<String>,
    ) -> Result<JoinOutcome, HubError> {
        let previous = self.inner.connections.lock().await.get(&connection_id).cloned();
        if previous.as_deref().is_some_and(|prev| prev != room) {
            self.leave(connection_id).await;
        }

        for _ in 0..JOIN_ATTEMPTS {
            let handle = self.get_or_spawn(room).await;
            let (reply, rx) = oneshot::channel();
            let command = RoomCommand::Join {
                connection_id,
                identity: identity.clone(),
                outbox: outbox.clone(),
                join_frame_id: join_frame_id.clone(),
                reply,
            };
            if handle.tx.send(command).await.is_err() {
                debug!(room, actor_id = handle.actor_id, "join raced a retiring room; retrying");
                continue;
            }
            let Ok(outcome) = rx.await else {
                debug!(room, actor_id = handle.actor_id, "room exited before join; retrying");
                continue;
            };
            self.inner.connections.lock().await.insert(connection_id, room.to_owned());
            return Ok(outcome);
        }

        warn!(room, %connection_id, "join failed after retries");
        Err(HubError::RoomUnavailable(room.to_owned()))
    }

    /// Remove `connection_id` from whatever room it joined. Unknown
    /// connections are a no-op, so this is safe to call on every disconnect.
    pub async fn leave(&self, connection_id: Uuid) -> LeaveOutcome {
        let Some(room) = self.inner.connections.lock().await.remove(&connection_id) else {
            return LeaveOutcome::default();
        };
        let Some(handle) = self.handle(&room).await else {
            return LeaveOutcome::default();
        };

        let (reply, rx) = oneshot::channel();
        if handle.tx.send(RoomCommand::Leave { connection_id, reply }).await.is_err() {
            return LeaveOutcome::default();
        }
        let outcome = rx.await.unwrap_or_default();
        if outcome.room_empty {
            self.retire(&room, handle.actor_id).await;
        }
        outcome
    }

    // =========================================================================
    // ROOM TRAFFIC
    // =========================================================================

    /// Record a cursor move and tell the rest of the room.
    pub async fn update_cursor(&self, connection_id: Uuid, cursor: Cursor) {
        if let Some(handle) = self.handle_for(connection_id).await {
            let _ = handle.tx.send(RoomCommand::Cursor { connection_id, cursor }).await;
        }
    }

    /// Fan a relayable client frame out to the rest of the origin's room.
    pub async fn relay(&self, origin: Uuid, frame: Frame) {
        if let Some(handle) = self.handle_for(origin).await {
            let _ = handle.tx.send(RoomCommand::Relay { origin, frame }).await;
        }
    }

    /// Live roster of `room`; empty when the room is not open.
    pub async fn roster(&self, room: &str) -> Vec<Presence> {
        let Some(handle) = self.handle(room).await else {
            return Vec::new();
        };
        let (reply, rx) = oneshot::channel();
        if handle.tx.send(RoomCommand::Snapshot { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn room_count(&self) -> usize {
        self.inner.rooms.lock().await.len()
    }

    pub async fn room_of(&self, connection_id: Uuid) -> Option<String> {
        self.inner.connections.lock().await.get(&connection_id).cloned()
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    async fn handle(&self, room: &str) -> Option<RoomHandle> {
        self.inner.rooms.lock().await.get(room).cloned()
    }

    async fn handle_for(&self, connection_id: Uuid) -> Option<RoomHandle> {
        let room = self.room_of(connection_id).await?;
        self.handle(&room).await
    }

    async fn get_or_spawn(&self, room: &str) -> RoomHandle {
        let mut rooms = self.inner.rooms.lock().await;
        if let Some(handle) = rooms.get(room) {
            if !handle.tx.is_closed() {
                return handle.clone();
            }
        }
        let actor_id = self.inner.next_actor_id.fetch_add(1, Ordering::Relaxed);
        let handle = spawn_room(room.to_owned(), actor_id, self.inner.mailbox_capacity);
        rooms.insert(room.to_owned(), handle.clone());
        handle
    }

    async fn retire(&self, room: &str, actor_id: u64) {
        let mut rooms = self.inner.rooms.lock().await;
        let Some(handle) = rooms.get(room) else {
            return;
        };
        if handle.actor_id != actor_id {
            return;
        }
        let (reply, rx) = oneshot::channel();
        if handle.tx.send(RoomCommand::Retire { reply }).await.is_err() {
            rooms.remove(room);
            return;
        }
        if rx.await.unwrap_or(true) {
            rooms.remove(room);
            debug!(room, actor_id, "room retired");
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
