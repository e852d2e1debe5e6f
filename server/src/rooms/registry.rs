//! Per-room presence registry.
//!
//! DESIGN
//! ======
//! `Room` is a plain state machine with no locking or I/O. It is owned by
//! exactly one actor task (see [`super::actor`]), which is what makes every
//! mutation atomic with respect to the others. Callers get back an outcome
//! describing what changed; turning that into frames is the broadcaster's
//! job.
//!
//! INVARIANTS
//! ==========
//! - One `Presence` per identity, present iff its connection set is non-empty.
//! - Every connection id in a presence has a matching `members` entry and
//!   vice versa.

use std::collections::{BTreeMap, HashMap};

use frames::Frame;
use frames::model::{Cursor, Identity, Presence};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Per-connection queue of outbound frames.
pub type Outbox = mpsc::Sender<Frame>;

struct Member {
    identity_id: String,
    outbox: Outbox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    /// First live connection for this identity in the room.
    NewIdentity,
    /// The identity was already present through another connection.
    Rejoin,
}

#[derive(Clone, Debug)]
pub struct JoinOutcome {
    pub kind: JoinKind,
    /// The joiner's presence after the join.
    pub presence: Presence,
    /// Full roster after the join, sorted by identity id.
    pub roster: Vec<Presence>,
    /// Identity that lost its last connection because this connection
    /// switched identities.
    pub departed: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Identity whose last connection just closed.
    pub departed: Option<String>,
    pub room_empty: bool,
}

pub struct Room {
    id: String,
    presences: BTreeMap<String, Presence>,
    members: HashMap<Uuid, Member>,
}

impl Room {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), presences: BTreeMap::new(), members: HashMap::new() }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.presences.is_empty()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn identity_of(&self, connection_id: Uuid) -> Option<&str> {
        self.members.get(&connection_id).map(|m| m.identity_id.as_str())
    }

    #[must_use]
    pub fn outbox(&self, connection_id: Uuid) -> Option<&Outbox> {
        self.members.get(&connection_id).map(|m| &m.outbox)
    }

    /// Every live connection in the room.
    pub fn connections(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.members.keys().copied()
    }

    /// Copy-on-read snapshot, sorted by identity id.
    #[must_use]
    pub fn roster(&self) -> Vec<Presence> {
        self.presences.values().cloned().collect()
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Register `connection_id` as a live connection of `identity`.
    pub fn join(&mut self, connection_id: Uuid, identity: &Identity, outbox: Outbox) -> JoinOutcome {
        let mut departed = None;
        if let Some(current) = self.members.get(&connection_id) {
            if current.identity_id != identity.id {
                departed = self.detach(connection_id);
            }
        }

        self.members
            .insert(connection_id, Member { identity_id: identity.id.clone(), outbox });

        let kind = match self.presences.get_mut(&identity.id) {
            Some(presence) => {
                presence.connections.insert(connection_id);
                presence.name.clone_from(&identity.name);
                presence.color.clone_from(&identity.color);
                JoinKind::Rejoin
            }
            None => {
                self.presences
                    .insert(identity.id.clone(), Presence::new(identity, connection_id));
                JoinKind::NewIdentity
            }
        };

        let presence = self
            .presences
            .get(&identity.id)
            .cloned()
            .unwrap_or_else(|| Presence::new(identity, connection_id));

        JoinOutcome { kind, presence, roster: self.roster(), departed }
    }

    /// Drop `connection_id`. Unknown connections are a no-op.
    pub fn leave(&mut self, connection_id: Uuid) -> LeaveOutcome {
        if !self.members.contains_key(&connection_id) {
            return LeaveOutcome::default();
        }
        let departed = self.detach(connection_id);
        LeaveOutcome { departed, room_empty: self.is_empty() }
    }

    /// Move the cursor of the identity behind `connection_id`.
    pub fn update_cursor(&mut self, connection_id: Uuid, cursor: Cursor) -> Option<Presence> {
        let identity_id = &self.members.get(&connection_id)?.identity_id;
        let presence = self.presences.get_mut(identity_id)?;
        presence.cursor = cursor;
        Some(presence.clone())
    }

    /// Remove a connection from its member entry and presence. Returns the
    /// identity id if that presence emptied and was deleted.
    fn detach(&mut self, connection_id: Uuid) -> Option<String> {
        let member = self.members.remove(&connection_id)?;
        let presence = self.presences.get_mut(&member.identity_id)?;
        presence.connections.remove(&connection_id);
        if presence.connections.is_empty() {
            self.presences.remove(&member.identity_id);
            return Some(member.identity_id);
        }
        None
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
