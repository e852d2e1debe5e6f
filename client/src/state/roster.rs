//! Identity-keyed roster for the client view.
//!
//! DESIGN
//! ======
//! The server tracks connections; this view tracks identities. Every source
//! that names a user (live snapshots, join/leave notices, cursor moves, the
//! persisted collaborator list, the local identity) lands on one entry keyed
//! by identity id. A later record for a known identity overwrites fields on
//! that entry instead of adding another.
//!
//! Entries that are neither online, collaborators, nor the local identity
//! are dropped. A collaborator who goes offline stays listed with
//! `online = false`.

use std::collections::BTreeMap;

use frames::model::{Cursor, Identity, Presence, User};

/// One visible user, whatever mix of sources reported it.
#[derive(Clone, Debug, PartialEq)]
pub struct UserView {
    pub identity_id: String,
    pub name: String,
    pub color: String,
    pub cursor: Cursor,
    /// Has at least one live connection in the room.
    pub online: bool,
    /// Listed among the board's persisted collaborators.
    pub collaborator: bool,
    /// The identity this client runs as.
    pub local: bool,
}

impl UserView {
    fn new(identity_id: &str, name: &str, color: &str) -> Self {
        Self {
            identity_id: identity_id.to_owned(),
            name: name.to_owned(),
            color: color.to_owned(),
            cursor: Cursor::default(),
            online: false,
            collaborator: false,
            local: false,
        }
    }

    fn is_listed(&self) -> bool {
        self.online || self.collaborator || self.local
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Roster {
    users: BTreeMap<String, UserView>,
}

impl Roster {
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[must_use]
    pub fn get(&self, identity_id: &str) -> Option<&UserView> {
        self.users.get(identity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserView> {
        self.users.values()
    }

    /// Number of identities currently online in the room.
    #[must_use]
    pub fn online(&self) -> usize {
        self.users.values().filter(|user| user.online).count()
    }

    // =========================================================================
    // SOURCES
    // =========================================================================

    pub fn set_local(&mut self, identity: &Identity) {
        let user = self.entry(&identity.id, &identity.name, &identity.color);
        user.name.clone_from(&identity.name);
        user.color.clone_from(&identity.color);
        user.local = true;
    }

    /// Replace the live part of the roster with a full room snapshot.
    pub fn apply_snapshot(&mut self, presences: &[Presence]) {
        for user in self.users.values_mut() {
            user.online = false;
        }
        for presence in presences {
            self.apply_presence(presence);
        }
        self.users.retain(|_, user| user.is_listed());
    }

    pub fn apply_joined(&mut self, presence: &Presence) {
        self.apply_presence(presence);
    }

    pub fn apply_left(&mut self, identity_id: &str) {
        let Some(user) = self.users.get_mut(identity_id) else {
            return;
        };
        user.online = false;
        if !user.is_listed() {
            self.users.remove(identity_id);
        }
    }

    /// Move a known identity's cursor. Returns `false` for unknown ids.
    pub fn apply_cursor(&mut self, identity_id: &str, cursor: Cursor) -> bool {
        match self.users.get_mut(identity_id) {
            Some(user) => {
                user.cursor = cursor;
                true
            }
            None => false,
        }
    }

    /// Merge the persisted collaborator list.
    pub fn merge_collaborators(&mut self, collaborators: &[User]) {
        for collaborator in collaborators {
            let id = collaborator.id.to_string();
            let user = self.entry(&id, &collaborator.name, &collaborator.color);
            user.name.clone_from(&collaborator.name);
            user.color.clone_from(&collaborator.color);
            user.collaborator = true;
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn apply_presence(&mut self, presence: &Presence) {
        let user = self.entry(&presence.identity_id, &presence.name, &presence.color);
        user.name.clone_from(&presence.name);
        user.color.clone_from(&presence.color);
        user.cursor = presence.cursor;
        user.online = true;
    }

    fn entry(&mut self, identity_id: &str, name: &str, color: &str) -> &mut UserView {
        self.users
            .entry(identity_id.to_owned())
            .or_insert_with(|| UserView::new(identity_id, name, color))
    }
}

#[cfg(test)]
#[path = "roster_test.rs"]
mod tests;
