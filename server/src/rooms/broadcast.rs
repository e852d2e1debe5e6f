//! Presence broadcaster: turns registry outcomes into frames.
//!
//! DESIGN
//! ======
//! Planning is pure. Each function returns the `Delivery` list for one
//! registry mutation, and [`dispatch`] pushes those into connection outboxes.
//! The room actor calls both back to back after the mutation has committed,
//! so per-room output order equals mutation order.
//!
//! Delivery is best-effort: a full outbox drops the frame for that one slow
//! consumer, a closed outbox means the socket is already going away.

use frames::model::Presence;
use frames::{Frame, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;
use uuid::Uuid;

use super::registry::{JoinKind, JoinOutcome, LeaveOutcome, Room};

/// One frame addressed to one connection.
#[derive(Clone, Debug)]
pub struct Delivery {
    pub to: Uuid,
    pub frame: Frame,
}

fn to_all_except(room: &Room, except: Option<Uuid>, frame: &Frame) -> Vec<Delivery> {
    room.connections()
        .filter(|conn| Some(*conn) != except)
        .map(|to| Delivery { to, frame: frame.clone() })
        .collect()
}

// =============================================================================
// PLANNING
// =============================================================================

/// Frames caused by `joiner` joining `room`.
///
/// The joiner always gets a `users:list` snapshot correlated to its join
/// request. Everyone else hears `user:joined` only for a new identity.
#[must_use]
pub fn plan_join(room: &Room, joiner: Uuid, outcome: &JoinOutcome, join_frame_id: Option<&str>) -> Vec<Delivery> {
    let mut out = Vec::new();

    if let Some(departed) = &outcome.departed {
        let left = ServerEvent::UserLeft { identity_id: departed.clone() }
            .to_frame()
            .with_room(room.id());
        out.extend(to_all_except(room, Some(joiner), &left));
    }

    let mut users = ServerEvent::UsersList { users: outcome.roster.clone() }
        .to_frame()
        .with_room(room.id());
    if let Some(parent) = join_frame_id {
        users = users.with_parent(parent);
    }
    out.push(Delivery { to: joiner, frame: users });

    if outcome.kind == JoinKind::NewIdentity {
        let joined = ServerEvent::UserJoined(outcome.presence.clone())
            .to_frame()
            .with_room(room.id());
        out.extend(to_all_except(room, Some(joiner), &joined));
    }

    out
}

/// Frames caused by a connection leaving. Only a departure is announced.
#[must_use]
pub fn plan_leave(room: &Room, outcome: &LeaveOutcome) -> Vec<Delivery> {
    let Some(departed) = &outcome.departed else {
        return Vec::new();
    };
    let left = ServerEvent::UserLeft { identity_id: departed.clone() }
        .to_frame()
        .with_room(room.id());
    to_all_except(room, None, &left)
}

/// Frames caused by a cursor move. Never echoed to the sending connection.
#[must_use]
pub fn plan_cursor(room: &Room, origin: Uuid, presence: &Presence) -> Vec<Delivery> {
    let moved = ServerEvent::CursorUpdated {
        identity_id: presence.identity_id.clone(),
        connection_id: origin,
        cursor: presence.cursor,
    }
    .to_frame()
    .with_room(room.id())
    .with_from(presence.identity_id.clone());
    to_all_except(room, Some(origin), &moved)
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Push planned frames into their outboxes without waiting.
pub fn dispatch(room: &Room, deliveries: Vec<Delivery>) {
    for Delivery { to, frame } in deliveries {
        let Some(outbox) = room.outbox(to) else {
            continue;
        };
        match outbox.try_send(frame) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(frame)) => {
                warn!(room = room.id(), connection_id = %to, syscall = %frame.syscall, "outbox full; frame dropped");
            }
        }
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
