//! Event relay: fans drawing and settings events out to the rest of a room.
//!
//! The payload is forwarded unchanged. Only the envelope is rewritten: the
//! server-side syscall name, a fresh frame id, the room, and the origin
//! identity in `from`. The relay never touches the persisted store.

use frames::Frame;
use frames::event::relayed_syscall;
use uuid::Uuid;

use super::broadcast::Delivery;
use super::registry::Room;

/// Rewrite an inbound client frame into the notification peers receive.
/// Returns `None` for syscalls that are not relayable.
#[must_use]
pub fn relay_frame(room_id: &str, origin_identity: &str, frame: &Frame) -> Option<Frame> {
    let syscall = relayed_syscall(&frame.syscall)?;
    let mut out = Frame::request(syscall, serde_json::Map::new())
        .with_room(room_id)
        .with_from(origin_identity);
    out.data = frame.data.clone();
    Some(out)
}

/// Deliver `frame` to every connection in `room` except `origin`.
///
/// Frames from connections that are not members of the room are dropped.
#[must_use]
pub fn fan_out(room: &Room, origin: Uuid, frame: &Frame) -> Vec<Delivery> {
    let Some(identity) = room.identity_of(origin) else {
        return Vec::new();
    };
    let Some(relayed) = relay_frame(room.id(), identity, frame) else {
        return Vec::new();
    };
    room.connections()
        .filter(|conn| *conn != origin)
        .map(|to| Delivery { to, frame: relayed.clone() })
        .collect()
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
