//! Room actor: the single writer for one room's registry.
//!
//! DESIGN
//! ======
//! Every mutation of a room goes through its mailbox and is applied by one
//! task, so join/leave/cursor/relay for the same room are totally ordered
//! and broadcasts go out in mutation order. The actor exits on `Retire` when
//! it is still empty at that point, or when every sender is gone.

use frames::Frame;
use frames::model::{Cursor, Identity, Presence};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use super::broadcast::{self, dispatch};
use super::registry::{JoinOutcome, LeaveOutcome, Outbox, Room};
use super::relay;

pub(crate) enum RoomCommand {
    Join {
        connection_id: Uuid,
        identity: Identity,
        outbox: Outbox,
        join_frame_id: Option<String>,
        reply: oneshot::Sender<JoinOutcome>,
    },
    Leave {
        connection_id: Uuid,
        reply: oneshot::Sender<LeaveOutcome>,
    },
    Cursor {
        connection_id: Uuid,
        cursor: Cursor,
    },
    Relay {
        origin: Uuid,
        frame: Frame,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Presence>>,
    },
    /// Stop if still empty. Replies `true` when the actor is exiting.
    Retire {
        reply: oneshot::Sender<bool>,
    },
}

/// Hub-side handle to a running room actor.
#[derive(Clone)]
pub(crate) struct RoomHandle {
    /// Distinguishes successive actors for the same room id.
    pub(crate) actor_id: u64,
    pub(crate) tx: mpsc::Sender<RoomCommand>,
}

pub(crate) fn spawn_room(room_id: String, actor_id: u64, mailbox_capacity: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    tokio::spawn(run_room(Room::new(room_id), rx));
    RoomHandle { actor_id, tx }
}

async fn run_room(mut room: Room, mut rx: mpsc::Receiver<RoomCommand>) {
    info!(room = room.id(), "room opened");
    while let Some(command) = rx.recv().await {
        match command {
            RoomCommand::Join { connection_id, identity, outbox, join_frame_id, reply } => {
                let outcome = room.join(connection_id, &identity, outbox);
                info!(
                    room = room.id(),
                    %connection_id,
                    identity_id = %identity.id,
                    kind = ?outcome.kind,
                    connections = room.connection_count(),
                    "room: join"
                );
                let deliveries = broadcast::plan_join(&room, connection_id, &outcome, join_frame_id.as_deref());
                dispatch(&room, deliveries);
                let _ = reply.send(outcome);
            }
            RoomCommand::Leave { connection_id, reply } => {
                let outcome = room.leave(connection_id);
                if let Some(identity_id) = &outcome.departed {
                    info!(room = room.id(), %connection_id, %identity_id, "room: identity departed");
                }
                let deliveries = broadcast::plan_leave(&room, &outcome);
                dispatch(&room, deliveries);
                let _ = reply.send(outcome);
            }
            RoomCommand::Cursor { connection_id, cursor } => {
                if let Some(presence) = room.update_cursor(connection_id, cursor) {
                    let deliveries = broadcast::plan_cursor(&room, connection_id, &presence);
                    dispatch(&room, deliveries);
                }
            }
            RoomCommand::Relay { origin, frame } => {
                let deliveries = relay::fan_out(&room, origin, &frame);
                debug!(room = room.id(), syscall = %frame.syscall, peers = deliveries.len(), "room: relay");
                dispatch(&room, deliveries);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(room.roster());
            }
            RoomCommand::Retire { reply } => {
                let retiring = room.is_empty();
                let _ = reply.send(retiring);
                if retiring {
                    break;
                }
            }
        }
    }
    info!(room = room.id(), "room closed");
}
