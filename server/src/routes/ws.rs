//! WebSocket handler: one realtime session per socket.
//!
//! DESIGN
//! ======
//! On upgrade, assigns a connection id and enters a `select!` loop:
//! - Incoming client frames -> parse + dispatch by event
//! - Frames queued in this connection's outbox by room actors -> socket
//!
//! Handlers never write to peers. Room traffic goes through the hub, whose
//! actors fan it out; the session only sends error replies to its own
//! socket.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade -> send `session:connected`, bump the online count
//! 2. `room:join` moves the session from Connecting to Joined
//! 3. Joined sessions forward cursor and relayable events to their room
//! 4. Close -> `RoomHub::leave` exactly once -> online count drops

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{ClientEvent, ErrorCode, Frame, ServerEvent, decode_frame, encode_frame};
use frames::model::Identity;
use frames::event::EventError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::rooms::Outbox;
use crate::state::AppState;

// =============================================================================
// SESSION
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum Phase {
    Connecting,
    Joined { room: String, identity_id: String },
    Disconnected,
}

struct Session {
    connection_id: Uuid,
    phase: Phase,
    outbox: Outbox,
}

impl Session {
    fn new(connection_id: Uuid, outbox: Outbox) -> Self {
        Self { connection_id, phase: Phase::Connecting, outbox }
    }
}

/// Result returned by event handlers. The dispatch layer applies it.
enum Outcome {
    /// The connection joined a room; its roster arrives through the outbox.
    Joined { room: String, identity_id: String },
    /// Handed to the room actor.
    Routed,
    /// Dropped without effect (non-join traffic before a join).
    Ignored,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.connection_outbox_capacity);

    let welcome = ServerEvent::SessionConnected { connection_id }.to_frame();
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    register_client(&state, connection_id, client_tx.clone()).await;
    info!(%connection_id, "ws: client connected");

    let mut session = Session::new(connection_id, client_tx);

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let replies = match msg {
                    Message::Binary(bytes) => process_inbound_bytes(&state, &mut session, &bytes).await,
                    Message::Text(text) => process_inbound_text(&state, &mut session, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => continue,
                };
                for frame in replies {
                    let _ = send_frame(&mut socket, &frame).await;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    disconnect(&state, &mut session).await;
    info!(%connection_id, "ws: client disconnected");
}

/// Tear down a session: leave its room (a no-op if it never joined) and
/// drop it from the online set.
async fn disconnect(state: &AppState, session: &mut Session) {
    let connection_id = session.connection_id;
    match std::mem::replace(&mut session.phase, Phase::Disconnected) {
        Phase::Disconnected => return,
        Phase::Connecting => {}
        Phase::Joined { room, identity_id } => {
            debug!(%connection_id, %room, %identity_id, "ws: leaving room on disconnect");
        }
    }
    let outcome = state.hub.leave(connection_id).await;
    if let Some(identity_id) = outcome.departed {
        let rooms = state.hub.room_count().await;
        info!(%connection_id, %identity_id, rooms, "ws: identity departed");
    }
    unregister_client(state, connection_id).await;
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one binary protobuf frame and process it. Returns frames for the
/// sender only.
async fn process_inbound_bytes(state: &AppState, session: &mut Session, bytes: &[u8]) -> Vec<Frame> {
    match decode_frame(bytes) {
        Ok(req) => process_frame(state, session, req).await,
        Err(e) => {
            warn!(connection_id = %session.connection_id, error = %e, "ws: invalid inbound frame");
            vec![gateway_error(None, &e)]
        }
    }
}

/// JSON text frames are accepted for debugging clients.
async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str) -> Vec<Frame> {
    match serde_json::from_str::<Frame>(text) {
        Ok(req) => process_frame(state, session, req).await,
        Err(e) => {
            warn!(connection_id = %session.connection_id, error = %e, "ws: invalid inbound json");
            let err = ServerEvent::GatewayError { code: "E_INVALID_FRAME".into(), message: format!("invalid json: {e}") };
            vec![err.to_frame()]
        }
    }
}

async fn process_frame(state: &AppState, session: &mut Session, req: Frame) -> Vec<Frame> {
    let connection_id = session.connection_id;
    let event = match ClientEvent::from_frame(&req) {
        Ok(event) => event,
        Err(e) => {
            warn!(%connection_id, syscall = %req.syscall, error = %e, "ws: rejected frame");
            return vec![gateway_error(Some(&req), &e)];
        }
    };

    if !matches!(event, ClientEvent::CursorUpdate(_)) {
        info!(%connection_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");
    }

    let result = match (&session.phase, event) {
        (_, ClientEvent::Join(identity)) => handle_join(state, session, &req, identity).await,
        (Phase::Connecting | Phase::Disconnected, _) => Ok(Outcome::Ignored),
        (Phase::Joined { .. }, ClientEvent::CursorUpdate(cursor)) => {
            state.hub.update_cursor(connection_id, cursor).await;
            Ok(Outcome::Routed)
        }
        (Phase::Joined { .. }, _) => {
            state.hub.relay(connection_id, req.clone()).await;
            Ok(Outcome::Routed)
        }
    };

    match result {
        Ok(Outcome::Joined { room, identity_id }) => {
            info!(%connection_id, %room, %identity_id, "ws: joined room");
            session.phase = Phase::Joined { room, identity_id };
            vec![]
        }
        Ok(Outcome::Routed) => vec![],
        Ok(Outcome::Ignored) => {
            debug!(%connection_id, syscall = %req.syscall, "ws: ignored frame before join");
            vec![]
        }
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn handle_join(
    state: &AppState,
    session: &Session,
    req: &Frame,
    identity: Identity,
) -> Result<Outcome, Frame> {
    let room = req
        .room
        .as_deref()
        .or_else(|| req.field("room").and_then(serde_json::Value::as_str))
        .map(str::trim)
        .filter(|room| !room.is_empty())
        .map(str::to_owned);
    let Some(room) = room else {
        let err = EventError::MissingField { syscall: req.syscall.clone(), field: "room" };
        return Err(gateway_error(Some(req), &err));
    };

    let identity_id = identity.id.clone();
    state
        .hub
        .join(&room, session.connection_id, identity, session.outbox.clone(), Some(req.id.clone()))
        .await
        .map_err(|e| gateway_error(Some(req), &e))?;

    Ok(Outcome::Joined { room, identity_id })
}

// =============================================================================
// ONLINE COUNT
// =============================================================================

async fn register_client(state: &AppState, connection_id: Uuid, outbox: Outbox) {
    state.ws_clients.write().await.insert(connection_id, outbox);
    broadcast_online_count(state).await;
}

async fn unregister_client(state: &AppState, connection_id: Uuid) {
    state.ws_clients.write().await.remove(&connection_id);
    broadcast_online_count(state).await;
}

/// Tell every open socket how many sockets are open.
async fn broadcast_online_count(state: &AppState) {
    let clients = state.ws_clients.read().await;
    let frame = ServerEvent::OnlineCount { count: clients.len() as u64 }.to_frame();
    for tx in clients.values() {
        let _ = tx.try_send(frame.clone());
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn gateway_error(req: Option<&Frame>, err: &(impl ErrorCode + ?Sized)) -> Frame {
    let frame = ServerEvent::GatewayError { code: err.error_code().to_owned(), message: err.to_string() }.to_frame();
    match req {
        Some(req) => {
            let frame = frame.with_parent(req.id.clone());
            match &req.room {
                Some(room) => frame.with_room(room.clone()),
                None => frame,
            }
        }
        None => frame,
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), axum::Error> {
    if frame.syscall == frames::event::GATEWAY_ERROR {
        let code = frame.field("code").and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.field("message").and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, code, message, "ws: send gateway error");
    } else if frame.syscall != frames::event::CURSOR_UPDATED {
        debug!(id = %frame.id, syscall = %frame.syscall, "ws: send frame");
    }
    socket.send(Message::Binary(encode_frame(frame).into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
