//! Async driver: one task owns the synchronizer.
//!
//! DESIGN
//! ======
//! Every input source is serialized through one bounded queue:
//! - local gestures sent through [`SyncHandle`]
//! - frames read off the websocket (forwarded from the relay reader)
//! - results of the initial board and collaborator load
//!
//! The owning task applies one [`Input`] at a time, publishes the new view
//! on a `watch` channel, and hands effects to two ordered workers: one for
//! relay sends, one for store calls. Handing off is `try_send`; a full
//! worker queue drops that effect with a warning instead of stalling the
//! view. Worker failures are logged and never retried.

use std::sync::Arc;

use frames::Frame;
use frames::model::{Board, CollaborationMode, Point, User};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::net::{BoardStore, Relay, load_or_create};
use crate::state::{Brush, ClientView};
use crate::sync::{Effect, StoreOp, Synchronizer};

#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub input_capacity: usize,
    pub relay_capacity: usize,
    pub store_capacity: usize,
    /// Title used if the board has to be created on load.
    pub board_title: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { input_capacity: 256, relay_capacity: 256, store_capacity: 64, board_title: None }
    }
}

#[derive(Clone, Debug)]
pub enum Input {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    Clear,
    SetLayerLock(bool),
    SetMode(CollaborationMode),
    SetBrush(Brush),
    Server(Frame),
    Hydrate(Board),
    Collaborators(Vec<User>),
}

/// Handle to a running driver.
pub struct SyncHandle {
    input: mpsc::Sender<Input>,
    view: watch::Receiver<ClientView>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Queue one input.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Closed`] once the driver has stopped.
    pub async fn send(&self, input: Input) -> Result<(), SyncError> {
        self.input.send(input).await.map_err(|_| SyncError::Closed)
    }

    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<Input> {
        self.input.clone()
    }

    #[must_use]
    pub fn view(&self) -> watch::Receiver<ClientView> {
        self.view.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> ClientView {
        self.view.borrow().clone()
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

// =============================================================================
// SPAWN
// =============================================================================

/// Start the driver. `inbound` carries frames read off the websocket.
pub fn spawn(
    sync: Synchronizer,
    relay: Arc<dyn Relay>,
    store: Arc<dyn BoardStore>,
    inbound: mpsc::Receiver<Frame>,
    config: DriverConfig,
) -> SyncHandle {
    let room = sync.room().to_owned();
    let (input_tx, input_rx) = mpsc::channel(config.input_capacity.max(1));
    let (view_tx, view_rx) = watch::channel(sync.view().clone());

    let workers = Workers {
        relay: spawn_relay_worker(relay, room.clone(), config.relay_capacity),
        store: spawn_store_worker(Arc::clone(&store), room.clone(), config.store_capacity),
    };
    spawn_inbound(inbound, input_tx.clone());
    tokio::spawn(load(store, room, config.board_title, input_tx.clone()));

    let task = tokio::spawn(run(sync, input_rx, view_tx, workers));
    SyncHandle { input: input_tx, view: view_rx, task }
}

async fn run(
    mut sync: Synchronizer,
    mut input_rx: mpsc::Receiver<Input>,
    view_tx: watch::Sender<ClientView>,
    workers: Workers,
) {
    while let Some(input) = input_rx.recv().await {
        for effect in step(&mut sync, input) {
            workers.dispatch(effect);
        }
        view_tx.send_replace(sync.view().clone());
    }
    debug!(room = %sync.room(), "driver: input closed");
}

/// Apply one input to the synchronizer.
pub(crate) fn step(sync: &mut Synchronizer, input: Input) -> Vec<Effect> {
    match input {
        Input::PointerDown(point) => sync.pointer_down(point),
        Input::PointerMove(point) => sync.pointer_move(point),
        Input::PointerUp => sync.pointer_up(),
        Input::Clear => sync.clear(),
        Input::SetLayerLock(locked) => sync.set_layer_lock(locked),
        Input::SetMode(mode) => sync.set_mode(mode),
        Input::SetBrush(brush) => {
            sync.set_brush(brush);
            Vec::new()
        }
        Input::Server(frame) => sync.receive(&frame),
        Input::Hydrate(board) => sync.hydrate(board),
        Input::Collaborators(users) => sync.collaborators_loaded(users),
    }
}

// =============================================================================
// WORKERS
// =============================================================================

struct Workers {
    relay: mpsc::Sender<frames::ClientEvent>,
    store: mpsc::Sender<StoreOp>,
}

impl Workers {
    fn dispatch(&self, effect: Effect) {
        match effect {
            Effect::Relay(event) => {
                let syscall = event.syscall();
                offer(&self.relay, event, "relay", syscall);
            }
            Effect::Persist(op) => offer(&self.store, op, "store", "persist"),
        }
    }
}

fn offer<T>(tx: &mpsc::Sender<T>, item: T, queue: &'static str, what: &str) {
    match tx.try_send(item) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!(queue, what, "driver: worker queue full; dropping"),
        Err(TrySendError::Closed(_)) => debug!(queue, what, "driver: worker gone; dropping"),
    }
}

fn spawn_relay_worker(relay: Arc<dyn Relay>, room: String, capacity: usize) -> mpsc::Sender<frames::ClientEvent> {
    let (tx, mut rx) = mpsc::channel::<frames::ClientEvent>(capacity.max(1));
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = event.to_frame(&room);
            if let Err(e) = relay.send(frame).await {
                warn!(%room, syscall = event.syscall(), error = %e, "relay: send failed");
            }
        }
    });
    tx
}

fn spawn_store_worker(store: Arc<dyn BoardStore>, room: String, capacity: usize) -> mpsc::Sender<StoreOp> {
    let (tx, mut rx) = mpsc::channel::<StoreOp>(capacity.max(1));
    tokio::spawn(async move {
        while let Some(op) = rx.recv().await {
            let result = match &op {
                StoreOp::AppendStroke(stroke) => store.append_stroke(&room, stroke).await,
                StoreOp::Clear => store.clear_strokes(&room).await,
                StoreOp::UpdateSettings(patch) => store.update_settings(&room, *patch).await,
                StoreOp::AddCollaborator(user_id) => store.add_collaborator(&room, *user_id).await.map(|_| ()),
            };
            if let Err(e) = result {
                warn!(%room, ?op, error = %e, "store: persist failed");
            }
        }
    });
    tx
}

fn spawn_inbound(mut inbound: mpsc::Receiver<Frame>, input: mpsc::Sender<Input>) {
    tokio::spawn(async move {
        while let Some(frame) = inbound.recv().await {
            if input.send(Input::Server(frame)).await.is_err() {
                break;
            }
        }
    });
}

// =============================================================================
// LOAD
// =============================================================================

async fn load(store: Arc<dyn BoardStore>, room: String, title: Option<String>, input: mpsc::Sender<Input>) {
    match load_or_create(store.as_ref(), &room, title.as_deref()).await {
        Ok(board) => {
            info!(%room, strokes = board.strokes.len(), "driver: board loaded");
            let _ = input.send(Input::Hydrate(board)).await;
        }
        Err(e) => warn!(%room, error = %e, "driver: board load failed"),
    }

    match store.list_collaborators(&room).await {
        Ok(users) => {
            let _ = input.send(Input::Collaborators(users)).await;
        }
        Err(e) => warn!(%room, error = %e, "driver: collaborator load failed"),
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
