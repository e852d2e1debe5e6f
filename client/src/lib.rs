//! Headless drawing-room client.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`sync::Synchronizer`] per process keeps a single [`state::ClientView`]
//! consistent across three input streams: local pointer gestures, frames
//! relayed by the server, and the initial load from the persisted store.
//! Local edits apply optimistically and then go out twice, once over the
//! websocket relay for live peers and once to the REST store for durability.
//!
//! The [`driver`] owns the synchronizer on one task and serializes every
//! input through a single queue; [`net`] holds the websocket and HTTP
//! adapters behind the [`net::Relay`] and [`net::BoardStore`] traits.

pub mod driver;
pub mod error;
pub mod net;
pub mod state;
pub mod sync;

pub use driver::{DriverConfig, Input, SyncHandle};
pub use error::SyncError;
pub use state::{Brush, ClientView, UserView};
pub use sync::{Effect, StoreOp, Synchronizer};
