//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool for the REST store, the room hub for the
//! realtime path, and the set of open websockets used for the server-wide
//! online count. Room membership itself lives inside the room actors.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::rooms::{Outbox, RoomHub};

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub hub: RoomHub,
    pub config: Arc<Config>,
    /// Every open websocket, joined or not: `connection_id` -> outbox.
    pub ws_clients: Arc<RwLock<HashMap<Uuid, Outbox>>>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            hub: RoomHub::new(config.room_mailbox_capacity),
            config: Arc::new(config),
            ws_clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    /// Create a test `AppState` with a dummy `PgPool` (`connect_lazy`, no live DB).
    #[must_use]
    pub fn test_app_state() -> AppState {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("connect_lazy should not fail");
        AppState::new(pool, config)
    }

    /// Serve the full router on an ephemeral local port.
    pub async fn spawn_app(state: AppState) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = crate::routes::app(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }
}
