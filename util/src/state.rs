//! State handed to every route handler and guard through `State<AppState>`.

use crate::ws::WebSocketManager;
use sea_orm::DatabaseConnection;

/// The database pool and the `sessions:{id}` topic registry.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    ws: WebSocketManager,
}

impl AppState {
    pub fn new(db: DatabaseConnection, ws: WebSocketManager) -> Self {
        Self { db, ws }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Owned pool handle for the token sweeper task.
    pub fn db_clone(&self) -> DatabaseConnection {
        self.db.clone()
    }

    /// Owned manager handle for notifiers and upgraded sockets.
    pub fn ws_clone(&self) -> WebSocketManager {
        self.ws.clone()
    }
}
