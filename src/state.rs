use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;

/// The single connection behind a mutex also serializes the overlap check
/// and the booking insert, so two concurrent requests cannot both pass the
/// availability check for the same room.
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
}
