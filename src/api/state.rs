//! Application state shared by the handlers

use std::sync::Arc;

use crate::config::StreamConfig;
use crate::domain::AdapterSource;

/// Read-only per-process state; every request builds its own adapters
#[derive(Debug, Clone)]
pub struct AppState {
    pub adapters: Arc<dyn AdapterSource>,
    pub stream: StreamConfig,
}

impl AppState {
    pub fn new(adapters: Arc<dyn AdapterSource>, stream: StreamConfig) -> Self {
        Self { adapters, stream }
    }
}
