//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use skilltrack_core::ports::{AiService, StorageService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Handlers only ever see the ports, never a concrete backend.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageService>,
    pub ai: Arc<dyn AiService>,
    pub config: Arc<Config>,
}
