//! services/api/src/adapters/mod.rs
//!
//! Concrete implementations of the core ports: the two storage backends and
//! the canned AI collaborator.

pub mod ai;
pub mod db;
pub mod memory;

use std::sync::Arc;

use skilltrack_core::ports::StorageService;
use tracing::info;

pub use ai::MockAiAdapter;
pub use db::SqliteStorage;
pub use memory::MemStorage;

use crate::config::Config;
use crate::error::ApiError;

/// Picks the storage backend from configuration: a `DATABASE_URL` selects the
/// relational backend (running migrations on the way up), its absence selects
/// the seeded in-memory store.
pub async fn create_storage(config: &Config) -> Result<Arc<dyn StorageService>, ApiError> {
    match &config.database_url {
        Some(url) => {
            let storage = SqliteStorage::connect(url).await?;
            storage.run_migrations().await?;
            info!("storage backend: sqlite");
            Ok(Arc::new(storage))
        }
        None => {
            info!("storage backend: in-memory (seeded)");
            Ok(Arc::new(MemStorage::new()))
        }
    }
}
