//! # Meetbell Store
//! `MeetingStore` backends.
//!
//! - **SQLite**: durable, guarded `UPDATE ... WHERE` statements give
//!   field-scoped compare-and-set semantics.
//! - **Memory**: `RwLock<HashMap>`, for tests and throwaway runs.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use meetbell_core::config::StoreConfig;
use meetbell_core::error::{MeetbellError, Result};
use meetbell_core::traits::MeetingStore;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Open the backend named in config.
pub fn open_from_config(config: &StoreConfig) -> Result<Arc<dyn MeetingStore>> {
    match config.backend.as_str() {
        "sqlite" => {
            let path = config.resolved_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Arc::new(SqliteStore::open(&path)?))
        }
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(MeetbellError::Config(format!("Unknown store backend: {other}"))),
    }
}
