//! Database layer: block log, fork candidates, and the write-path
//! orchestrator.

use std::sync::Arc;

pub mod block_log;
pub mod database;
pub mod fork_db;

pub use block_log::{BlockLog, MemoryBlockLog, SledBlockLog};
pub use database::{Database, SkipFlags};
pub use fork_db::{ForkDatabase, ForkItem};

/// How collaborators share the database: one writer at a time, any number
/// of readers between writes. Block and transaction application must go
/// through the write lock; API-style readers take the read lock and are
/// excluded for the duration of a write.
pub type SharedDatabase = Arc<parking_lot::RwLock<Database>>;
