//! Weave chain core.
//!
//! The deterministic state-transition engine of a Weave node: given the
//! same ordered blocks, every build of this crate reaches bit-identical
//! state. Networking, APIs, and wallets live elsewhere and talk to this
//! crate through [`db::Database`], the block log trait, and the observer
//! seam; nothing here performs I/O besides the block log collaborator.

pub mod config;
pub mod db;
pub mod economy;
pub mod errors;
pub mod evaluators;
pub mod genesis;
pub mod hardfork;
pub mod notify;
pub mod objects;
pub mod state;
pub mod witness_schedule;

pub use config::{ChainConfig, HardforkSchedule};
pub use db::{BlockLog, Database, MemoryBlockLog, SharedDatabase, SkipFlags, SledBlockLog};
pub use errors::{BlockError, ChainError, EvaluationError, ForkError};
pub use notify::{ChainObserver, OperationLocation, VirtualOperation};
pub use state::ChainState;
