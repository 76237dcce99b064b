//! Per-block economic maintenance passes.
//!
//! Every pass runs inside the block's undo session, in the fixed order the
//! block applier dictates. Passes communicate with read-side plugins only
//! through virtual operations.

pub mod bandwidth;
pub mod cashout;
pub mod committee;
pub mod inflation;
pub mod subscriptions;
pub mod withdrawals;
