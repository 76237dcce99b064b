//! Versioned object store for Weave consensus state.
//!
//! Typed tables with one unique index and one optional ordered index,
//! layered copy-on-write undo deltas, and revision pinning. This is the only
//! mutation substrate for the chain: every state change flows through a
//! [`Table`] so that any nesting of sessions can be rolled back exactly.
//!
//! Rule: object ids are monotonic and never reused, even across undo.

pub mod error;
pub mod session;
pub mod table;

pub use error::StoreError;
pub use session::UndoState;
pub use table::{StateObject, Table, UndoableTable};
