//! Weave primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: account names are the only variable-length identifiers allowed in
//! consensus state, and they are validated once, at the protocol boundary.

pub mod account_name;
pub mod asset;
pub mod primitives;
pub mod time;

pub use account_name::{AccountName, AccountNameError};
pub use asset::{Asset, AssetError, Symbol, SHARES_PRECISION, WEAVE_PRECISION};
pub use primitives::{
    hash_digest, BlockId, Digest, ObjectId, TransactionId, BlockHeight, Bps, ShareAmount,
};
pub use time::TimePoint;
