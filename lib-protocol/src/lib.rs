//! Weave wire protocol.
//!
//! Everything a transaction or block is made of: operation payloads,
//! authority bundles, signing digests, and the structural validation that
//! rejects malformed data before it can touch state. Stateful checks
//! (balances, existence, windows) belong to the chain crate; this crate only
//! answers "is this bytes-level and fields-level well-formed?".

pub mod authority;
pub mod block;
pub mod config;
pub mod errors;
pub mod operations;
pub mod sign;
pub mod transaction;
pub mod version;

pub use authority::{Authority, AuthorityLevel, PublicKey};
pub use block::{BlockHeader, SignedBlock};
pub use errors::ValidationError;
pub use operations::{
    BeneficiaryRoute, ChainProperties, ContentExtension, Operation, RequiredAuthorities,
};
pub use sign::{canonical_bytes, HashSigner, SignatureBytes, SignatureVerifier};
pub use transaction::{SignedTransaction, Transaction};
pub use version::ProtocolVersion;
