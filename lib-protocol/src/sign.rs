//! Signing seam.
//!
//! Consensus never interprets key or signature bytes; it only asks a
//! [`SignatureVerifier`] whether a (key, digest, signature) triple checks
//! out. Production nodes plug in a real cryptographic verifier; [`HashSigner`]
//! is the deterministic stand-in used by tests and local tooling. It is NOT
//! cryptographic — anyone who knows a public key can produce a passing
//! signature — but it exercises every consensus path identically.

use std::fmt;

use serde::{Deserialize, Serialize};

use lib_types::{hash_digest, Digest};

use crate::authority::PublicKey;
use crate::config::MAX_SIGNATURE_SIZE;
use crate::errors::ValidationError;

/// Opaque serialized signature.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default)]
pub struct SignatureBytes(pub Vec<u8>);

impl SignatureBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.is_empty() || self.0.len() > MAX_SIGNATURE_SIZE {
            return Err(ValidationError::BadSignatureSize { len: self.0.len() });
        }
        Ok(())
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.len().min(8);
        write!(f, "SignatureBytes({}..)", hex::encode(&self.0[..shown]))
    }
}

/// Black-box signature verification collaborator.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, pubkey: &PublicKey, digest: &Digest, signature: &SignatureBytes) -> bool;
}

/// Deterministic hash-based signing scheme for tests and tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashSigner;

impl HashSigner {
    /// Derive the public key for a named seed.
    pub fn public_key(seed: &str) -> PublicKey {
        let mut input = b"weave/test-key/".to_vec();
        input.extend_from_slice(seed.as_bytes());
        PublicKey::new(hash_digest(&input).as_bytes().to_vec())
    }

    /// Produce the signature the paired verifier will accept.
    pub fn sign(pubkey: &PublicKey, digest: &Digest) -> SignatureBytes {
        let mut input = b"weave/test-sig/".to_vec();
        input.extend_from_slice(pubkey.as_bytes());
        input.extend_from_slice(digest.as_bytes());
        SignatureBytes::new(hash_digest(&input).as_bytes().to_vec())
    }
}

impl SignatureVerifier for HashSigner {
    fn verify(&self, pubkey: &PublicKey, digest: &Digest, signature: &SignatureBytes) -> bool {
        HashSigner::sign(pubkey, digest) == *signature
    }
}

/// Canonical consensus serialization of a protocol value.
///
/// Serialization of in-memory protocol types cannot fail; the expect here
/// documents that assumption rather than hiding an error path.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    bincode::serialize(value).expect("canonical serialization of protocol types cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_signer_roundtrip() {
        let key = HashSigner::public_key("alice");
        let digest = hash_digest(b"payload");
        let sig = HashSigner::sign(&key, &digest);

        assert!(HashSigner.verify(&key, &digest, &sig));
        let other = hash_digest(b"other");
        assert!(!HashSigner.verify(&key, &other, &sig));

        let wrong_key = HashSigner::public_key("bob");
        assert!(!HashSigner.verify(&wrong_key, &digest, &sig));
    }
}
