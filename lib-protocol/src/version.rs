//! Protocol versioning.
//!
//! Witnesses publish the version they run; the scheduler tallies a majority
//! version and the hardfork controller compares trigger versions against it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Packed protocol version: `major.hardfork.patch`.
#[derive(
    Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl ProtocolVersion {
    pub const fn new(major: u8, hardfork: u8, patch: u16) -> Self {
        Self(((major as u32) << 24) | ((hardfork as u32) << 16) | patch as u32)
    }

    pub const fn major(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn hardfork(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn patch(&self) -> u16 {
        self.0 as u16
    }

    /// Version with the patch component cleared; two nodes on the same
    /// hardfork compare equal under this.
    pub const fn hardfork_version(&self) -> Self {
        Self(self.0 & 0xffff_0000)
    }
}

impl fmt::Debug for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major(), self.hardfork(), self.patch())
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.hardfork(), self.patch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_orders_correctly() {
        let a = ProtocolVersion::new(0, 1, 5);
        let b = ProtocolVersion::new(0, 2, 0);
        assert!(a < b);
        assert_eq!(a.hardfork(), 1);
        assert_eq!(b.hardfork_version(), ProtocolVersion::new(0, 2, 0));
        assert_eq!(ProtocolVersion::new(0, 2, 9).hardfork_version(), b);
    }
}
