//! Protocol-level limits and percentages.
//!
//! These values are protocol. Changing any of them is a hardfork.

/// 100% in basis points
pub const PERCENT_100: u16 = 10_000;
/// 1% in basis points
pub const PERCENT_1: u16 = 100;

// ============================================================================
// FIELD SIZE LIMITS
// ============================================================================

/// Maximum transfer memo length in bytes
pub const MAX_MEMO_SIZE: usize = 2_048;
/// Maximum content permlink length in bytes
pub const MAX_PERMLINK_LENGTH: usize = 256;
/// Maximum content title length in bytes
pub const MAX_TITLE_LENGTH: usize = 256;
/// Maximum content body length in bytes
pub const MAX_BODY_LENGTH: usize = 1 << 20;
/// Maximum witness / committee URL length in bytes
pub const MAX_URL_LENGTH: usize = 512;
/// Maximum attached JSON metadata length in bytes
pub const MAX_JSON_METADATA_LENGTH: usize = 16_384;
/// Maximum custom-operation id length in bytes
pub const MAX_CUSTOM_ID_LENGTH: usize = 32;
/// Maximum custom-operation payload length in bytes
pub const MAX_CUSTOM_JSON_LENGTH: usize = 8_192;

// ============================================================================
// KEY / SIGNATURE LIMITS
// ============================================================================

/// Maximum serialized public key length in bytes
pub const MAX_KEY_SIZE: usize = 64;
/// Maximum serialized signature length in bytes
pub const MAX_SIGNATURE_SIZE: usize = 96;
/// Maximum weighted entries in a single authority
pub const MAX_AUTHORITY_MEMBERSHIP: usize = 40;

// ============================================================================
// CONTENT / VOTING LIMITS
// ============================================================================

/// Maximum nesting depth of a comment
pub const MAX_COMMENT_DEPTH: u16 = 255;
/// Maximum beneficiary routes on one piece of content
pub const MAX_BENEFICIARIES: usize = 8;
/// Maximum times a vote may change its percent before payout
pub const MAX_VOTE_CHANGES: u8 = 5;

// ============================================================================
// GOVERNANCE LIMITS
// ============================================================================

/// Maximum depth of witness-vote proxy chains
pub const MAX_PROXY_RECURSION_DEPTH: usize = 4;
/// Maximum levels a paid-subscription menu may offer
pub const MAX_SUBSCRIPTION_LEVELS: u16 = 100;
/// Maximum period of a paid subscription, in days
pub const MAX_SUBSCRIPTION_PERIOD_DAYS: u16 = 365;
