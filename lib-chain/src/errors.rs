//! Chain error taxonomy.
//!
//! Four classes, matching how far damage can spread:
//! - [`EvaluationError`]: a state precondition failed; aborts one transaction
//! - [`BlockError`]: the block cannot apply; state is rolled back to the
//!   pre-block revision
//! - [`ForkError`]: a candidate branch failed mid-replay; the previous head
//!   has been restored
//! - [`ChainError`]: umbrella, including fatal protocol-state corruption
//!   that requires a reindex

use lib_chainstore::StoreError;
use lib_protocol::ValidationError;
use lib_types::{AccountName, Asset, AssetError, BlockId, TimePoint, TransactionId};
use thiserror::Error;

/// A state precondition failed while evaluating an operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    // =========================================================================
    // Account Errors
    // =========================================================================
    #[error("Unknown account: {0}")]
    UnknownAccount(AccountName),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(AccountName),

    #[error("Insufficient balance for {account}: need {required}, have {available}")]
    InsufficientBalance {
        account: AccountName,
        required: Asset,
        available: Asset,
    },

    #[error("Insufficient vesting shares for {account}: need {required}, have {available}")]
    InsufficientVesting {
        account: AccountName,
        required: Asset,
        available: Asset,
    },

    #[error("Account creation fee {fee} below required {required}")]
    CreationFeeTooLow { fee: Asset, required: Asset },

    #[error("Creation delegation {delegation} below required {required}")]
    CreationDelegationTooLow { delegation: Asset, required: Asset },

    #[error("Master authority for {account} was updated too recently")]
    MasterUpdateRateLimited { account: AccountName },

    // =========================================================================
    // Content / Vote Errors
    // =========================================================================
    #[error("Unknown content: @{author}/{permlink}")]
    UnknownContent {
        author: AccountName,
        permlink: String,
    },

    #[error("Parent content not found")]
    UnknownParent,

    #[error("Comment nesting too deep: {depth}")]
    CommentTooDeep { depth: u16 },

    #[error("Content parent link is immutable")]
    ParentMismatch,

    #[error("Content already has votes or replies")]
    ContentNotDeletable,

    #[error("Beneficiaries already set, or votes already cast")]
    BeneficiariesLocked,

    #[error("Content is past payout")]
    ContentPaidOut,

    #[error("Vote is locked after payout")]
    VoteLocked,

    #[error("Vote weight unchanged")]
    VoteUnchanged,

    #[error("Vote changed too many times")]
    TooManyVoteChanges,

    #[error("Not enough energy to vote")]
    OutOfEnergy,

    // =========================================================================
    // Governance Errors
    // =========================================================================
    #[error("Unknown witness: {0}")]
    UnknownWitness(AccountName),

    #[error("Witness vote already in the requested state")]
    WitnessVoteUnchanged,

    #[error("Too many witness votes: {count}, cap {cap}")]
    TooManyWitnessVotes { count: u16, cap: u16 },

    #[error("Cannot vote for witnesses while a proxy is set")]
    ProxiedAccountCannotVote,

    #[error("Proxy chain too long or circular")]
    ProxyLoop,

    #[error("Proxy unchanged")]
    ProxyUnchanged,

    // =========================================================================
    // Delegation Errors
    // =========================================================================
    #[error("Delegation below the chain minimum")]
    DelegationTooSmall,

    #[error("Too many withdraw routes: {count}, max {max}")]
    TooManyWithdrawRoutes { count: u16, max: u16 },

    #[error("Withdraw route percents exceed 100%: {total}")]
    RoutePercentOverflow { total: u32 },

    #[error("Delegation to {delegatee} not found")]
    UnknownDelegation { delegatee: AccountName },

    #[error("Delegation unchanged")]
    DelegationUnchanged,

    // =========================================================================
    // Escrow Errors
    // =========================================================================
    #[error("Unknown escrow {escrow_id} for {from}")]
    UnknownEscrow { from: AccountName, escrow_id: u32 },

    #[error("Escrow {escrow_id} already approved by {who}")]
    EscrowAlreadyApproved { escrow_id: u32, who: AccountName },

    #[error("Escrow ratification deadline has passed")]
    EscrowDeadlinePassed,

    #[error("Escrow is not fully ratified")]
    EscrowNotRatified,

    #[error("Escrow release not permitted for {who}")]
    EscrowReleaseForbidden { who: AccountName },

    #[error("Escrow deadline must be in the future")]
    EscrowDeadlineInPast,

    #[error("Escrow dispute window is closed")]
    EscrowNotDisputable,

    // =========================================================================
    // Committee Errors
    // =========================================================================
    #[error("Unknown committee request: {0}")]
    UnknownCommitteeRequest(u32),

    #[error("Committee request {0} is not pending")]
    CommitteeRequestNotPending(u32),

    #[error("Committee voting on request {0} is closed")]
    CommitteeVotingClosed(u32),

    #[error("Only the request creator may cancel")]
    CommitteeNotCreator,

    // =========================================================================
    // Subscription / Invite Errors
    // =========================================================================
    #[error("No subscription menu published by {0}")]
    UnknownSubscription(AccountName),

    #[error("Subscription terms do not match the current menu")]
    SubscriptionTermsMismatch,

    #[error("Unknown or consumed invite")]
    UnknownInvite,

    #[error("Invite secret signature check failed")]
    BadInviteSecret,

    // =========================================================================
    // Recovery Errors
    // =========================================================================
    #[error("Only the recovery partner {expected} may file recovery")]
    NotRecoveryPartner { expected: AccountName },

    #[error("Account {0} has no recovery partner configured")]
    RecoveryDisabled(AccountName),

    #[error("No active recovery request for {0}")]
    NoRecoveryRequest(AccountName),

    #[error("Recovery request authority mismatch")]
    RecoveryAuthorityMismatch,

    #[error("Recent master authority not recognized")]
    UnknownRecentAuthority,

    // =========================================================================
    // Faucet Errors
    // =========================================================================
    #[error("Anonymous deposit memo does not encode a key")]
    BadAnonymousMemo,

    // =========================================================================
    // Wrapped Infrastructure Errors
    // =========================================================================
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The block cannot be applied; the pre-block state has been restored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Block links to {actual}, head is {expected}")]
    InvalidPrevious { expected: BlockId, actual: BlockId },

    #[error("Block timestamp {timestamp} not after head time {head_time}")]
    NonMonotonicTimestamp {
        timestamp: TimePoint,
        head_time: TimePoint,
    },

    #[error("Block timestamp {timestamp} is not on a slot boundary")]
    OffSlotTimestamp { timestamp: TimePoint },

    #[error("Block produced by {actual}, slot belongs to {expected}")]
    WrongProducer {
        expected: AccountName,
        actual: AccountName,
    },

    #[error("Producer signature check failed for {witness}")]
    BadProducerSignature { witness: AccountName },

    #[error("Merkle root mismatch")]
    MerkleMismatch,

    #[error("Block too large: {size} bytes, max {max}")]
    BlockTooLarge { size: usize, max: usize },

    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(TransactionId),

    #[error("Transaction references an unknown recent block (TaPoS)")]
    TaposMismatch,

    #[error("Transaction expired at {expiration}, head time {now}")]
    TransactionExpired {
        expiration: TimePoint,
        now: TimePoint,
    },

    #[error("Transaction expiration too far in the future")]
    ExpirationTooFar,

    #[error("Missing required {level:?} signature for {account}")]
    MissingSignature {
        account: AccountName,
        level: lib_protocol::AuthorityLevel,
    },

    #[error("Missing required loose-authority signature")]
    MissingOtherSignature,

    #[error("Unknown signing account: {0}")]
    UnknownSigningAccount(AccountName),

    #[error("Bandwidth exhausted for {account}")]
    BandwidthExceeded { account: AccountName },

    #[error("Operation {index} failed: {source}")]
    Evaluation {
        index: usize,
        source: EvaluationError,
    },

    #[error("Maintenance pass failed: {0}")]
    Maintenance(#[from] EvaluationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A candidate branch failed to replay. The previous head was restored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForkError {
    #[error("Block {0} does not link to any known block")]
    Unlinkable(BlockId),

    #[error("Branch starting at {first_bad} failed to apply: {source}")]
    BranchApplyFailed {
        first_bad: BlockId,
        source: Box<BlockError>,
    },

    #[error("Block {0} is already known")]
    DuplicateBlock(BlockId),

    #[error("Block {id} is at or below the irreversible height {irreversible}")]
    BelowIrreversible { id: BlockId, irreversible: u32 },
}

/// Umbrella error for database entry points.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Fork(#[from] ForkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Fatal. Revision/height mismatch at startup or an unknown future
    /// hardfork: requires operator intervention (reindex).
    #[error("Protocol state corruption: {0}")]
    Corruption(String),

    #[error("Block log failure: {0}")]
    BlockLog(String),
}
