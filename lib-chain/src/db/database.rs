//! The chain database: the single writer that turns blocks into state.
//!
//! Entry points:
//! - [`Database::push_transaction`]: admit a pending transaction
//! - [`Database::push_block`]: extend the chain or switch forks
//! - [`Database::generate_block`]: assemble and apply a block locally
//!
//! Session discipline: one undo layer per applied block stays on the stack
//! until irreversibility commits it, so `revision == head_block_number`
//! always holds between calls. Each transaction runs in its own nested
//! layer that squashes into the surrounding scope on success.

use std::collections::BTreeSet;

use bitflags::bitflags;
use tracing::{debug, info, warn};

use lib_protocol::{
    canonical_bytes, Authority, AuthorityLevel, PublicKey, SignatureBytes, SignatureVerifier,
    SignedBlock, SignedTransaction,
};
use lib_types::{AccountName, Asset, BlockId, Digest, TimePoint};

use crate::config::{ANONYMOUS_ACCOUNT, COMMITTEE_ACCOUNT, ChainConfig, NULL_ACCOUNT};
use crate::economy::{bandwidth, cashout, committee, inflation, subscriptions, withdrawals};
use crate::errors::{BlockError, ChainError, ForkError};
use crate::evaluators::{apply_operation, OperationContext};
use crate::genesis;
use crate::hardfork;
use crate::notify::{ChainObserver, OperationLocation, VirtualOperation};
use crate::objects::TransactionObject;
use crate::state::ChainState;
use crate::witness_schedule::{
    get_scheduled_witness, get_slot_at_time, get_slot_time, update_witness_schedule,
};

use super::block_log::BlockLog;
use super::fork_db::ForkDatabase;

/// Ceiling for the bandwidth reserve ratio adjustment.
const MAX_RESERVE_RATIO: u64 = 20_000;

bitflags! {
    /// Independently skippable checks, for trusted replay and testing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SkipFlags: u32 {
        const WITNESS_SIGNATURE      = 1 << 0;
        const TRANSACTION_SIGNATURES = 1 << 1;
        const TRANSACTION_DUPLICATES = 1 << 2;
        const TAPOS_CHECK            = 1 << 3;
        const EXPIRATION_CHECK       = 1 << 4;
        const MERKLE_CHECK           = 1 << 5;
        const PRODUCER_SCHEDULE      = 1 << 6;
        const BLOCK_SIZE_CHECK       = 1 << 7;
        const BANDWIDTH_CHECK        = 1 << 8;
        const STRUCTURAL_VALIDATION  = 1 << 9;
    }
}

impl SkipFlags {
    /// Everything skippable: blocks re-applied from our own log or a
    /// restored branch were fully validated once already.
    pub fn trusted_replay() -> Self {
        Self::all()
    }
}

pub struct Database {
    state: ChainState,
    fork_db: ForkDatabase,
    block_log: Box<dyn BlockLog>,
    verifier: Box<dyn SignatureVerifier>,
    config: ChainConfig,
    observers: Vec<Box<dyn ChainObserver>>,
    pending_transactions: Vec<SignedTransaction>,
    pending_session_open: bool,
}

impl Database {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Initialize genesis state over the given collaborators. If the block
    /// log already has history, call [`Self::replay_block_log`] next.
    pub fn open(
        config: ChainConfig,
        block_log: Box<dyn BlockLog>,
        verifier: Box<dyn SignatureVerifier>,
    ) -> Result<Self, ChainError> {
        let state = genesis::initialize(&config)?;
        hardfork::check_hardfork_state(&state, &config)?;
        Ok(Self {
            state,
            fork_db: ForkDatabase::new(BlockId::zero(), 0),
            block_log,
            verifier,
            config,
            observers: Vec::new(),
            pending_transactions: Vec::new(),
            pending_session_open: false,
        })
    }

    /// Re-apply every block in the log. Validation that already happened
    /// when the blocks were first accepted is skipped.
    pub fn replay_block_log(&mut self) -> Result<u32, ChainError> {
        let head = self.block_log.head_num()?;
        info!(blocks = head, "replaying block log");
        for num in 1..=head {
            let block = self.block_log.read_block_by_num(num)?.ok_or_else(|| {
                ChainError::Corruption(format!("block log is missing block {num}"))
            })?;
            self.push_block(block, SkipFlags::trusted_replay())?;
        }
        Ok(head)
    }

    pub fn add_observer(&mut self, observer: Box<dyn ChainObserver>) {
        self.observers.push(observer);
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn block_log(&self) -> &dyn BlockLog {
        self.block_log.as_ref()
    }

    pub fn head_block_num(&self) -> u32 {
        self.state.head_block_num()
    }

    pub fn head_block_id(&self) -> BlockId {
        self.state.global().head_block_id
    }

    pub fn head_block_time(&self) -> TimePoint {
        self.state.head_time()
    }

    pub fn scheduled_witness(&self, slot: u32) -> AccountName {
        get_scheduled_witness(&self.state, slot)
    }

    pub fn slot_time(&self, slot: u32) -> TimePoint {
        get_slot_time(&self.state, &self.config, slot)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Validate and admit a transaction to the pending set. Its effects are
    /// speculative until a block carries it.
    pub fn push_transaction(
        &mut self,
        trx: SignedTransaction,
        skip: SkipFlags,
    ) -> Result<(), ChainError> {
        if !self.pending_session_open {
            self.state.push_session();
            self.pending_session_open = true;
        }
        self.apply_transaction_in_session(&trx, skip)?;
        self.pending_transactions.push(trx);
        Ok(())
    }

    /// Discard speculative pending-transaction state (the list is kept for
    /// re-application).
    fn clear_pending_state(&mut self) -> Result<(), ChainError> {
        if self.pending_session_open {
            self.state.undo_session()?;
            self.pending_session_open = false;
        }
        Ok(())
    }

    /// Re-apply pending transactions on the new head; those that no longer
    /// fit are dropped.
    fn reapply_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending_transactions);
        for trx in pending {
            if let Err(error) = self.push_transaction(trx, SkipFlags::empty()) {
                debug!(%error, "pending transaction dropped on reapply");
            }
        }
    }

    /// One transaction inside its own nested session.
    fn apply_transaction_in_session(
        &mut self,
        trx: &SignedTransaction,
        skip: SkipFlags,
    ) -> Result<(), BlockError> {
        self.state.push_session();
        match self.apply_transaction_inner(trx, skip) {
            Ok(()) => {
                self.state.squash_session()?;
                Ok(())
            }
            Err(error) => {
                self.state
                    .undo_session()
                    .expect("transaction session is live");
                Err(error)
            }
        }
    }

    fn apply_transaction_inner(
        &mut self,
        trx: &SignedTransaction,
        skip: SkipFlags,
    ) -> Result<(), BlockError> {
        let now = self.state.head_time();

        // 1. Structural validation, before any state is consulted.
        if !skip.contains(SkipFlags::STRUCTURAL_VALIDATION) {
            trx.validate()?;
        }
        let trx_id = trx.transaction.id();

        // 2. Duplicate check against the recent-transaction window.
        if !skip.contains(SkipFlags::TRANSACTION_DUPLICATES)
            && self.state.transactions.contains(&trx_id)
        {
            return Err(BlockError::DuplicateTransaction(trx_id));
        }

        // 3. Signatures against the union of required authorities.
        if !skip.contains(SkipFlags::TRANSACTION_SIGNATURES) {
            self.verify_authority(trx)?;
        }

        // 4. TaPoS: the transaction must anchor to a recent block we know.
        if !skip.contains(SkipFlags::TAPOS_CHECK) {
            self.check_tapos(&trx.transaction)?;
        }

        // 5. Expiration window.
        if !skip.contains(SkipFlags::EXPIRATION_CHECK) {
            if trx.transaction.expiration <= now {
                return Err(BlockError::TransactionExpired {
                    expiration: trx.transaction.expiration,
                    now,
                });
            }
            if trx.transaction.expiration
                > now + self.config.max_time_until_expiration_secs
            {
                return Err(BlockError::ExpirationTooFar);
            }
        }

        if !skip.contains(SkipFlags::TRANSACTION_DUPLICATES) {
            let expiration = trx.transaction.expiration;
            self.state.transactions.create(|id| TransactionObject {
                id,
                trx_id,
                expiration,
            })?;
        }

        // 6. Bandwidth accounting for every required account.
        if !skip.contains(SkipFlags::BANDWIDTH_CHECK) {
            let size = canonical_bytes(trx).len();
            for account in trx.transaction.required_authorities().accounts() {
                bandwidth::update_account_bandwidth(&mut self.state, &self.config, &account, size)?;
            }
        }

        // 7. Operations, in order.
        let block_num = self.state.head_block_num() + 1;
        for (op_index, operation) in trx.transaction.operations.iter().enumerate() {
            let location = OperationLocation {
                block_num,
                trx_id,
                op_index,
            };
            for observer in &mut self.observers {
                observer.pre_apply_operation(&location, operation);
            }
            {
                let mut ctx = OperationContext {
                    state: &mut self.state,
                    config: &self.config,
                    verifier: self.verifier.as_ref(),
                };
                apply_operation(&mut ctx, operation).map_err(|source| BlockError::Evaluation {
                    index: op_index,
                    source,
                })?;
            }
            for observer in &mut self.observers {
                observer.post_apply_operation(&location, operation);
            }
        }
        Ok(())
    }

    fn check_tapos(&self, trx: &lib_protocol::Transaction) -> Result<(), BlockError> {
        let slot = trx.ref_block_num as u32;
        match self.state.block_summaries.find(&slot) {
            Some(summary) => {
                if summary.block_id.tapos_prefix() != trx.ref_block_prefix {
                    return Err(BlockError::TaposMismatch);
                }
            }
            None => {
                // Unwritten slots read as the zero id (pre-genesis anchor).
                if trx.ref_block_num != 0 || trx.ref_block_prefix != 0 {
                    return Err(BlockError::TaposMismatch);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Authority verification
    // ------------------------------------------------------------------

    fn collect_keys(authority: &Authority, out: &mut BTreeSet<PublicKey>) {
        for (key, _) in &authority.key_auths {
            out.insert(key.clone());
        }
    }

    /// Weighted satisfaction with one level of account-member recursion
    /// (member accounts contribute through their active authority).
    fn authority_satisfied(
        &self,
        authority: &Authority,
        proven: &BTreeSet<PublicKey>,
        depth: u32,
    ) -> bool {
        let mut weight = authority.signed_key_weight(proven);
        if depth < 2 {
            for (member, member_weight) in &authority.account_auths {
                if let Ok(member_auth) = self.state.get_authority(member) {
                    if self.authority_satisfied(&member_auth.active, proven, depth + 1) {
                        weight += *member_weight as u64;
                    }
                }
            }
        }
        weight >= authority.weight_threshold as u64
    }

    fn verify_authority(&self, trx: &SignedTransaction) -> Result<(), BlockError> {
        let required = trx.transaction.required_authorities();
        if required.is_empty() {
            return Ok(());
        }
        let digest = trx.transaction.sig_digest(&self.config.chain_id);

        // Candidate keys: every key reachable from the required accounts'
        // authority bundles (plus one level of members), and any loose
        // authorities carried by the operations themselves.
        let mut candidates: BTreeSet<PublicKey> = BTreeSet::new();
        for account in required.accounts() {
            let auth = self
                .state
                .get_authority(&account)
                .map_err(|_| BlockError::UnknownSigningAccount(account.clone()))?;
            for tier in [&auth.master, &auth.active, &auth.regular] {
                Self::collect_keys(tier, &mut candidates);
                for (member, _) in &tier.account_auths {
                    if let Ok(member_auth) = self.state.get_authority(member) {
                        Self::collect_keys(&member_auth.active, &mut candidates);
                    }
                }
            }
        }
        for loose in &required.other {
            Self::collect_keys(loose, &mut candidates);
        }

        // A signature proves whichever candidate key verifies it.
        let mut proven: BTreeSet<PublicKey> = BTreeSet::new();
        for signature in &trx.signatures {
            for key in &candidates {
                if self.verifier.verify(key, &digest, signature) {
                    proven.insert(key.clone());
                    break;
                }
            }
        }

        for account in &required.master {
            let auth = self
                .state
                .get_authority(account)
                .map_err(|_| BlockError::UnknownSigningAccount(account.clone()))?;
            if !self.authority_satisfied(&auth.master, &proven, 0) {
                return Err(BlockError::MissingSignature {
                    account: account.clone(),
                    level: AuthorityLevel::Master,
                });
            }
        }
        for account in &required.active {
            let auth = self
                .state
                .get_authority(account)
                .map_err(|_| BlockError::UnknownSigningAccount(account.clone()))?;
            if !(self.authority_satisfied(&auth.active, &proven, 0)
                || self.authority_satisfied(&auth.master, &proven, 0))
            {
                return Err(BlockError::MissingSignature {
                    account: account.clone(),
                    level: AuthorityLevel::Active,
                });
            }
        }
        for account in &required.regular {
            let auth = self
                .state
                .get_authority(account)
                .map_err(|_| BlockError::UnknownSigningAccount(account.clone()))?;
            if !(self.authority_satisfied(&auth.regular, &proven, 0)
                || self.authority_satisfied(&auth.active, &proven, 0)
                || self.authority_satisfied(&auth.master, &proven, 0))
            {
                return Err(BlockError::MissingSignature {
                    account: account.clone(),
                    level: AuthorityLevel::Regular,
                });
            }
        }
        for loose in &required.other {
            if !self.authority_satisfied(loose, &proven, 0) {
                return Err(BlockError::MissingOtherSignature);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// Push a candidate block. Returns `true` when it triggered a fork
    /// switch, `false` when it extended the head (or was merely stored).
    pub fn push_block(&mut self, block: SignedBlock, skip: SkipFlags) -> Result<bool, ChainError> {
        self.clear_pending_state()?;

        let new_id = block.id();
        let head_id_before = self.head_block_id();
        let item = self.fork_db.push_block(block)?;
        let fork_head = self.fork_db.head_id().expect("just pushed a block");

        let result = if fork_head == new_id && item.previous == head_id_before {
            // Plain extension of the current chain.
            match self.apply_block_session(&item.block, skip) {
                Ok(()) => {
                    self.finalize_irreversible()?;
                    Ok(false)
                }
                Err(error) => {
                    self.fork_db.remove(new_id);
                    Err(ChainError::Block(error))
                }
            }
        } else if fork_head == new_id {
            // The new block put a different branch ahead.
            self.switch_forks(head_id_before, new_id, skip).map(|_| true)
        } else {
            // Shorter branch: stored as a candidate, nothing applied.
            debug!(id = %new_id, "candidate block stored off the main branch");
            Ok(false)
        };

        if result.is_ok() {
            self.reapply_pending();
        }
        result
    }

    /// Undo the head block. Its undo layer restores every table including
    /// the global head pointers.
    pub fn pop_block(&mut self) -> Result<(), ChainError> {
        self.clear_pending_state()?;
        let head_num = self.head_block_num();
        let irreversible = self.state.global().last_irreversible_block_num;
        if head_num <= irreversible {
            return Err(ChainError::Fork(ForkError::BelowIrreversible {
                id: self.head_block_id(),
                irreversible,
            }));
        }
        self.state.undo_session()?;
        Ok(())
    }

    fn switch_forks(
        &mut self,
        old_head: BlockId,
        new_head: BlockId,
        skip: SkipFlags,
    ) -> Result<(), ChainError> {
        info!(%old_head, %new_head, "switching forks");
        let (new_branch, old_branch) = self.fork_db.fetch_branch_from(new_head, old_head)?;
        let ancestor_id = new_branch
            .last()
            .map(|item| item.previous)
            .unwrap_or(old_head);

        // Unwind to the common ancestor.
        while self.head_block_id() != ancestor_id {
            self.pop_block()?;
        }

        // Apply the new branch oldest-first.
        for item in new_branch.iter().rev() {
            if let Err(error) = self.apply_block_session(&item.block, skip) {
                warn!(bad = %item.id, %error, "fork branch failed, restoring previous head");
                self.fork_db.remove(item.id);

                // Unwind whatever prefix applied, then restore the old
                // branch. The old branch applied before, so a failure here
                // is state corruption, not a bad block.
                while self.head_block_id() != ancestor_id {
                    self.pop_block()?;
                }
                for old_item in old_branch.iter().rev() {
                    self.apply_block_session(&old_item.block, SkipFlags::trusted_replay())
                        .map_err(|restore| {
                            ChainError::Corruption(format!(
                                "failed to restore previous branch at {}: {restore}",
                                old_item.id
                            ))
                        })?;
                }
                self.fork_db.set_head(old_head);
                return Err(ChainError::Fork(ForkError::BranchApplyFailed {
                    first_bad: item.id,
                    source: Box::new(error),
                }));
            }
        }
        self.finalize_irreversible()?;
        Ok(())
    }

    /// Apply one block in a session that stays on the undo stack (one layer
    /// per block until irreversibility).
    fn apply_block_session(
        &mut self,
        block: &SignedBlock,
        skip: SkipFlags,
    ) -> Result<(), BlockError> {
        self.state.push_session();
        let mut vops = Vec::new();
        match self.apply_block_inner(block, skip, &mut vops) {
            Ok(()) => {
                for vop in &vops {
                    for observer in &mut self.observers {
                        observer.virtual_operation(vop);
                    }
                }
                for observer in &mut self.observers {
                    observer.applied_block(block);
                }
                debug!(
                    num = block.block_num(),
                    transactions = block.transactions.len(),
                    "block applied"
                );
                Ok(())
            }
            Err(error) => {
                self.state.undo_session().expect("block session is live");
                Err(error)
            }
        }
    }

    fn apply_block_inner(
        &mut self,
        block: &SignedBlock,
        skip: SkipFlags,
        vops: &mut Vec<VirtualOperation>,
    ) -> Result<(), BlockError> {
        let block_num = block.block_num();
        let block_id = block.id();
        let block_size = canonical_bytes(block).len();

        // --- header validation ----------------------------------------------
        if !skip.contains(SkipFlags::STRUCTURAL_VALIDATION) {
            block.validate_structure()?;
        }
        let head = self.state.global().clone();
        if block.header.previous != head.head_block_id {
            return Err(BlockError::InvalidPrevious {
                expected: head.head_block_id,
                actual: block.header.previous,
            });
        }
        if head.head_block_number > 0 && block.header.timestamp <= head.time {
            return Err(BlockError::NonMonotonicTimestamp {
                timestamp: block.header.timestamp,
                head_time: head.time,
            });
        }
        let slot = get_slot_at_time(&self.state, &self.config, block.header.timestamp);
        if slot == 0
            || get_slot_time(&self.state, &self.config, slot) != block.header.timestamp
        {
            return Err(BlockError::OffSlotTimestamp {
                timestamp: block.header.timestamp,
            });
        }
        if !skip.contains(SkipFlags::PRODUCER_SCHEDULE) {
            let expected = get_scheduled_witness(&self.state, slot);
            if expected != block.header.witness {
                return Err(BlockError::WrongProducer {
                    expected,
                    actual: block.header.witness.clone(),
                });
            }
        }
        let producer = self
            .state
            .witnesses
            .find(&block.header.witness)
            .cloned()
            .ok_or_else(|| BlockError::UnknownSigningAccount(block.header.witness.clone()))?;
        if !skip.contains(SkipFlags::WITNESS_SIGNATURE) {
            let digest = block.header.sig_digest(&self.config.chain_id);
            let signed = !producer.signing_key.is_empty()
                && self
                    .verifier
                    .verify(&producer.signing_key, &digest, &block.witness_signature);
            if !signed {
                return Err(BlockError::BadProducerSignature {
                    witness: block.header.witness.clone(),
                });
            }
        }
        if !skip.contains(SkipFlags::MERKLE_CHECK)
            && block.compute_merkle_root() != block.header.transaction_merkle_root
        {
            return Err(BlockError::MerkleMismatch);
        }
        if !skip.contains(SkipFlags::BLOCK_SIZE_CHECK) {
            let max = self.state.schedule().median_props.maximum_block_size as usize;
            if block_size > max {
                return Err(BlockError::BlockTooLarge {
                    size: block_size,
                    max,
                });
            }
        }

        // --- transactions ---------------------------------------------------
        for trx in &block.transactions {
            self.apply_transaction_in_session(trx, skip)?;
        }

        // --- fixed-order maintenance ----------------------------------------
        self.update_global_dynamics(block, slot, block_size, vops)?;
        self.update_signing_witness(&block.header.witness, block_num)?;
        self.update_last_irreversible();
        self.state.record_block_summary(block_num, block_id)?;
        self.clear_expired(vops)?;

        if self.state.head_block_num() >= self.state.schedule().next_shuffle_block_num {
            bandwidth::refresh_reserve_candidates(&mut self.state);
            update_witness_schedule(&mut self.state, &self.config)?;
        }

        inflation::process_funds(&mut self.state, &self.config)?;
        cashout::process_cashouts(&mut self.state, &self.config, vops)?;
        withdrawals::process_vesting_withdrawals(&mut self.state, &self.config, vops)?;
        self.sweep_reserved_accounts()?;
        committee::process_committee(&mut self.state, &self.config, vops)?;
        subscriptions::process_subscriptions(&mut self.state, vops)?;
        hardfork::process_hardforks(&mut self.state, &self.config, vops)?;
        Ok(())
    }

    /// Head pointers, missed-slot accounting, participation bitmap, and the
    /// bandwidth reserve-ratio feedback loop.
    fn update_global_dynamics(
        &mut self,
        block: &SignedBlock,
        slot: u32,
        block_size: usize,
        vops: &mut Vec<VirtualOperation>,
    ) -> Result<(), BlockError> {
        let head_num = self.state.head_block_num();
        let missed_cutoff = self.config.blocks_per_day() as u32;

        // Every slot between head and this block went unproduced.
        if head_num > 0 {
            for missed_slot in 1..slot {
                let name = get_scheduled_witness(&self.state, missed_slot);
                if name == block.header.witness {
                    continue;
                }
                let Some(witness) = self.state.witnesses.find(&name).cloned() else {
                    continue;
                };
                let shut_down = witness.is_schedulable()
                    && head_num.saturating_sub(witness.last_confirmed_block_num) > missed_cutoff;
                self.state.witnesses.modify(witness.id, |w| {
                    w.total_missed += 1;
                    if shut_down {
                        w.signing_key = PublicKey::default();
                    }
                })?;
                if shut_down {
                    warn!(witness = %name, "witness shut down after prolonged absence");
                    vops.push(VirtualOperation::ShutdownWitness { witness: name });
                }
            }
        }

        let max_block_size = self.state.schedule().median_props.maximum_block_size;
        let window = self.config.bandwidth_average_window_secs;
        let interval = self.config.block_interval_secs;
        let precision = self.config.bandwidth_precision;

        self.state.update_global(|g| {
            g.head_block_number = block.block_num();
            g.head_block_id = block.id();
            g.time = block.header.timestamp;
            g.current_witness = block.header.witness.clone();
            g.current_aslot += slot as u64;
            g.recent_slots_filled = if slot >= 128 {
                1
            } else {
                (g.recent_slots_filled << slot) | 1
            };
            g.average_block_size =
                ((g.average_block_size as u64 * 99 + block_size as u64) / 100) as u32;

            // Congestion shrinks the reserve ratio immediately; idle
            // capacity regrows it slowly.
            if g.average_block_size as u64 * 2 > max_block_size as u64 {
                g.current_reserve_ratio = (g.current_reserve_ratio / 2).max(1);
            } else if g.head_block_number % 100 == 0 {
                g.current_reserve_ratio =
                    (g.current_reserve_ratio + g.current_reserve_ratio / 100 + 1)
                        .min(MAX_RESERVE_RATIO);
            }
            g.max_virtual_bandwidth = max_block_size as u128
                * g.current_reserve_ratio as u128
                * precision as u128
                * window as u128
                / interval as u128;
        });
        Ok(())
    }

    fn update_signing_witness(
        &mut self,
        witness: &AccountName,
        block_num: u32,
    ) -> Result<(), BlockError> {
        let witness_id = self
            .state
            .witnesses
            .find(witness)
            .map(|w| w.id)
            .ok_or_else(|| BlockError::UnknownSigningAccount(witness.clone()))?;
        self.state
            .witnesses
            .modify(witness_id, |w| w.last_confirmed_block_num = block_num)?;
        Ok(())
    }

    /// Irreversibility: the block number confirmed by the configured
    /// supermajority of the current schedule.
    fn update_last_irreversible(&mut self) {
        let names: BTreeSet<AccountName> = self
            .state
            .schedule()
            .current_shuffled_witnesses
            .iter()
            .cloned()
            .collect();
        let mut confirmations: Vec<u32> = names
            .iter()
            .filter_map(|name| self.state.witnesses.find(name))
            .map(|w| w.last_confirmed_block_num)
            .collect();

        let candidate = if confirmations.is_empty() {
            self.state.head_block_num()
        } else {
            confirmations.sort_unstable();
            let offset = (lib_protocol::config::PERCENT_100
                - self.config.irreversible_threshold_percent)
                as usize
                * confirmations.len()
                / lib_protocol::config::PERCENT_100 as usize;
            confirmations[offset.min(confirmations.len() - 1)]
        };

        self.state.update_global(|g| {
            if candidate > g.last_irreversible_block_num {
                g.last_irreversible_block_num = candidate;
            }
        });
    }

    /// Commit undo layers at or below the irreversible height, append the
    /// newly-irreversible blocks to the log, and prune the fork database.
    fn finalize_irreversible(&mut self) -> Result<(), ChainError> {
        let irreversible = self.state.global().last_irreversible_block_num;
        if irreversible == 0 {
            return Ok(());
        }
        self.state.commit_to(irreversible as u64)?;

        let head_id = self.head_block_id();
        let log_head = self.block_log.head_num()?;
        for num in (log_head + 1)..=irreversible {
            let block = self
                .fork_db
                .main_branch_block(num, head_id)
                .cloned()
                .ok_or_else(|| {
                    ChainError::Corruption(format!(
                        "irreversible block {num} is missing from the fork database"
                    ))
                })?;
            self.block_log.append(&block)?;
        }

        let root_id = if irreversible == self.head_block_num() {
            head_id
        } else {
            self.fork_db
                .main_branch_block(irreversible, head_id)
                .map(|b| b.id())
                .unwrap_or(head_id)
        };
        self.fork_db.prune(root_id, irreversible);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expiry sweeps
    // ------------------------------------------------------------------

    fn clear_expired(&mut self, vops: &mut Vec<VirtualOperation>) -> Result<(), BlockError> {
        let now = self.state.head_time();

        // Recent-transaction window.
        loop {
            let Some(id) = self
                .state
                .transactions
                .iter_ordered()
                .next()
                .filter(|t| t.expiration <= now)
                .map(|t| t.id)
            else {
                break;
            };
            self.state.transactions.remove(id)?;
        }

        // Delegation returns.
        withdrawals::process_expired_delegations(&mut self.state, vops)?;

        // Unclaimed recovery requests.
        loop {
            let Some(id) = self
                .state
                .account_recovery_requests
                .iter_ordered()
                .next()
                .filter(|r| r.expires <= now)
                .map(|r| r.id)
            else {
                break;
            };
            self.state.account_recovery_requests.remove(id)?;
        }

        // Recovery-partner changes that became effective.
        loop {
            let Some(request) = self
                .state
                .change_recovery_requests
                .iter_ordered()
                .next()
                .filter(|r| r.effective_on <= now)
                .cloned()
            else {
                break;
            };
            if let Ok(account) = self.state.get_account(&request.account_to_recover) {
                let account_id = account.id;
                self.state.accounts.modify(account_id, |a| {
                    a.recovery_account = Some(request.new_recovery_account.clone());
                })?;
            }
            self.state.change_recovery_requests.remove(request.id)?;
        }

        // Master-authority history beyond the recovery window.
        let history_cutoff = now.saturating_sub_secs(self.config.master_auth_recovery_secs);
        loop {
            let Some(id) = self
                .state
                .master_authority_history
                .iter_ordered()
                .next()
                .filter(|h| h.last_valid_time < history_cutoff)
                .map(|h| h.id)
            else {
                break;
            };
            self.state.master_authority_history.remove(id)?;
        }

        // Escrows that missed their ratification deadline refund the sender.
        loop {
            let Some(escrow) = self
                .state
                .escrows
                .iter_ordered()
                .next()
                .filter(|e| e.ratification_deadline <= now && !e.is_ratified())
                .cloned()
            else {
                break;
            };
            let refund = escrow
                .balance
                .checked_add(escrow.pending_fee)
                .map_err(crate::errors::EvaluationError::from)?;
            self.state.adjust_balance(&escrow.from, refund)?;
            self.state.escrows.remove(escrow.id)?;
            debug!(from = %escrow.from, escrow_id = escrow.escrow_id, "escrow ratification expired");
        }
        Ok(())
    }

    /// Reserved-account sweeps: the null and anonymous accounts burn their
    /// liquid balance; the committee account feeds the committee fund.
    fn sweep_reserved_accounts(&mut self) -> Result<(), BlockError> {
        for name in [NULL_ACCOUNT, ANONYMOUS_ACCOUNT] {
            let name = AccountName::new(name).expect("static name is valid");
            let Ok(account) = self.state.get_account(&name) else {
                continue;
            };
            let burned = account.balance.amount;
            if burned > 0 {
                let account_id = account.id;
                self.state
                    .accounts
                    .modify(account_id, |a| a.balance = Asset::weave(0))?;
                self.state
                    .update_global(|g| g.current_supply.amount -= burned);
            }
        }

        let committee = AccountName::new(COMMITTEE_ACCOUNT).expect("static name is valid");
        if let Ok(account) = self.state.get_account(&committee) {
            let swept = account.balance.amount;
            if swept > 0 {
                let account_id = account.id;
                self.state
                    .accounts
                    .modify(account_id, |a| a.balance = Asset::weave(0))?;
                self.state
                    .update_global(|g| g.committee_fund.amount += swept);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local block production
    // ------------------------------------------------------------------

    /// Assemble a block from the pending set, sign it with `sign`, and push
    /// it. The caller must own the scheduled slot.
    pub fn generate_block(
        &mut self,
        when: TimePoint,
        witness: AccountName,
        sign: &dyn Fn(&Digest) -> SignatureBytes,
        skip: SkipFlags,
    ) -> Result<SignedBlock, ChainError> {
        self.clear_pending_state()?;

        let slot = get_slot_at_time(&self.state, &self.config, when);
        if slot == 0 || get_slot_time(&self.state, &self.config, slot) != when {
            return Err(ChainError::Block(BlockError::OffSlotTimestamp {
                timestamp: when,
            }));
        }
        let scheduled = get_scheduled_witness(&self.state, slot);
        if scheduled != witness {
            return Err(ChainError::Block(BlockError::WrongProducer {
                expected: scheduled,
                actual: witness,
            }));
        }

        // Dry-run the pending set to pick the transactions that still apply.
        let pending = self.pending_transactions.clone();
        let mut included = Vec::new();
        self.state.push_session();
        for trx in pending {
            if self.apply_transaction_in_session(&trx, skip).is_ok() {
                included.push(trx);
            }
        }
        self.state.undo_session()?;

        let mut block = SignedBlock {
            header: lib_protocol::BlockHeader {
                previous: self.head_block_id(),
                timestamp: when,
                witness,
                transaction_merkle_root: Digest::zero(),
            },
            witness_signature: SignatureBytes::default(),
            transactions: included,
        };
        block.header.transaction_merkle_root = block.compute_merkle_root();
        block.witness_signature = sign(&block.header.sig_digest(&self.config.chain_id));

        self.push_block(block.clone(), skip)?;
        Ok(block)
    }
}
