//! Shared test fixture: an in-memory chain with deterministic keys.
//!
//! Key material follows a naming convention so helpers can sign for any
//! account: `<name>-master`, `<name>-active`, `<name>-regular`, plus
//! `<name>-signing` for witnesses. The deterministic HashSigner scheme
//! makes identical test runs produce identical block ids.

#![allow(dead_code)]

use lib_chain::{ChainConfig, Database, MemoryBlockLog, SkipFlags};
use lib_protocol::operations::*;
use lib_protocol::{
    Authority, ChainProperties, HashSigner, Operation, PublicKey, SignedBlock, SignedTransaction,
    Transaction,
};
use lib_types::{AccountName, Asset, TimePoint};

pub struct TestNet {
    pub db: Database,
}

pub fn name(s: &str) -> AccountName {
    AccountName::new(s).unwrap()
}

pub fn key(seed: &str) -> PublicKey {
    HashSigner::public_key(seed)
}

impl TestNet {
    pub fn new() -> Self {
        Self::with_config(ChainConfig::testing())
    }

    pub fn with_config(config: ChainConfig) -> Self {
        let db = Database::open(
            config,
            Box::new(MemoryBlockLog::new()),
            Box::new(HashSigner),
        )
        .expect("genesis initialization");
        Self { db }
    }

    pub fn head_time(&self) -> TimePoint {
        self.db.head_block_time()
    }

    // ------------------------------------------------------------------
    // Block production
    // ------------------------------------------------------------------

    /// Produce the next block at `slot` (1 = next interval). Jumping slots
    /// fast-forwards chain time.
    pub fn produce_block_at_slot(&mut self, slot: u32) -> SignedBlock {
        let when = self.db.slot_time(slot);
        let witness = self.db.scheduled_witness(slot);
        let signing_key = self
            .db
            .state()
            .witnesses
            .find(&witness)
            .expect("scheduled witness exists")
            .signing_key
            .clone();
        self.db
            .generate_block(
                when,
                witness,
                &move |digest| HashSigner::sign(&signing_key, digest),
                SkipFlags::empty(),
            )
            .expect("block production")
    }

    pub fn produce_block(&mut self) -> SignedBlock {
        self.produce_block_at_slot(1)
    }

    pub fn produce_blocks(&mut self, count: u32) {
        for _ in 0..count {
            self.produce_block();
        }
    }

    /// Advance chain time by at least `secs` using one slot jump.
    pub fn skip_time(&mut self, secs: u64) -> SignedBlock {
        let interval = self.db.config().block_interval_secs;
        let slots = (secs / interval) as u32 + 1;
        self.produce_block_at_slot(slots)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Build and sign a transaction with keys derived from `key_seeds`.
    pub fn build_tx(&self, operations: Vec<Operation>, key_seeds: &[&str]) -> SignedTransaction {
        let mut transaction = Transaction {
            ref_block_num: 0,
            ref_block_prefix: 0,
            expiration: self.head_time() + 60,
            operations,
        };
        transaction.set_reference_block(&self.db.head_block_id());
        let digest = transaction.sig_digest(&self.db.config().chain_id);
        let signatures = key_seeds
            .iter()
            .map(|seed| HashSigner::sign(&key(seed), &digest))
            .collect();
        SignedTransaction {
            transaction,
            signatures,
        }
    }

    pub fn push_ops(
        &mut self,
        operations: Vec<Operation>,
        key_seeds: &[&str],
    ) -> Result<(), lib_chain::ChainError> {
        let trx = self.build_tx(operations, key_seeds);
        self.db.push_transaction(trx, SkipFlags::empty())
    }

    /// Push and require success.
    pub fn apply_ops(&mut self, operations: Vec<Operation>, key_seeds: &[&str]) {
        self.push_ops(operations, key_seeds).expect("operations apply");
    }

    // ------------------------------------------------------------------
    // Account / economy helpers
    // ------------------------------------------------------------------

    fn init_seed(&self) -> String {
        self.db.config().init_witness_key_seed.clone()
    }

    fn init_name(&self) -> AccountName {
        self.db.config().init_witness.clone()
    }

    /// Create `who` funded by the init account, with conventional keys.
    pub fn create_account(&mut self, who: &str) {
        let fee = self
            .db
            .state()
            .schedule()
            .median_props
            .account_creation_fee;
        let op = Operation::AccountCreate(AccountCreateOperation {
            fee,
            delegation: Asset::shares(0),
            creator: self.init_name(),
            new_account_name: name(who),
            master: Authority::single_key(key(&format!("{who}-master"))),
            active: Authority::single_key(key(&format!("{who}-active"))),
            regular: Authority::single_key(key(&format!("{who}-regular"))),
            memo_key: key(&format!("{who}-memo")),
            json_metadata: String::new(),
        });
        let seed = self.init_seed();
        self.apply_ops(vec![op], &[seed.as_str()]);
    }

    /// Transfer liquid tokens from the init account.
    pub fn fund(&mut self, who: &str, amount: i64) {
        let op = Operation::Transfer(TransferOperation {
            from: self.init_name(),
            to: name(who),
            amount: Asset::weave(amount),
            memo: String::new(),
        });
        let seed = self.init_seed();
        self.apply_ops(vec![op], &[seed.as_str()]);
    }

    /// Vest liquid tokens from the init account into `who`.
    pub fn vest(&mut self, who: &str, amount: i64) {
        let op = Operation::TransferToVesting(TransferToVestingOperation {
            from: self.init_name(),
            to: name(who),
            amount: Asset::weave(amount),
        });
        let seed = self.init_seed();
        self.apply_ops(vec![op], &[seed.as_str()]);
    }

    /// Declare `who` (an existing account) as a witness with default props.
    pub fn register_witness(&mut self, who: &str) {
        let op = Operation::WitnessUpdate(WitnessUpdateOperation {
            owner: name(who),
            url: format!("https://{who}.example"),
            block_signing_key: key(&format!("{who}-signing")),
            props: ChainProperties::default(),
        });
        let seed = format!("{who}-active");
        self.apply_ops(vec![op], &[seed.as_str()]);
    }

    pub fn witness_vote(&mut self, voter: &str, witness: &str, approve: bool) {
        let op = Operation::AccountWitnessVote(AccountWitnessVoteOperation {
            account: name(voter),
            witness: name(witness),
            approve,
        });
        let seed = format!("{voter}-active");
        self.apply_ops(vec![op], &[seed.as_str()]);
    }

    pub fn post(&mut self, author: &str, permlink: &str) {
        let op = Operation::Content(ContentOperation {
            parent_author: None,
            parent_permlink: "test".to_string(),
            author: name(author),
            permlink: permlink.to_string(),
            title: "title".to_string(),
            body: "body".to_string(),
            json_metadata: String::new(),
            extensions: Vec::new(),
        });
        let seed = format!("{author}-regular");
        self.apply_ops(vec![op], &[seed.as_str()]);
    }

    pub fn vote(&mut self, voter: &str, author: &str, permlink: &str, weight: i16) {
        let op = Operation::Vote(VoteOperation {
            voter: name(voter),
            author: name(author),
            permlink: permlink.to_string(),
            weight,
        });
        let seed = format!("{voter}-regular");
        self.apply_ops(vec![op], &[seed.as_str()]);
    }

    pub fn try_vote(
        &mut self,
        voter: &str,
        author: &str,
        permlink: &str,
        weight: i16,
    ) -> Result<(), lib_chain::ChainError> {
        let op = Operation::Vote(VoteOperation {
            voter: name(voter),
            author: name(author),
            permlink: permlink.to_string(),
            weight,
        });
        let seed = format!("{voter}-regular");
        self.push_ops(vec![op], &[seed.as_str()])
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    pub fn account(&self, who: &str) -> lib_chain::objects::Account {
        self.db
            .state()
            .get_account(&name(who))
            .expect("account exists")
            .clone()
    }

    pub fn balance(&self, who: &str) -> i64 {
        self.account(who).balance.amount
    }

    pub fn content(&self, author: &str, permlink: &str) -> lib_chain::objects::Content {
        self.db
            .state()
            .get_content(&name(author), permlink)
            .expect("content exists")
            .clone()
    }
}
