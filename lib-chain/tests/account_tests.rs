//! Account lifecycle: creation economics, the anonymous faucet, master
//! rotation rate limiting, and recovery.

mod common;

use common::{key, name, TestNet};
use lib_chain::{BlockError, ChainError, EvaluationError};
use lib_protocol::operations::{
    AccountCreateOperation, AccountUpdateOperation, RecoverAccountOperation,
    RequestAccountRecoveryOperation, TransferOperation,
};
use lib_protocol::{Authority, HashSigner, Operation};
use lib_types::Asset;

#[test]
fn creation_fee_floor_is_enforced() {
    let mut net = TestNet::new();
    let median_fee = net
        .db
        .state()
        .schedule()
        .median_props
        .account_creation_fee
        .amount;

    let op = Operation::AccountCreate(AccountCreateOperation {
        fee: Asset::weave(median_fee / 100),
        delegation: Asset::shares(0),
        creator: net.db.config().init_witness.clone(),
        new_account_name: name("cheap"),
        master: Authority::single_key(key("cheap-master")),
        active: Authority::single_key(key("cheap-active")),
        regular: Authority::single_key(key("cheap-regular")),
        memo_key: key("cheap-memo"),
        json_metadata: String::new(),
    });
    let seed = net.db.config().init_witness_key_seed.clone();
    let err = net.push_ops(vec![op], &[seed.as_str()]).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::CreationFeeTooLow { .. },
            ..
        })
    ));
}

#[test]
fn full_fee_creation_vests_into_the_new_account() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.produce_block();

    let alice = net.account("alice");
    assert!(alice.vesting_shares.amount > 0);
    assert_eq!(alice.balance.amount, 0);
    assert_eq!(alice.recovery_account, Some(net.db.config().init_witness.clone()));
    assert!(net.db.state().get_authority(&name("alice")).is_ok());
}

#[test]
fn anonymous_deposit_mints_a_subaccount() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.fund("alice", 10_000);
    net.produce_block();

    // Bare hex key in the memo: counter-named subaccount.
    let sub_key = key("anon-sub");
    let op = Operation::Transfer(TransferOperation {
        from: name("alice"),
        to: name("anonymous"),
        amount: Asset::weave(2_000),
        memo: hex::encode(sub_key.as_bytes()),
    });
    net.apply_ops(vec![op], &["alice-active"]);
    net.produce_block();

    let sub = net.account("n1.anonymous");
    assert!(sub.vesting_shares.amount > 0);
    assert_eq!(sub.memo_key, sub_key);
    assert_eq!(net.account("anonymous").subaccount_count, 1);

    // login:key memo picks the subaccount name.
    let op = Operation::Transfer(TransferOperation {
        from: name("alice"),
        to: name("anonymous"),
        amount: Asset::weave(2_000),
        memo: format!("vera:{}", hex::encode(key("vera-key").as_bytes())),
    });
    net.apply_ops(vec![op], &["alice-active"]);
    net.produce_block();
    assert!(net.db.state().account_exists(&name("vera.anonymous")));

    // A memo that encodes no key is rejected.
    let op = Operation::Transfer(TransferOperation {
        from: name("alice"),
        to: name("anonymous"),
        amount: Asset::weave(2_000),
        memo: "just a note".to_string(),
    });
    let err = net.push_ops(vec![op], &["alice-active"]).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::BadAnonymousMemo,
            ..
        })
    ));
}

#[test]
fn master_rotation_is_rate_limited_and_recoverable() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.produce_block();
    // Get past the initial rate-limit window.
    let interval = net.db.config().master_update_interval_secs;
    net.skip_time(interval + 60);

    // Rotate master (the "theft").
    let rotate = Operation::AccountUpdate(AccountUpdateOperation {
        account: name("alice"),
        master: Some(Authority::single_key(key("alice-stolen"))),
        active: None,
        regular: None,
        memo_key: None,
        json_metadata: String::new(),
    });
    net.apply_ops(vec![rotate], &["alice-master"]);
    net.produce_block();

    // A second rotation inside the window is rate-limited.
    let rotate_again = Operation::AccountUpdate(AccountUpdateOperation {
        account: name("alice"),
        master: Some(Authority::single_key(key("alice-stolen-2"))),
        active: None,
        regular: None,
        memo_key: None,
        json_metadata: String::new(),
    });
    let err = net
        .push_ops(vec![rotate_again], &["alice-stolen"])
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::MasterUpdateRateLimited { .. },
            ..
        })
    ));

    // The recovery partner files a request naming a fresh master.
    let request = Operation::RequestAccountRecovery(RequestAccountRecoveryOperation {
        recovery_account: net.db.config().init_witness.clone(),
        account_to_recover: name("alice"),
        new_master_authority: Authority::single_key(key("alice-recovered")),
    });
    let seed = net.db.config().init_witness_key_seed.clone();
    net.apply_ops(vec![request], &[seed.as_str()]);
    net.produce_block();

    // Completion proves the pre-theft master plus the new one.
    let recover = Operation::RecoverAccount(RecoverAccountOperation {
        account_to_recover: name("alice"),
        new_master_authority: Authority::single_key(key("alice-recovered")),
        recent_master_authority: Authority::single_key(key("alice-master")),
    });
    let trx = net.build_tx(vec![recover], &["alice-recovered", "alice-master"]);
    net.db
        .push_transaction(trx, lib_chain::SkipFlags::empty())
        .expect("recovery applies");
    net.produce_block();

    let authority = net.db.state().get_authority(&name("alice")).unwrap();
    assert_eq!(
        authority.master,
        Authority::single_key(key("alice-recovered"))
    );
    assert!(net
        .db
        .state()
        .account_recovery_requests
        .find(&name("alice"))
        .is_none());
}
