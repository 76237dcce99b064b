//! Undo-session properties: applying then rolling back a block or a
//! transaction leaves every observable quantity untouched.

mod common;

use common::{name, TestNet};
use lib_chain::{BlockError, ChainError};
use lib_protocol::operations::TransferOperation;
use lib_protocol::Operation;
use lib_types::Asset;

/// Two witnesses keep irreversibility one block behind the head, so the
/// head block stays poppable.
fn setup_two_witnesses(net: &mut TestNet) {
    net.create_account("witb");
    net.register_witness("witb");
    let round = net.db.config().round_length();
    net.produce_blocks(round + 1);
}

#[test]
fn pop_block_restores_every_observable() {
    let mut net = TestNet::new();
    setup_two_witnesses(&mut net);
    net.create_account("alice");
    net.fund("alice", 10_000);
    net.produce_block();

    let head_num = net.db.head_block_num();
    let head_id = net.db.head_block_id();
    let revision = net.db.state().revision();
    let alice_balance = net.balance("alice");
    let supply = net.db.state().global().current_supply;
    let accounts = net.db.state().accounts.len();

    // A block with effects: balance moves, counters tick.
    net.fund("alice", 2_500);
    net.produce_block();
    assert_eq!(net.db.head_block_num(), head_num + 1);
    assert_eq!(net.balance("alice"), alice_balance + 2_500);

    net.db.pop_block().expect("head block is above irreversibility");

    assert_eq!(net.db.head_block_num(), head_num);
    assert_eq!(net.db.head_block_id(), head_id);
    assert_eq!(net.db.state().revision(), revision);
    assert_eq!(net.balance("alice"), alice_balance);
    assert_eq!(net.db.state().global().current_supply, supply);
    assert_eq!(net.db.state().accounts.len(), accounts);
}

#[test]
fn failed_transaction_leaves_no_trace() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.create_account("bob");
    net.fund("alice", 100);
    net.produce_block();

    let balance_before = net.balance("alice");
    let tx_rows = net.db.state().transactions.len();

    // Overdraft: the second operation fails, so the first must unwind too.
    let ops = vec![
        Operation::Transfer(TransferOperation {
            from: name("alice"),
            to: name("bob"),
            amount: Asset::weave(50),
            memo: String::new(),
        }),
        Operation::Transfer(TransferOperation {
            from: name("alice"),
            to: name("bob"),
            amount: Asset::weave(10_000),
            memo: String::new(),
        }),
    ];
    let err = net.push_ops(ops, &["alice-active"]).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation { index: 1, .. })
    ));

    assert_eq!(net.balance("alice"), balance_before);
    assert_eq!(net.balance("bob"), 0);
    assert_eq!(net.db.state().transactions.len(), tx_rows);
}

#[test]
fn duplicate_transaction_rejected_within_window() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.fund("alice", 1_000);
    net.produce_block();

    let trx = net.build_tx(
        vec![Operation::Transfer(TransferOperation {
            from: name("alice"),
            to: net.db.config().init_witness.clone(),
            amount: Asset::weave(10),
            memo: String::new(),
        })],
        &["alice-active"],
    );

    net.db
        .push_transaction(trx.clone(), lib_chain::SkipFlags::empty())
        .expect("first submission applies");
    let err = net
        .db
        .push_transaction(trx, lib_chain::SkipFlags::empty())
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::DuplicateTransaction(_))
    ));
}

#[test]
fn missing_signature_rejected() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.fund("alice", 1_000);
    net.produce_block();

    // Signed with the regular key, but transfers need active.
    let err = net
        .push_ops(
            vec![Operation::Transfer(TransferOperation {
                from: name("alice"),
                to: net.db.config().init_witness.clone(),
                amount: Asset::weave(10),
                memo: String::new(),
            })],
            &["alice-regular"],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::MissingSignature { .. })
    ));
}

#[test]
fn expired_transaction_rejected() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.fund("alice", 1_000);
    net.produce_block();

    let mut trx = net.build_tx(
        vec![Operation::Transfer(TransferOperation {
            from: name("alice"),
            to: net.db.config().init_witness.clone(),
            amount: Asset::weave(10),
            memo: String::new(),
        })],
        &["alice-active"],
    );
    trx.transaction.expiration = net.head_time();
    // Re-sign for the altered expiration
    let digest = trx
        .transaction
        .sig_digest(&net.db.config().chain_id);
    trx.signatures = vec![lib_protocol::HashSigner::sign(
        &common::key("alice-active"),
        &digest,
    )];

    let err = net
        .db
        .push_transaction(trx, lib_chain::SkipFlags::empty())
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::TransactionExpired { .. })
    ));
}
