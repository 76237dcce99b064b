//! Fork handling: duplicate rejection, longest-chain switching, replay
//! equivalence, and head restoration when a branch fails mid-apply.

mod common;

use common::TestNet;
use lib_chain::{ChainError, ForkError, SkipFlags};

/// Identical setup on any number of nets: deterministic keys make the
/// resulting block ids identical, so two nets share history byte-for-byte.
fn setup(net: &mut TestNet) {
    net.create_account("witb");
    net.register_witness("witb");
    net.create_account("alice");
    net.fund("alice", 50_000);
    let round = net.db.config().round_length();
    net.produce_blocks(round + 2);
}

#[test]
fn duplicate_block_rejected() {
    let mut net = TestNet::new();
    setup(&mut net);

    let block = net.produce_block();
    let err = net.db.push_block(block, SkipFlags::empty()).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Fork(ForkError::DuplicateBlock(_))
    ));
}

#[test]
fn fork_switch_matches_direct_replay() {
    let mut net_a = TestNet::new();
    let mut net_b = TestNet::new();
    setup(&mut net_a);
    setup(&mut net_b);
    assert_eq!(net_a.db.head_block_id(), net_b.db.head_block_id());

    // A extends with one block at the next slot; B builds a longer branch
    // on later slots, so the chains diverge at the shared head.
    net_a.produce_block_at_slot(1);
    let b1 = net_b.produce_block_at_slot(2);
    let b2 = net_b.produce_block_at_slot(1);
    assert_ne!(net_a.db.head_block_id(), b1.id());

    let switched = net_a
        .db
        .push_block(b1, SkipFlags::empty())
        .expect("same-height candidate is stored");
    assert!(!switched, "equal-length branch must not displace the head");

    let switched = net_a
        .db
        .push_block(b2, SkipFlags::empty())
        .expect("longer branch applies");
    assert!(switched, "longer branch must win");

    // Replay equivalence: the switched chain equals B's direct chain.
    assert_eq!(net_a.db.head_block_id(), net_b.db.head_block_id());
    assert_eq!(net_a.db.head_block_num(), net_b.db.head_block_num());
    assert_eq!(
        net_a.db.state().global().current_supply,
        net_b.db.state().global().current_supply
    );
    assert_eq!(net_a.balance("alice"), net_b.balance("alice"));
    assert_eq!(
        net_a.db.state().global().current_aslot,
        net_b.db.state().global().current_aslot
    );
}

#[test]
fn failed_branch_restores_previous_head() {
    let mut net_a = TestNet::new();
    let mut net_b = TestNet::new();
    setup(&mut net_a);
    setup(&mut net_b);

    net_a.produce_block_at_slot(1);
    let head_before = net_a.db.head_block_id();

    let b1 = net_b.produce_block_at_slot(2);
    let mut b2 = net_b.produce_block_at_slot(1);
    // Corrupt the second branch block: merkle root no longer matches.
    b2.header.transaction_merkle_root = lib_types::hash_digest(b"tampered");

    net_a
        .db
        .push_block(b1, SkipFlags::empty())
        .expect("valid sibling stored");
    let err = net_a.db.push_block(b2, SkipFlags::empty()).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Fork(ForkError::BranchApplyFailed { .. })
            | ChainError::Block(lib_chain::BlockError::BadProducerSignature { .. })
    ));

    // The old head must be back, exactly.
    assert_eq!(net_a.db.head_block_id(), head_before);

    // And the chain keeps extending normally afterwards.
    net_a.produce_block();
    assert_eq!(net_a.db.head_block_id().block_num(), head_before.block_num() + 1);
}

#[test]
fn unlinkable_block_rejected() {
    let mut net = TestNet::new();
    setup(&mut net);

    let mut stray = net.produce_block_at_slot(1);
    // Detach it from everything we know.
    stray.header.previous = lib_types::BlockId::from_digest(
        lib_types::hash_digest(b"unknown ancestor"),
        stray.block_num() + 5,
    );
    let err = net.db.push_block(stray, SkipFlags::empty()).unwrap_err();
    assert!(matches!(err, ChainError::Fork(ForkError::Unlinkable(_))));
}

#[test]
fn block_log_receives_irreversible_blocks() {
    let mut net = TestNet::new();
    // Single-witness chain: every block is immediately irreversible.
    net.create_account("alice");
    net.fund("alice", 1_000);
    net.produce_blocks(3);

    let global = net.db.state().global();
    assert_eq!(
        global.last_irreversible_block_num,
        global.head_block_number
    );
    assert_eq!(
        net.db.block_log().head_num().unwrap(),
        global.head_block_number
    );
}
