//! Escrow state machine: ratification, the deadline rule, disputes, and
//! the release permission matrix.

mod common;

use common::{name, TestNet};
use lib_chain::{BlockError, ChainError, EvaluationError};
use lib_protocol::operations::{
    EscrowApproveOperation, EscrowDisputeOperation, EscrowReleaseOperation,
    EscrowTransferOperation,
};
use lib_protocol::Operation;
use lib_types::Asset;

fn escrow_net() -> TestNet {
    let mut net = TestNet::new();
    for who in ["alice", "bob", "carol"] {
        net.create_account(who);
    }
    net.fund("alice", 50_000);
    net.produce_block();
    net
}

fn open_escrow(net: &mut TestNet, escrow_id: u32, deadline_in: u64, expires_in: u64) {
    let now = net.head_time();
    let op = Operation::EscrowTransfer(EscrowTransferOperation {
        from: name("alice"),
        to: name("bob"),
        agent: name("carol"),
        escrow_id,
        amount: Asset::weave(10_000),
        fee: Asset::weave(500),
        ratification_deadline: now + deadline_in,
        escrow_expiration: now + expires_in,
        json_metadata: String::new(),
    });
    net.apply_ops(vec![op], &["alice-active"]);
}

fn approve(net: &mut TestNet, who: &str, escrow_id: u32) -> Result<(), ChainError> {
    let op = Operation::EscrowApprove(EscrowApproveOperation {
        from: name("alice"),
        to: name("bob"),
        agent: name("carol"),
        who: name(who),
        escrow_id,
        approve: true,
    });
    let seed = format!("{who}-active");
    net.push_ops(vec![op], &[seed.as_str()])
}

#[test]
fn ratification_pays_the_agent_fee_once() {
    let mut net = escrow_net();
    open_escrow(&mut net, 1, 600, 7_200);
    net.produce_block();

    // Funds and fee left the sender immediately.
    assert_eq!(net.balance("alice"), 50_000 - 10_500);
    let carol_before = net.balance("carol");

    approve(&mut net, "bob", 1).unwrap();
    assert_eq!(net.balance("carol"), carol_before);
    approve(&mut net, "carol", 1).unwrap();
    // Second approval releases the fee, exactly once.
    assert_eq!(net.balance("carol"), carol_before + 500);
    net.produce_block();

    // Undisputed and unexpired: bob may release back to alice only... and
    // alice to bob. Alice releases a slice to bob.
    let release = Operation::EscrowRelease(EscrowReleaseOperation {
        from: name("alice"),
        to: name("bob"),
        agent: name("carol"),
        who: name("alice"),
        receiver: name("bob"),
        escrow_id: 1,
        amount: Asset::weave(4_000),
    });
    net.apply_ops(vec![release], &["alice-active"]);
    assert_eq!(net.balance("bob"), 4_000);
}

#[test]
fn approval_after_deadline_fails() {
    let mut net = escrow_net();
    // Deadline 60s out; the approval arrives far later.
    open_escrow(&mut net, 2, 60, 7_200);
    net.produce_block();
    net.skip_time(120);

    // The deadline check precedes the approval bookkeeping. Depending on
    // timing the expiry sweep may already have refunded the row; both
    // outcomes reject the approval.
    let err = approve(&mut net, "bob", 2).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::EscrowDeadlinePassed
                | EvaluationError::UnknownEscrow { .. },
            ..
        })
    ));
}

#[test]
fn expired_unratified_escrow_refunds_the_sender() {
    let mut net = escrow_net();
    open_escrow(&mut net, 3, 60, 7_200);
    net.produce_block();
    assert_eq!(net.balance("alice"), 50_000 - 10_500);

    net.skip_time(120);
    // The sweep refunded the full amount plus the unpaid fee.
    assert_eq!(net.balance("alice"), 50_000);
    assert!(net
        .db
        .state()
        .escrows
        .find(&(name("alice"), 3))
        .is_none());
}

#[test]
fn dispute_hands_release_to_the_agent() {
    let mut net = escrow_net();
    open_escrow(&mut net, 4, 600, 7_200);
    net.produce_block();
    approve(&mut net, "bob", 4).unwrap();
    approve(&mut net, "carol", 4).unwrap();
    net.produce_block();

    let dispute = Operation::EscrowDispute(EscrowDisputeOperation {
        from: name("alice"),
        to: name("bob"),
        agent: name("carol"),
        who: name("bob"),
        escrow_id: 4,
    });
    net.apply_ops(vec![dispute], &["bob-active"]);
    net.produce_block();

    // The counterparties lost release rights.
    let forbidden = Operation::EscrowRelease(EscrowReleaseOperation {
        from: name("alice"),
        to: name("bob"),
        agent: name("carol"),
        who: name("alice"),
        receiver: name("bob"),
        escrow_id: 4,
        amount: Asset::weave(1_000),
    });
    let err = net.push_ops(vec![forbidden], &["alice-active"]).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::EscrowReleaseForbidden { .. },
            ..
        })
    ));

    // The agent arbitrates; releasing the full balance closes the escrow.
    let arbitrate = Operation::EscrowRelease(EscrowReleaseOperation {
        from: name("alice"),
        to: name("bob"),
        agent: name("carol"),
        who: name("carol"),
        receiver: name("alice"),
        escrow_id: 4,
        amount: Asset::weave(10_000),
    });
    net.apply_ops(vec![arbitrate], &["carol-active"]);
    assert_eq!(net.balance("alice"), 50_000 - 10_500 + 10_000);
    assert!(net
        .db
        .state()
        .escrows
        .find(&(name("alice"), 4))
        .is_none());
}
