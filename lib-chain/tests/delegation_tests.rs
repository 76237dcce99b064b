//! Vesting delegation: availability accounting, the minimum-size rule, and
//! time-locked returns.

mod common;

use common::{name, TestNet};
use lib_chain::{BlockError, ChainError, EvaluationError};
use lib_protocol::operations::DelegateVestingSharesOperation;
use lib_protocol::Operation;
use lib_types::Asset;

fn delegate(net: &mut TestNet, from: &str, to: &str, shares: i64) -> Result<(), ChainError> {
    let op = Operation::DelegateVestingShares(DelegateVestingSharesOperation {
        delegator: name(from),
        delegatee: name(to),
        vesting_shares: Asset::shares(shares),
    });
    let seed = format!("{from}-active");
    net.push_ops(vec![op], &[seed.as_str()])
}

#[test]
fn delegation_reduces_available_and_returns_after_the_lock() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.create_account("bob");
    net.vest("alice", 10_000);
    net.produce_block();

    let alice = net.account("alice");
    let total = alice.vesting_shares.amount;
    assert_eq!(alice.available_vesting_shares(), total);

    // Delegate roughly a third of the stake.
    let delegated = total / 3;
    delegate(&mut net, "alice", "bob", delegated).unwrap();
    net.produce_block();

    let alice = net.account("alice");
    let bob = net.account("bob");
    assert_eq!(alice.available_vesting_shares(), total - delegated);
    assert_eq!(alice.delegated_vesting_shares.amount, delegated);
    assert_eq!(bob.received_vesting_shares.amount, delegated);
    // Content-vote power moved; witness-vote stake did not.
    assert_eq!(bob.effective_vesting_shares(), delegated);
    assert_eq!(bob.witness_vote_stake(), 0);
    assert_eq!(alice.witness_vote_stake(), total);

    // Remove the delegation: the delegatee loses it now, the delegator
    // gets it back only after the lock expires.
    delegate(&mut net, "alice", "bob", 0).unwrap();
    net.produce_block();

    let alice = net.account("alice");
    let bob = net.account("bob");
    assert_eq!(bob.received_vesting_shares.amount, 0);
    assert_eq!(alice.delegated_vesting_shares.amount, delegated);
    assert_eq!(alice.available_vesting_shares(), total - delegated);

    let expiration = net
        .db
        .state()
        .vesting_delegation_expirations
        .iter()
        .next()
        .expect("expiration record exists")
        .clone();
    assert_eq!(expiration.vesting_shares.amount, delegated);

    // Pass the payout window; the sweep releases the shares.
    let window = net.db.config().cashout_window_secs;
    net.skip_time(window + 60);

    let alice = net.account("alice");
    assert_eq!(alice.delegated_vesting_shares.amount, 0);
    assert_eq!(alice.available_vesting_shares(), total);
    assert!(net
        .db
        .state()
        .vesting_delegation_expirations
        .is_empty());
}

#[test]
fn delegation_enforces_minimum_and_capacity() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.create_account("bob");
    net.vest("alice", 10_000);
    net.produce_block();

    // Below the median minimum.
    let err = delegate(&mut net, "alice", "bob", 10).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::DelegationTooSmall,
            ..
        })
    ));

    // More than alice holds.
    let total = net.account("alice").vesting_shares.amount;
    let err = delegate(&mut net, "alice", "bob", total + 1).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::InsufficientVesting { .. },
            ..
        })
    ));

    // Unchanged re-delegation is rejected.
    let amount = total / 2;
    delegate(&mut net, "alice", "bob", amount).unwrap();
    let err = delegate(&mut net, "alice", "bob", amount).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::DelegationUnchanged,
            ..
        })
    ));
}

#[test]
fn withdrawal_tranches_respect_routes() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.create_account("bob");
    net.vest("alice", 10_000);
    net.produce_block();

    let total = net.account("alice").vesting_shares.amount;
    let withdraw = total / 2;

    let withdraw_op = Operation::WithdrawVesting(
        lib_protocol::operations::WithdrawVestingOperation {
            account: name("alice"),
            vesting_shares: Asset::shares(withdraw),
        },
    );
    // Half of each tranche flows to bob, re-vested.
    let route_op = Operation::SetWithdrawVestingRoute(
        lib_protocol::operations::SetWithdrawVestingRouteOperation {
            from_account: name("alice"),
            to_account: name("bob"),
            percent: 5_000,
            auto_vest: true,
        },
    );
    net.apply_ops(vec![withdraw_op, route_op], &["alice-active"]);
    net.produce_block();

    let alice = net.account("alice");
    let intervals = net.db.config().vesting_withdraw_intervals as i64;
    assert_eq!(alice.to_withdraw, withdraw);
    assert_eq!(alice.vesting_withdraw_rate.amount, withdraw / intervals);

    let interval_secs = net.db.config().vesting_withdraw_interval_secs;
    net.skip_time(interval_secs + 60);

    let alice = net.account("alice");
    let bob = net.account("bob");
    let tranche = withdraw / intervals;
    assert_eq!(alice.withdrawn, tranche);
    assert_eq!(alice.vesting_shares.amount, total - tranche);
    // Bob received half the tranche as shares.
    assert_eq!(bob.vesting_shares.amount, tranche / 2);
    // Alice's half arrived as liquid.
    assert!(net.balance("alice") > 0);
}
