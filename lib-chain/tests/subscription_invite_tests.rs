//! Paid subscriptions and invites.

mod common;

use common::{key, name, TestNet};
use lib_chain::objects::InviteStatus;
use lib_chain::{BlockError, ChainError, EvaluationError};
use lib_protocol::operations::{
    ClaimInviteBalanceOperation, CreateInviteOperation, InviteRegistrationOperation,
    PaidSubscribeOperation, SetPaidSubscriptionOperation,
};
use lib_protocol::{HashSigner, Operation};
use lib_types::Asset;

const DAY: u64 = 60 * 60 * 24;

fn subscription_net() -> TestNet {
    let mut net = TestNet::new();
    net.create_account("creator");
    net.create_account("reader");
    net.fund("reader", 100_000);
    net.produce_block();

    let menu = Operation::SetPaidSubscription(SetPaidSubscriptionOperation {
        account: name("creator"),
        url: "https://creator.example".to_string(),
        levels: 3,
        amount: Asset::weave(1_000),
        period: 1,
    });
    net.apply_ops(vec![menu], &["creator-active"]);
    net.produce_block();
    net
}

fn subscribe(net: &mut TestNet, level: u16, amount: i64, auto: bool) -> Result<(), ChainError> {
    let op = Operation::PaidSubscribe(PaidSubscribeOperation {
        subscriber: name("reader"),
        account: name("creator"),
        level,
        amount: Asset::weave(amount),
        period: 1,
        auto_renewal: auto,
    });
    net.push_ops(vec![op], &["reader-active"])
}

#[test]
fn subscribe_charges_level_scaled_price() {
    let mut net = subscription_net();

    subscribe(&mut net, 2, 1_000, true).unwrap();
    net.produce_block();

    assert_eq!(net.balance("reader"), 100_000 - 2_000);
    assert_eq!(net.balance("creator"), 2_000);
    let sub = net
        .db
        .state()
        .paid_subscribes
        .find(&(name("reader"), name("creator")))
        .unwrap()
        .clone();
    assert!(sub.active);
    assert_eq!(sub.level, 2);
}

#[test]
fn quoted_terms_must_match_the_menu() {
    let mut net = subscription_net();
    let err = subscribe(&mut net, 2, 999, true).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::SubscriptionTermsMismatch,
            ..
        })
    ));
    let err = subscribe(&mut net, 4, 1_000, true).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::SubscriptionTermsMismatch,
            ..
        })
    ));
}

#[test]
fn renewal_charges_again_and_lapses_without_funds() {
    let mut net = subscription_net();
    subscribe(&mut net, 1, 1_000, true).unwrap();
    net.produce_block();
    assert_eq!(net.balance("reader"), 99_000);

    // One billing period later the renewal debits again.
    net.skip_time(DAY + 60);
    assert_eq!(net.balance("reader"), 98_000);
    assert_eq!(net.balance("creator"), 2_000);

    // Drain the reader; the next renewal lapses the subscription.
    let drain = net.balance("reader");
    let op = Operation::Transfer(lib_protocol::operations::TransferOperation {
        from: name("reader"),
        to: net.db.config().init_witness.clone(),
        amount: Asset::weave(drain),
        memo: String::new(),
    });
    net.apply_ops(vec![op], &["reader-active"]);
    net.produce_block();

    net.skip_time(DAY + 60);
    let sub = net
        .db
        .state()
        .paid_subscribes
        .find(&(name("reader"), name("creator")))
        .unwrap()
        .clone();
    assert!(!sub.active);
}

#[test]
fn plan_switch_prorates_the_unspent_tail() {
    let mut net = subscription_net();
    subscribe(&mut net, 1, 1_000, true).unwrap();
    net.produce_block();
    let after_first = net.balance("reader");

    // Upgrade to level 3 immediately: nearly the whole level-1 cycle is
    // unspent, so the top-up is close to the price difference.
    subscribe(&mut net, 3, 1_000, true).unwrap();
    net.produce_block();
    let charged = after_first - net.balance("reader");
    assert!(charged >= 2_000 && charged <= 2_010, "charged {charged}");

    let sub = net
        .db
        .state()
        .paid_subscribes
        .find(&(name("reader"), name("creator")))
        .unwrap()
        .clone();
    assert_eq!(sub.level, 3);
}

// ============================================================================
// INVITES
// ============================================================================

#[test]
fn invite_claim_consumes_the_secret_exactly_once() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.create_account("bob");
    net.fund("alice", 10_000);
    net.produce_block();

    let invite_key = key("invite-one");
    let create = Operation::CreateInvite(CreateInviteOperation {
        creator: name("alice"),
        balance: Asset::weave(5_000),
        invite_key: invite_key.clone(),
    });
    net.apply_ops(vec![create], &["alice-active"]);
    net.produce_block();
    assert_eq!(net.balance("alice"), 5_000);

    // Wrong secret: signature by a different key.
    let digest = ClaimInviteBalanceOperation::claim_digest(&name("bob"));
    let bad = Operation::ClaimInviteBalance(ClaimInviteBalanceOperation {
        initiator: name("bob"),
        receiver: name("bob"),
        invite_key: invite_key.clone(),
        invite_signature: HashSigner::sign(&key("not-the-invite"), &digest),
    });
    let err = net.push_ops(vec![bad], &["bob-regular"]).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::BadInviteSecret,
            ..
        })
    ));

    let claim = Operation::ClaimInviteBalance(ClaimInviteBalanceOperation {
        initiator: name("bob"),
        receiver: name("bob"),
        invite_key: invite_key.clone(),
        invite_signature: HashSigner::sign(&invite_key, &digest),
    });
    net.apply_ops(vec![claim.clone()], &["bob-regular"]);
    assert_eq!(net.balance("bob"), 5_000);
    let invite = net.db.state().invites.find(&invite_key).unwrap().clone();
    assert_eq!(invite.status, InviteStatus::Claimed);
    assert_eq!(invite.balance.amount, 0);
    net.produce_block();

    // Second claim of a consumed invite fails.
    let err = net.push_ops(vec![claim], &["bob-regular"]).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::UnknownInvite,
            ..
        })
    ));
}

#[test]
fn invite_registration_bootstraps_a_vested_account() {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.fund("alice", 10_000);
    net.produce_block();

    let invite_key = key("invite-two");
    let create = Operation::CreateInvite(CreateInviteOperation {
        creator: name("alice"),
        balance: Asset::weave(5_000),
        invite_key: invite_key.clone(),
    });
    net.apply_ops(vec![create], &["alice-active"]);
    net.produce_block();

    let digest = InviteRegistrationOperation::registration_digest(&name("newbie"));
    let register = Operation::InviteRegistration(InviteRegistrationOperation {
        initiator: name("alice"),
        new_account_name: name("newbie"),
        invite_key: invite_key.clone(),
        invite_signature: HashSigner::sign(&invite_key, &digest),
        new_account_key: key("newbie-key"),
    });
    net.apply_ops(vec![register], &["alice-regular"]);
    net.produce_block();

    let newbie = net.account("newbie");
    assert!(newbie.vesting_shares.amount > 0);
    assert_eq!(newbie.balance.amount, 0);
    let invite = net.db.state().invites.find(&invite_key).unwrap().clone();
    assert_eq!(invite.status, InviteStatus::Registered);
}
