//! Content cashout: pool claims, curation split, beneficiaries, and the
//! exactly-once payout transition.

mod common;

use common::{name, TestNet};
use lib_chain::{BlockError, ChainError, EvaluationError};
use lib_protocol::operations::{ContentExtension, ContentOperation};
use lib_protocol::{BeneficiaryRoute, Operation};
use lib_types::TimePoint;

fn cashout_net() -> TestNet {
    let mut net = TestNet::new();
    net.create_account("author");
    net.create_account("curator");
    net.vest("curator", 10_000);
    net.produce_block();
    net
}

#[test]
fn cashout_pays_once_and_locks_votes() {
    let mut net = cashout_net();
    net.post("author", "post");
    net.produce_block();
    net.vote("curator", "author", "post", 10_000);
    net.produce_block();

    let content = net.content("author", "post");
    assert!(content.net_rshares > 0);
    assert!(content.cashout_time > net.head_time());

    let author_balance_before = net.balance("author");
    let author_vesting_before = net.account("author").vesting_shares.amount;
    let curator_vesting_before = net.account("curator").vesting_shares.amount;

    // Jump past the cashout window; the sweep runs in this block.
    let window = net.db.config().cashout_window_secs;
    net.skip_time(window + 60);

    let content = net.content("author", "post");
    assert_eq!(content.cashout_time, TimePoint::MAX);
    assert_eq!(content.net_rshares, 0);
    assert!(content.total_payout_value.amount > 0);
    assert_eq!(net.db.state().global().total_reward_shares2, 0);

    // Author got the liquid half and the vested half.
    assert!(net.balance("author") > author_balance_before);
    assert!(net.account("author").vesting_shares.amount > author_vesting_before);
    // The curator's share arrived as vesting.
    assert!(net.account("curator").vesting_shares.amount > curator_vesting_before);

    // Votes are locked: any further change is rejected.
    let err = net.try_vote("curator", "author", "post", 5_000).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::VoteLocked,
            ..
        })
    ));

    // And a brand-new vote after close is rejected too.
    net.create_account("late");
    net.vest("late", 10_000);
    net.produce_block();
    let err = net.try_vote("late", "author", "post", 5_000).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::ContentPaidOut,
            ..
        })
    ));
}

#[test]
fn beneficiaries_take_their_share_of_the_author_payout() {
    let mut net = cashout_net();
    net.create_account("charity");

    let op = Operation::Content(ContentOperation {
        parent_author: None,
        parent_permlink: "test".to_string(),
        author: name("author"),
        permlink: "shared".to_string(),
        title: "t".to_string(),
        body: "b".to_string(),
        json_metadata: String::new(),
        extensions: vec![ContentExtension::Beneficiaries(vec![BeneficiaryRoute {
            account: name("charity"),
            weight: 5_000,
        }])],
    });
    net.apply_ops(vec![op], &["author-regular"]);
    net.produce_block();
    net.vote("curator", "author", "shared", 10_000);
    net.produce_block();

    let window = net.db.config().cashout_window_secs;
    net.skip_time(window + 60);

    // Half of the author share vested into the beneficiary.
    assert!(net.account("charity").vesting_shares.amount > 0);
    let content = net.content("author", "shared");
    assert!(content.total_payout_value.amount > 0);
}

#[test]
fn beneficiaries_lock_after_first_vote() {
    let mut net = cashout_net();
    net.create_account("charity");
    net.post("author", "post");
    net.produce_block();
    net.vote("curator", "author", "post", 10_000);
    net.produce_block();

    let op = Operation::Content(ContentOperation {
        parent_author: None,
        parent_permlink: "test".to_string(),
        author: name("author"),
        permlink: "post".to_string(),
        title: "t".to_string(),
        body: "b".to_string(),
        json_metadata: String::new(),
        extensions: vec![ContentExtension::Beneficiaries(vec![BeneficiaryRoute {
            account: name("charity"),
            weight: 1_000,
        }])],
    });
    let err = net.push_ops(vec![op], &["author-regular"]).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::BeneficiariesLocked,
            ..
        })
    ));
}

#[test]
fn reward_fund_drains_by_exactly_the_claim() {
    let mut net = cashout_net();
    net.post("author", "post");
    net.produce_block();
    net.vote("curator", "author", "post", 10_000);

    let window = net.db.config().cashout_window_secs;
    net.skip_time(window + 60);

    let global = net.db.state().global();
    let content = net.content("author", "post");
    let paid = content.total_payout_value.amount + content.curator_payout_value.amount;
    // Everything paid out came from the fund; the fund never goes negative.
    assert!(global.total_reward_fund.amount >= 0);
    assert!(paid > 0);
}
