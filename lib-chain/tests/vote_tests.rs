//! Content voting: rshares accounting, the net_votes truth table, re-vote
//! limits, energy spend, and ancestor propagation.

mod common;

use common::{name, TestNet};
use lib_chain::{BlockError, ChainError, EvaluationError};
use lib_protocol::operations::ContentOperation;
use lib_protocol::Operation;

fn voting_net() -> TestNet {
    let mut net = TestNet::new();
    net.create_account("alice");
    net.create_account("bob");
    net.vest("alice", 10_000);
    net.produce_block();
    net.post("bob", "post");
    net.produce_block();
    net
}

fn evaluation_error(err: ChainError) -> EvaluationError {
    match err {
        ChainError::Block(BlockError::Evaluation { source, .. }) => source,
        other => panic!("expected an evaluation failure, got {other:?}"),
    }
}

#[test]
fn upvote_then_flag_walks_the_net_votes_truth_table() {
    let mut net = voting_net();

    net.vote("alice", "bob", "post", 5_000);
    let content = net.content("bob", "post");
    assert_eq!(content.net_votes, 1);
    assert!(content.net_rshares > 0);
    assert_eq!(content.abs_rshares, content.net_rshares);
    let first_rshares = content.net_rshares;

    // Same weight again is rejected.
    let err = evaluation_error(net.try_vote("alice", "bob", "post", 5_000).unwrap_err());
    assert_eq!(err, EvaluationError::VoteUnchanged);

    // Weight change flips the vote: +1 -> -1.
    net.vote("alice", "bob", "post", -3_000);
    let content = net.content("bob", "post");
    assert_eq!(content.net_votes, -1);
    assert!(content.net_rshares < 0);
    // abs accumulates, it never unwinds
    assert!(content.abs_rshares > first_rshares);

    let vote = net
        .db
        .state()
        .content_votes
        .find(&(content.id, name("alice")))
        .unwrap()
        .clone();
    assert_eq!(vote.percent, -3_000);
    assert_eq!(vote.num_changes, 1);
    // A changed vote forfeits its curation weight.
    assert_eq!(vote.weight, 0);
}

#[test]
fn revote_budget_is_bounded() {
    let mut net = voting_net();

    net.vote("alice", "bob", "post", 10_000);
    let weights = [9_000, 8_000, 7_000, 6_000, 5_000];
    for weight in weights {
        net.vote("alice", "bob", "post", weight);
    }
    let err = evaluation_error(net.try_vote("alice", "bob", "post", 4_000).unwrap_err());
    assert_eq!(err, EvaluationError::TooManyVoteChanges);
}

#[test]
fn voting_spends_energy() {
    let mut net = voting_net();

    let before = net.account("alice").energy;
    net.vote("alice", "bob", "post", 10_000);
    let after = net.account("alice");
    assert!(after.energy < before);
    assert_eq!(after.vote_count, 1);

    // Flags cost more than the same-magnitude upvote would.
    net.post("bob", "second");
    net.produce_block();
    let energy_before_flag = net.account("alice").energy;
    net.vote("alice", "bob", "second", -10_000);
    let flag_spend = energy_before_flag - net.account("alice").energy;
    assert!(flag_spend > before - after.energy);
}

#[test]
fn rshares_propagate_to_ancestors() {
    let mut net = voting_net();

    // bob/post <- alice/reply
    let reply = Operation::Content(ContentOperation {
        parent_author: Some(name("bob")),
        parent_permlink: "post".to_string(),
        author: name("alice"),
        permlink: "reply".to_string(),
        title: String::new(),
        body: "reply body".to_string(),
        json_metadata: String::new(),
        extensions: Vec::new(),
    });
    net.apply_ops(vec![reply], &["alice-regular"]);
    net.produce_block();

    let root = net.content("bob", "post");
    assert_eq!(root.children, 1);
    let reply = net.content("alice", "reply");
    assert_eq!(reply.depth, 1);
    assert_eq!(reply.root, root.id);

    net.vote("alice", "alice", "reply", 5_000);
    let reply = net.content("alice", "reply");
    let root = net.content("bob", "post");

    // Subtree aggregate holds on the reply and the root alike.
    assert_eq!(reply.children_rshares, reply.net_rshares);
    assert_eq!(root.children_rshares, reply.net_rshares);
    assert_eq!(root.net_rshares, 0);

    // The global claim denominator tracks the reply's square.
    let expected = (reply.net_rshares as u128) * (reply.net_rshares as u128);
    assert_eq!(net.db.state().global().total_reward_shares2, expected);
}

#[test]
fn noise_floor_zeroes_dust_votes() {
    let mut net = voting_net();

    // A 1% sliver of voting power produces rshares under the median noise
    // floor; accounting treats the vote as zero.
    net.vote("alice", "bob", "post", 100);
    let content = net.content("bob", "post");
    assert_eq!(content.net_rshares, 0);
    // The vote record exists; only its rshares were floored.
    assert_eq!(content.net_votes, 0);
    assert!(net
        .db
        .state()
        .content_votes
        .find(&(content.id, name("alice")))
        .is_some());
}
