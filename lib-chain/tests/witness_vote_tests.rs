//! Witness voting: the three hardfork-gated weight formulas, proxying with
//! loop detection, and the vote cap.

mod common;

use common::{name, TestNet};
use lib_chain::{BlockError, ChainConfig, ChainError, EvaluationError};
use lib_protocol::operations::AccountWitnessProxyOperation;
use lib_protocol::Operation;

fn governance_net(config: ChainConfig) -> TestNet {
    let mut net = TestNet::with_config(config);
    for who in ["alice", "bob", "witb", "witc"] {
        net.create_account(who);
    }
    net.register_witness("witb");
    net.register_witness("witc");
    net.vest("alice", 10_000);
    net.vest("bob", 4_000);
    net.produce_block();
    net
}

fn witness_votes(net: &TestNet, witness: &str) -> i64 {
    net.db.state().get_witness(&name(witness)).unwrap().votes
}

#[test]
fn legacy_formula_counts_full_stake_per_witness() {
    let mut net = governance_net(ChainConfig::testing());
    let stake = net.account("alice").witness_vote_stake();

    net.witness_vote("alice", "witb", true);
    net.witness_vote("alice", "witc", true);

    // HF0: each voted witness carries the voter's full stake.
    assert_eq!(witness_votes(&net, "witb"), stake);
    assert_eq!(witness_votes(&net, "witc"), stake);

    net.witness_vote("alice", "witc", false);
    assert_eq!(witness_votes(&net, "witc"), 0);
    assert_eq!(witness_votes(&net, "witb"), stake);
}

#[test]
fn hardfork_one_migrates_to_fair_division() {
    let mut config = ChainConfig::testing();
    // First hardfork triggers shortly after genesis; the second never.
    config.hardforks[0].time = config.genesis_time + 120;
    let mut net = governance_net(config);
    let stake = net.account("alice").witness_vote_stake();

    net.witness_vote("alice", "witb", true);
    net.witness_vote("alice", "witc", true);
    net.produce_block();
    assert_eq!(witness_votes(&net, "witb"), stake);
    assert_eq!(net.db.state().applied_hardforks(), 0);

    // Cross the trigger: the one-shot migration renormalizes every vote.
    net.skip_time(200);
    assert_eq!(net.db.state().applied_hardforks(), 1);
    assert_eq!(witness_votes(&net, "witb"), stake / 2);
    assert_eq!(witness_votes(&net, "witc"), stake / 2);
}

#[test]
fn hardfork_two_renormalizes_on_stake_change() {
    let mut config = ChainConfig::testing();
    config.hardforks[0].time = config.genesis_time + 60;
    config.hardforks[1].time = config.genesis_time + 90;
    let mut net = governance_net(config);

    net.witness_vote("alice", "witb", true);
    net.witness_vote("alice", "witc", true);
    net.skip_time(200);
    assert_eq!(net.db.state().applied_hardforks(), 2);

    let stake = net.account("alice").witness_vote_stake();
    assert_eq!(witness_votes(&net, "witb"), stake / 2);

    // More stake: under the renormalizing formula the standing votes
    // follow immediately.
    net.vest("alice", 10_000);
    net.produce_block();
    let new_stake = net.account("alice").witness_vote_stake();
    assert!(new_stake > stake);
    assert_eq!(witness_votes(&net, "witb"), new_stake / 2);
    assert_eq!(witness_votes(&net, "witc"), new_stake / 2);
}

#[test]
fn proxy_moves_weight_and_rejects_loops() {
    let mut net = governance_net(ChainConfig::testing());
    let alice_stake = net.account("alice").witness_vote_stake();
    let bob_stake = net.account("bob").witness_vote_stake();

    // bob votes, then alice proxies to bob: bob's votes carry both stakes.
    net.witness_vote("bob", "witb", true);
    assert_eq!(witness_votes(&net, "witb"), bob_stake);

    let op = Operation::AccountWitnessProxy(AccountWitnessProxyOperation {
        account: name("alice"),
        proxy: Some(name("bob")),
    });
    net.apply_ops(vec![op], &["alice-active"]);

    let bob = net.account("bob");
    assert_eq!(bob.proxied_vsf_votes[0], alice_stake);
    assert_eq!(witness_votes(&net, "witb"), bob_stake + alice_stake);

    // A proxied account cannot vote directly.
    let err = net
        .push_ops(
            vec![Operation::AccountWitnessVote(
                lib_protocol::operations::AccountWitnessVoteOperation {
                    account: name("alice"),
                    witness: name("witc"),
                    approve: true,
                },
            )],
            &["alice-active"],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::ProxiedAccountCannotVote,
            ..
        })
    ));

    // bob proxying back to alice would close a loop.
    let err = net
        .push_ops(
            vec![Operation::AccountWitnessProxy(AccountWitnessProxyOperation {
                account: name("bob"),
                proxy: Some(name("alice")),
            })],
            &["bob-active"],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ChainError::Block(BlockError::Evaluation {
            source: EvaluationError::ProxyLoop,
            ..
        })
    ));

    // Clearing the proxy pulls the weight back out.
    let op = Operation::AccountWitnessProxy(AccountWitnessProxyOperation {
        account: name("alice"),
        proxy: None,
    });
    net.apply_ops(vec![op], &["alice-active"]);
    assert_eq!(net.account("bob").proxied_vsf_votes[0], 0);
    assert_eq!(witness_votes(&net, "witb"), bob_stake);
}

#[test]
fn witness_vote_cap_is_hardfork_dependent() {
    let net = TestNet::new();
    let config = net.db.config();
    assert_eq!(config.witness_vote_cap(0), 30);
    assert_eq!(config.witness_vote_cap(1), 21);
}
