//! Durable-layout property: replaying the block log reconstructs the exact
//! head state.

mod common;

use common::{name, TestNet};
use lib_chain::{ChainConfig, Database, SledBlockLog};
use lib_protocol::HashSigner;

#[test]
fn sled_log_replay_reaches_the_same_head() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("block_log");
    let config = ChainConfig::testing();

    let (head_num, head_id, supply, alice_balance) = {
        let block_log = SledBlockLog::open(&log_path).unwrap();
        let db = Database::open(config.clone(), Box::new(block_log), Box::new(HashSigner)).unwrap();
        let mut net = TestNet { db };

        net.create_account("alice");
        net.fund("alice", 12_345);
        net.produce_blocks(5);
        net.post("alice", "persisted");
        net.produce_blocks(3);

        // Single-witness chain: every block is irreversible and logged.
        let global = net.db.state().global();
        assert_eq!(net.db.block_log().head_num().unwrap(), global.head_block_number);
        (
            global.head_block_number,
            global.head_block_id,
            global.current_supply,
            net.balance("alice"),
        )
    };

    // A fresh node over the same log must converge bit-for-bit.
    let block_log = SledBlockLog::open(&log_path).unwrap();
    let mut db = Database::open(config, Box::new(block_log), Box::new(HashSigner)).unwrap();
    let replayed = db.replay_block_log().unwrap();

    assert_eq!(replayed, head_num);
    assert_eq!(db.head_block_num(), head_num);
    assert_eq!(db.head_block_id(), head_id);
    assert_eq!(db.state().global().current_supply, supply);
    assert_eq!(
        db.state().get_account(&name("alice")).unwrap().balance.amount,
        alice_balance
    );
    assert!(db
        .state()
        .get_content(&name("alice"), "persisted")
        .is_ok());
}
