#![cfg(any(feature = "sha2", feature = "blake2", feature = "blake3"))]

use std::sync::{Arc, Once};

use splay_ledger::{prelude::*, testing::provider};
use tracing_subscriber::EnvFilter;

const ALGORITHM: HashAlgorithm = provider();

fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn block(id: u64, contents: &[&str]) -> Arc<Block> {
    let transactions = contents
        .iter()
        .map(|content| Transaction::new(&ALGORITHM, *content))
        .collect::<Result<Vec<_>>>()
        .unwrap();

    Arc::new(Block::with_id(&ALGORITHM, id, None, transactions).unwrap())
}

#[test]
fn splay_index_follows_the_access_pattern() {
    init_tracing();
    let mut index = SplayIndex::new();

    for id in [10, 20, 5, 15] {
        index.insert(block(id, &[]));
    }
    assert_eq!(index.root().map(|b| b.id()), Some(15));

    let found = index.search(5).unwrap();
    assert_eq!(found.id(), 5);
    assert_eq!(index.root().map(|b| b.id()), Some(5));

    let before = index.clone();
    assert!(index.search(99).is_none());
    assert_eq!(index.root().map(|b| b.id()), Some(5));
    assert_eq!(index, before);

    let ids: Vec<u64> = index.iter().map(|b| b.id()).collect();
    assert_eq!(ids, vec![5, 10, 15, 20]);
}

#[test]
fn merkle_root_of_four_records_is_balanced() {
    init_tracing();
    let h = |text: &str| ALGORITHM.hash(text).unwrap();
    let join = |left: Hash, right: Hash| ALGORITHM.combine(&left, &right).unwrap();

    let block = block(1, &["a", "b", "c", "d"]);
    let root = block.merkle_root().unwrap();

    assert_eq!(
        root.digest(),
        join(join(h("a"), h("b")), join(h("c"), h("d")))
    );
    assert_eq!(root.leaves().len(), 4);
}

// The default configuration selects SHA-256.
#[cfg(feature = "sha2")]
#[test]
fn blocks_chain_through_predecessor_digests() {
    init_tracing();
    let provider = Config::default().provider();

    let genesis = Block::new(&provider, None, vec![]).unwrap();
    let next = Block::new(
        &provider,
        Some(genesis.digest()),
        vec![Transaction::new(&provider, "transfer").unwrap()],
    )
    .unwrap();

    assert!(genesis.id() < next.id());
    assert_eq!(next.predecessor(), Some(genesis.digest()));
    assert_eq!(genesis.digest(), provider.hash(&genesis.id().to_string()).unwrap());
}

#[test]
fn both_indexes_share_blocks_and_answer_alike() {
    init_tracing();
    let shared: Vec<Arc<Block>> = (0..50u64).map(|i| block(i * 7 % 50, &[])).collect();

    let mut chain = ChainIndex::new();
    let mut splay = SplayIndex::new();
    for block in &shared {
        BlockIndex::insert(&mut chain, Arc::clone(block));
        BlockIndex::insert(&mut splay, Arc::clone(block));
    }

    for id in [3, 3, 3, 42, 42, 0, 49, 77] {
        let from_chain = BlockIndex::search(&mut chain, id);
        let from_splay = BlockIndex::search(&mut splay, id);

        assert_eq!(from_chain.map(|b| b.id()), from_splay.map(|b| b.id()));
    }
    assert_eq!(BlockIndex::len(&chain), BlockIndex::len(&splay));
}

#[test]
fn unavailable_algorithm_surfaces_unchanged() {
    for algorithm in HashAlgorithm::ALL {
        if algorithm.is_available() {
            continue;
        }

        assert_eq!(
            Transaction::new(&algorithm, "x").unwrap_err(),
            Error::DigestUnavailable(algorithm)
        );
        assert_eq!(
            Block::with_id(&algorithm, 1, None, vec![]).unwrap_err(),
            Error::DigestUnavailable(algorithm)
        );
    }
}
