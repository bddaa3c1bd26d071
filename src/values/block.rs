use std::{
    cmp::Ordering,
    hash::{Hash as StdHash, Hasher},
    sync::Arc,
};

use crate::prelude::*;

/// A block record: identifier, digests, and the content records it carries.
///
/// Blocks are immutable once built. Index structures hold them behind an [`Arc`] and keep their
/// own links, so nothing about a block changes when it is inserted somewhere.
#[derive(Debug, Clone)]
pub struct Block {
    id: u64,
    digest: Hash,
    predecessor: Option<Hash>,
    created_at: Timestamp,
    merkle_root: Option<Arc<MerkleNode>>,
    transactions: Vec<Transaction>,
}

impl Block {
    /// Builds a block whose identifier is a reading of the monotonic clock.
    pub fn new(
        provider: &impl DigestProvider,
        predecessor: Option<Hash>,
        transactions: Vec<Transaction>,
    ) -> Result<Self> {
        Self::with_id(provider, Timestamp::now().as_nanos(), predecessor, transactions)
    }

    pub fn with_id(
        provider: &impl DigestProvider,
        id: u64,
        predecessor: Option<Hash>,
        mut transactions: Vec<Transaction>,
    ) -> Result<Self> {
        // The block digest covers the identifier only; contents are covered by the Merkle root.
        let digest = provider.hash(&id.to_string())?;
        let merkle_root = MerkleTree::new(provider).build(&mut transactions)?;

        Ok(Self {
            id,
            digest,
            predecessor,
            created_at: Timestamp::now(),
            merkle_root,
            transactions,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn digest(&self) -> Hash {
        self.digest
    }

    pub fn predecessor(&self) -> Option<Hash> {
        self.predecessor
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn merkle_root(&self) -> Option<&Arc<MerkleNode>> {
        self.merkle_root.as_ref()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Block {}

impl PartialOrd for Block {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Block {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl StdHash for Block {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(all(
    test,
    any(feature = "sha2", feature = "blake2", feature = "blake3")
))]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::testing::provider;

    const ALGORITHM: HashAlgorithm = provider();

    fn records(contents: &[&str]) -> Vec<Transaction> {
        contents
            .iter()
            .map(|content| Transaction::new(&ALGORITHM, *content).unwrap())
            .collect()
    }

    #[test]
    fn test_digest_covers_the_decimal_identifier() {
        let block = Block::with_id(&ALGORITHM, 42, None, vec![]).unwrap();

        assert_eq!(block.id(), 42);
        assert_eq!(block.digest(), ALGORITHM.hash("42").unwrap());
        assert!(block.predecessor().is_none());
    }

    #[test]
    fn test_empty_block_has_no_merkle_root() {
        let block = Block::with_id(&ALGORITHM, 1, None, vec![]).unwrap();
        assert!(block.merkle_root().is_none());
        assert!(block.transactions().is_empty());
    }

    #[test]
    fn test_merkle_root_covers_transactions() {
        let block = Block::with_id(&ALGORITHM, 7, None, records(&["a", "b", "c", "d"])).unwrap();
        let expected = MerkleTree::new(&ALGORITHM).root_of(&["a", "b", "c", "d"]).unwrap();

        assert_eq!(block.merkle_root().map(|root| root.digest()), expected);
        for tx in block.transactions() {
            assert_eq!(tx.leaf().map(|leaf| leaf.digest()), Some(tx.digest()));
        }
    }

    #[test]
    fn test_predecessor_is_kept() {
        let genesis = Block::with_id(&ALGORITHM, 1, None, vec![]).unwrap();
        let next = Block::with_id(&ALGORITHM, 2, Some(genesis.digest()), vec![]).unwrap();

        assert_eq!(next.predecessor(), Some(genesis.digest()));
    }

    #[test]
    fn test_clock_identifiers_increase() {
        let first = Block::new(&ALGORITHM, None, vec![]).unwrap();
        let second = Block::new(&ALGORITHM, Some(first.digest()), vec![]).unwrap();

        assert!(first < second);
    }

    #[test]
    fn test_unavailable_digest_fails_construction() {
        struct Missing;

        impl DigestProvider for Missing {
            fn hash(&self, _text: &str) -> Result<Hash> {
                Err(Error::DigestUnavailable(HashAlgorithm::Blake3))
            }
        }

        assert_eq!(
            Block::with_id(&Missing, 1, None, vec![]),
            Err(Error::DigestUnavailable(HashAlgorithm::Blake3))
        );
    }

    #[proptest(fork = false)]
    fn test_ordering_follows_identifiers(a: u64, b: u64) {
        let left = Block::with_id(&ALGORITHM, a, None, vec![])?;
        let right = Block::with_id(&ALGORITHM, b, None, vec![])?;

        prop_assert_eq!(left.cmp(&right), a.cmp(&b));
        prop_assert_eq!(left == right, a == b);
    }

    #[proptest(fork = false)]
    fn test_equality_ignores_contents(id: u64, content: String) {
        let plain = Block::with_id(&ALGORITHM, id, None, vec![])?;
        let full = Block::with_id(&ALGORITHM, id, None, vec![Transaction::new(&ALGORITHM, content)?])?;

        prop_assert_eq!(plain, full);
    }
}
