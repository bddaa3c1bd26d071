mod node;

use std::sync::Arc;

use tracing::debug;

use crate::prelude::*;

pub use node::MerkleNode;

/// Builds binary hash trees over ordered content records.
///
/// Leaves hold `hash(content)`; every parent holds `hash(left ++ right)` over the hex text of its
/// children. Levels are paired left to right. When a level has an odd number of nodes, the last
/// one is paired with a fresh copy of itself, at every level where that happens, so the shape of
/// the tree depends only on the number of records.
pub struct MerkleTree<'a, P: DigestProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: DigestProvider + ?Sized> MerkleTree<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Builds the tree over `transactions` and returns its root, or `None` for no records.
    ///
    /// Each record gets a weak reference to its leaf, but only once the whole tree was built; on a
    /// digest failure no record is touched.
    pub fn build(&self, transactions: &mut [Transaction]) -> Result<Option<Arc<MerkleNode>>> {
        let leaves = transactions
            .iter()
            .map(|tx| self.leaf(tx.content()))
            .collect::<Result<Vec<_>>>()?;

        let root = self.build_levels(leaves.clone())?;

        for (tx, leaf) in transactions.iter_mut().zip(&leaves) {
            tx.attach_leaf(leaf);
        }

        Ok(root)
    }

    /// Root digest over plain content strings, without any records to link back to.
    pub fn root_of<S: AsRef<str>>(&self, contents: &[S]) -> Result<Option<Hash>> {
        let leaves = contents
            .iter()
            .map(|content| self.leaf(content.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(self.build_levels(leaves)?.map(|root| root.digest()))
    }

    fn leaf(&self, content: &str) -> Result<Arc<MerkleNode>> {
        Ok(Arc::new(MerkleNode::leaf(self.provider.hash(content)?)))
    }

    fn build_levels(&self, mut level: Vec<Arc<MerkleNode>>) -> Result<Option<Arc<MerkleNode>>> {
        let records = level.len();
        let mut depth = 0;

        while level.len() > 1 {
            let mut parents = Vec::with_capacity(level.len().div_ceil(2));

            for pair in level.chunks(2) {
                let left = Arc::clone(&pair[0]);
                let right = match pair.get(1) {
                    Some(right) => Arc::clone(right),
                    // Odd remainder: pair with a copy, never with the same node.
                    None => Arc::new(MerkleNode::leaf(left.digest())),
                };

                parents.push(Arc::new(MerkleNode::branch(self.provider, left, right)?));
            }

            level = parents;
            depth += 1;
        }

        let root = level.pop();

        if let Some(root) = &root {
            debug!(records, depth, root = %root.digest(), "built merkle tree");
        }

        Ok(root)
    }
}

#[cfg(all(
    test,
    any(feature = "sha2", feature = "blake2", feature = "blake3")
))]
mod tests {
    use proptest::{collection::vec, prelude::*};
    use test_strategy::proptest;

    use super::*;
    use crate::testing::{contents, provider};

    const ALGORITHM: HashAlgorithm = provider();

    fn h(text: &str) -> Hash {
        ALGORITHM.hash(text).unwrap()
    }

    fn join(left: Hash, right: Hash) -> Hash {
        ALGORITHM.combine(&left, &right).unwrap()
    }

    fn records(contents: &[&str]) -> Vec<Transaction> {
        contents
            .iter()
            .map(|content| Transaction::new(&ALGORITHM, *content).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_input_has_no_root() {
        let tree = MerkleTree::new(&ALGORITHM);

        assert_eq!(tree.build(&mut []).unwrap(), None);
        assert_eq!(tree.root_of::<&str>(&[]).unwrap(), None);
    }

    #[test]
    fn test_single_record_root_is_its_leaf() {
        let mut txs = records(&["a"]);
        let root = MerkleTree::new(&ALGORITHM).build(&mut txs).unwrap().unwrap();

        assert!(root.is_leaf());
        assert_eq!(root.digest(), h("a"));
        assert!(Arc::ptr_eq(&root, &txs[0].leaf().unwrap()));
    }

    #[test]
    fn test_four_records_form_a_balanced_tree() {
        let root = MerkleTree::new(&ALGORITHM)
            .build(&mut records(&["a", "b", "c", "d"]))
            .unwrap()
            .unwrap();

        let expected = join(join(h("a"), h("b")), join(h("c"), h("d")));

        assert_eq!(root.digest(), expected);
        assert_eq!(root.height(), 3);
        assert_eq!(root.leaves(), vec![h("a"), h("b"), h("c"), h("d")]);
    }

    #[test]
    fn test_odd_leaf_is_paired_with_a_copy() {
        let root = MerkleTree::new(&ALGORITHM)
            .build(&mut records(&["a", "b", "c"]))
            .unwrap()
            .unwrap();

        let expected = join(join(h("a"), h("b")), join(h("c"), h("c")));
        assert_eq!(root.digest(), expected);

        let right = root.right().unwrap();
        let (c, copy) = (right.left().unwrap(), right.right().unwrap());
        assert_eq!(c.digest(), copy.digest());
        assert!(!Arc::ptr_eq(c, copy));
        assert_eq!(root.leaves(), vec![h("a"), h("b"), h("c"), h("c")]);
    }

    #[test]
    fn test_odd_remainders_are_duplicated_at_every_level() {
        // 5 leaves -> 3 parents (e duplicated) -> 2 (third parent duplicated) -> root.
        let root = MerkleTree::new(&ALGORITHM)
            .root_of(&["a", "b", "c", "d", "e"])
            .unwrap()
            .unwrap();

        let ab = join(h("a"), h("b"));
        let cd = join(h("c"), h("d"));
        let ee = join(h("e"), h("e"));
        let expected = join(join(ab, cd), join(ee, ee));

        assert_eq!(root, expected);
    }

    #[test]
    fn test_leaves_are_linked_back_to_records() {
        let mut txs = records(&["a", "b", "c"]);
        let root = MerkleTree::new(&ALGORITHM).build(&mut txs).unwrap();

        for tx in &txs {
            let leaf = tx.leaf().unwrap();
            assert!(leaf.is_leaf());
            assert_eq!(leaf.digest(), tx.digest());
        }

        drop(root);
        assert!(txs.iter().all(|tx| tx.leaf().is_none()));
    }

    #[test]
    fn test_failure_leaves_records_untouched() {
        struct FailsOnCombine;

        impl DigestProvider for FailsOnCombine {
            fn hash(&self, text: &str) -> Result<Hash> {
                if text.len() == 128 {
                    Err(Error::DigestUnavailable(HashAlgorithm::Blake2s))
                } else {
                    ALGORITHM.hash(text)
                }
            }
        }

        let mut txs = records(&["a", "b"]);
        let result = MerkleTree::new(&FailsOnCombine).build(&mut txs);

        assert_eq!(result, Err(Error::DigestUnavailable(HashAlgorithm::Blake2s)));
        assert!(txs.iter().all(|tx| tx.leaf().is_none()));
    }

    #[proptest(fork = false)]
    fn test_build_is_deterministic(#[strategy(contents(0..40))] contents: Vec<String>) {
        let tree = MerkleTree::new(&ALGORITHM);
        prop_assert_eq!(tree.root_of(&contents)?, tree.root_of(&contents)?);
    }

    #[proptest(fork = false)]
    fn test_any_content_change_changes_the_root(
        #[strategy(contents(1..40))] contents: Vec<String>,
        index: prop::sample::Index,
        suffix: char,
    ) {
        let tree = MerkleTree::new(&ALGORITHM);
        let mut changed = contents.clone();
        changed[index.index(contents.len())].push(suffix);

        prop_assert_ne!(tree.root_of(&contents)?, tree.root_of(&changed)?);
    }

    #[proptest(fork = false)]
    fn test_height_grows_with_log_of_records(
        #[strategy(vec("[a-z]{1,4}", 1..40))] contents: Vec<String>,
    ) {
        let mut txs = contents
            .iter()
            .map(|content| Transaction::new(&ALGORITHM, content.as_str()))
            .collect::<Result<Vec<_>>>()?;
        let root = MerkleTree::new(&ALGORITHM).build(&mut txs)?.unwrap();
        let levels = contents.len().next_power_of_two().trailing_zeros() as usize;

        prop_assert!(root.leaves().len() >= contents.len());
        prop_assert_eq!(root.height(), levels + 1);
    }
}
