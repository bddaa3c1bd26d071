use std::sync::{Arc, Weak};

use uuid::Uuid;

use crate::prelude::*;

/// One content record held by a block.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: Uuid,
    created_at: Timestamp,
    content: String,
    digest: Hash,
    /// Set by the Merkle builder. The tree owns its nodes; this is only a lookup handle.
    leaf: Weak<MerkleNode>,
}

impl Transaction {
    pub fn new(provider: &impl DigestProvider, content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        let digest = provider.hash(&content)?;

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Timestamp::now(),
            content,
            digest,
            leaf: Weak::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn digest(&self) -> Hash {
        self.digest
    }

    /// The Merkle leaf built for this record, if a tree was built and is still alive.
    pub fn leaf(&self) -> Option<Arc<MerkleNode>> {
        self.leaf.upgrade()
    }

    pub(crate) fn attach_leaf(&mut self, leaf: &Arc<MerkleNode>) {
        self.leaf = Arc::downgrade(leaf);
    }
}

#[cfg(all(
    test,
    any(feature = "sha2", feature = "blake2", feature = "blake3")
))]
mod tests {
    use super::*;
    use crate::testing::provider;

    const ALGORITHM: HashAlgorithm = provider();

    #[test]
    fn test_digest_is_hash_of_content() {
        let tx = Transaction::new(&ALGORITHM, "pay bob 5").unwrap();

        assert_eq!(tx.content(), "pay bob 5");
        assert_eq!(tx.digest(), ALGORITHM.hash("pay bob 5").unwrap());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Transaction::new(&ALGORITHM, "same").unwrap();
        let b = Transaction::new(&ALGORITHM, "same").unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.digest(), b.digest());
        assert!(a.created_at() < b.created_at());
    }

    #[test]
    fn test_leaf_is_empty_before_tree_is_built() {
        let tx = Transaction::new(&ALGORITHM, "x").unwrap();
        assert!(tx.leaf().is_none());
    }
}
