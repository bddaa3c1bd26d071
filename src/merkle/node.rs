use std::{collections::VecDeque, sync::Arc};

use crate::prelude::*;

/// One node of a binary hash tree. Built once by [`MerkleTree`](super::MerkleTree), never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleNode {
    digest: Hash,
    left: Option<Arc<MerkleNode>>,
    right: Option<Arc<MerkleNode>>,
}

impl MerkleNode {
    pub(crate) fn leaf(digest: Hash) -> Self {
        Self {
            digest,
            left: None,
            right: None,
        }
    }

    pub(crate) fn branch(
        provider: &(impl DigestProvider + ?Sized),
        left: Arc<MerkleNode>,
        right: Arc<MerkleNode>,
    ) -> Result<Self> {
        Ok(Self {
            digest: provider.combine(&left.digest, &right.digest)?,
            left: Some(left),
            right: Some(right),
        })
    }

    pub fn digest(&self) -> Hash {
        self.digest
    }

    pub fn left(&self) -> Option<&Arc<MerkleNode>> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&Arc<MerkleNode>> {
        self.right.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Number of levels below and including this node; a leaf has height 1.
    pub fn height(&self) -> usize {
        let left = self.left.as_ref().map_or(0, |node| node.height());
        let right = self.right.as_ref().map_or(0, |node| node.height());

        1 + left.max(right)
    }

    /// Digests of every leaf under this node, in breadth-first order.
    ///
    /// Synthetic duplicates created for odd levels show up here as leaves too.
    pub fn leaves(&self) -> Vec<Hash> {
        let mut leaves = Vec::new();
        let mut queue = VecDeque::from([self]);

        while let Some(node) = queue.pop_front() {
            if node.is_leaf() {
                leaves.push(node.digest);
            }
            queue.extend(node.left.as_deref());
            queue.extend(node.right.as_deref());
        }

        leaves
    }
}
