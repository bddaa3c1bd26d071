use std::sync::Arc;

use tracing::{debug, trace};

use super::NodeId;
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ChainNode {
    block: Arc<Block>,
    next: Option<NodeId>,
}

impl ChainNode {
    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn next(&self) -> Option<NodeId> {
        self.next
    }
}

/// Blocks linked in insertion order and searched by linear scan.
///
/// This is the baseline the [`SplayIndex`] is measured against: appends are constant time,
/// lookups walk from the head and never reorder anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainIndex {
    nodes: Vec<ChainNode>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl ChainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<&Arc<Block>> {
        self.head.map(|id| &self.nodes[id.0].block)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Blocks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Block>> + '_ {
        std::iter::successors(self.head, |id| self.nodes[id.0].next)
            .map(|id| &self.nodes[id.0].block)
    }

    pub fn insert(&mut self, block: Arc<Block>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ChainNode { block, next: None });

        match self.tail {
            None => self.head = Some(id),
            Some(tail) => self.nodes[tail.0].next = Some(id),
        }
        self.tail = Some(id);
        debug!(
            block = self.nodes[id.0].block.id(),
            size = self.len(),
            "inserted block into chain index"
        );

        id
    }

    /// First block, in insertion order, whose identifier is `key`.
    pub fn search(&self, key: u64) -> Option<Arc<Block>> {
        let found = self.iter().find(|block| block.id() == key).cloned();
        trace!(block = key, hit = found.is_some(), "chain index scan");

        found
    }
}

impl BlockIndex for ChainIndex {
    fn insert(&mut self, block: Arc<Block>) {
        ChainIndex::insert(self, block);
    }

    fn search(&mut self, id: u64) -> Option<Arc<Block>> {
        ChainIndex::search(self, id)
    }

    fn len(&self) -> usize {
        ChainIndex::len(self)
    }
}

#[cfg(all(
    test,
    any(feature = "sha2", feature = "blake2", feature = "blake3")
))]
mod tests {
    use proptest::prelude::*;
    use test_strategy::proptest;

    use std::{io, sync::Mutex};

    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::{prop_assert_does_not_change, testing::*};

    crate::test_block_index_properties!(ChainIndex);

    fn chain_of(ids: &[u64]) -> ChainIndex {
        let mut chain = ChainIndex::new();
        for block in blocks(ids).unwrap() {
            chain.insert(block);
        }
        chain
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_insert_emits_debug_event() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();
        let block = blocks(&[7]).unwrap().remove(0);

        tracing::subscriber::with_default(subscriber, || {
            ChainIndex::new().insert(block);
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("inserted block into chain index"));
        assert!(output.contains("block=7"));
        assert!(output.contains("size=1"));
    }

    #[test]
    fn test_keeps_insertion_order() {
        let chain = chain_of(&[10, 20, 5, 15]);

        assert_eq!(chain.head().map(|b| b.id()), Some(10));
        assert_eq!(
            chain.iter().map(|b| b.id()).collect::<Vec<_>>(),
            vec![10, 20, 5, 15]
        );
    }

    #[test]
    fn test_search_returns_first_duplicate() {
        let mut chain = ChainIndex::new();
        let first = blocks(&[7]).unwrap().remove(0);
        let second = blocks(&[7]).unwrap().remove(0);

        chain.insert(Arc::clone(&first));
        chain.insert(second);

        assert!(Arc::ptr_eq(&chain.search(7).unwrap(), &first));
    }

    #[test]
    fn test_same_block_in_both_indexes() {
        let shared = blocks(&[1, 2, 3]).unwrap();
        let mut chain = ChainIndex::new();
        let mut splay = SplayIndex::new();

        for block in &shared {
            chain.insert(Arc::clone(block));
            splay.insert(Arc::clone(block));
        }
        splay.search(1);

        assert_eq!(
            chain.iter().map(|b| b.id()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(Arc::ptr_eq(&chain.search(1).unwrap(), &splay.search(1).unwrap()));
    }

    #[proptest(fork = false)]
    fn test_search_never_reorders(
        #[strategy(block_ids(0..60))] existing: Vec<u64>,
        probe: u64,
    ) {
        let chain = chain_of(&existing);

        prop_assert_does_not_change!(chain.search(probe), chain);
    }
}
