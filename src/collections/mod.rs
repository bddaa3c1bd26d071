mod chain;
mod splay;

pub use {
    chain::{ChainIndex, ChainNode},
    splay::{SplayIndex, SplayNode},
};

/// Stable handle of a node inside an index arena.
///
/// Handles are only meaningful for the index that issued them; nodes are never removed, so a handle
/// stays valid for the lifetime of its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}
