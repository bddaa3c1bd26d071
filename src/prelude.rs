use std::sync::Arc;

pub use crate::{
    collections::*, config::*, error::*, hash::*, merkle::*, values::*,
};

/// An in-memory lookup structure for blocks, keyed by block identifier.
///
/// Implementations own their own link structure and only share the block payload through an
/// [`Arc`], so the same block may sit in several indexes at once.
pub trait BlockIndex: Default {
    fn insert(&mut self, block: Arc<Block>);

    /// Looks up a block by identifier. A miss is a normal outcome, not an error.
    fn search(&mut self, id: u64) -> Option<Arc<Block>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
