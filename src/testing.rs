use std::sync::Arc;

use proptest::{
    collection::vec,
    prelude::*,
    sample::{select, SizeRange},
};

use crate::prelude::*;

/// Upper bound (exclusive) of identifiers produced by [`block_ids`].
pub const MAX_GENERATED_ID: u64 = 1_000;

/// Short printable record contents, empty strings included.
pub fn contents(size: impl Into<SizeRange>) -> impl Strategy<Value = Vec<String>> {
    vec("[ -~]{0,24}", size)
}

/// Identifiers drawn from a narrow range, so duplicates and search hits are common.
pub fn block_ids(size: impl Into<SizeRange>) -> impl Strategy<Value = Vec<u64>> {
    vec(0..MAX_GENERATED_ID, size)
}

/// An identifier [`block_ids`] never produces.
pub fn missing_id() -> impl Strategy<Value = u64> {
    MAX_GENERATED_ID..u64::MAX
}

/// Searches concentrated on a few "hot" identifiers out of `ids`, with occasional misses.
pub fn search_sequence(ids: Vec<u64>, size: impl Into<SizeRange>) -> BoxedStrategy<Vec<u64>> {
    if ids.is_empty() {
        return vec(missing_id(), size).boxed();
    }

    let hot: Vec<u64> = ids.into_iter().take(3).collect();

    vec(
        prop_oneof![
            8 => select(hot),
            1 => missing_id(),
        ],
        size,
    )
    .boxed()
}

/// The first digest algorithm compiled into this build, falling back to the default.
pub const fn provider() -> HashAlgorithm {
    if cfg!(feature = "sha2") {
        HashAlgorithm::Sha256
    } else if cfg!(feature = "blake2") {
        HashAlgorithm::Blake2s
    } else if cfg!(feature = "blake3") {
        HashAlgorithm::Blake3
    } else {
        HashAlgorithm::Sha256
    }
}

/// Empty blocks with the given identifiers, in order.
pub fn blocks(ids: &[u64]) -> Result<Vec<Arc<Block>>> {
    let provider = provider();

    ids.iter()
        .map(|id| Block::with_id(&provider, *id, None, Vec::new()).map(Arc::new))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_is_available_when_any_algorithm_is() {
        let available = HashAlgorithm::available();

        if available.is_empty() {
            assert_eq!(provider(), HashAlgorithm::default());
        } else {
            assert_eq!(provider(), available[0]);
        }
    }
}
