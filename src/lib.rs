mod error;

pub mod collections;
pub mod config;
pub mod hash;
pub mod merkle;
pub mod prelude;
pub mod testing;
pub mod values;

#[doc(hidden)]
/// This is a hidden module to make the macros defined on this crate available for the users.
pub mod __dependencies {
    pub use paste;
    pub use proptest;
    pub use test_strategy;
}

/// Generates the behaviour every [`BlockIndex`](crate::prelude::BlockIndex) must share, whatever
/// its internal layout: inserted blocks are found, absent ones are not, and lookups agree with a
/// plain scan of the inserted identifiers.
#[macro_export]
macro_rules! test_block_index_properties {
    ($type:ty) => {
        $crate::__dependencies::paste::paste! {
            mod [<test_block_index_$type:snake>] {
                use $crate::__dependencies::{
                    proptest::prelude::*,
                    test_strategy,
                };
                use $crate::prelude::{Block, BlockIndex, Result};
                use $crate::testing::{block_ids, blocks, missing_id, search_sequence};

                use super::$type;

                #[cfg_attr(coverage_nightly, coverage(off))]
                fn filled(ids: &[u64]) -> Result<$type> {
                    blocks(ids)?
                        .into_iter()
                        .try_fold(<$type>::default(), |mut index, block| {
                            BlockIndex::insert(&mut index, block);
                            Ok(index)
                        })
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_every_inserted_block_is_found(
                    #[strategy(block_ids(0..60))] ids: Vec<u64>,
                ) {
                    let mut index = filled(&ids)?;

                    prop_assert_eq!(BlockIndex::len(&index), ids.len());
                    prop_assert_eq!(BlockIndex::is_empty(&index), ids.is_empty());

                    for id in ids {
                        let found = BlockIndex::search(&mut index, id);
                        prop_assert_eq!(found.as_deref().map(Block::id), Some(id));
                    }
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_absent_block_is_not_found(
                    #[strategy(block_ids(0..60))] ids: Vec<u64>,
                    #[strategy(missing_id())] missing: u64,
                ) {
                    let mut index = filled(&ids)?;

                    prop_assert!(BlockIndex::search(&mut index, missing).is_none());
                    prop_assert_eq!(BlockIndex::len(&index), ids.len());
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_clustered_searches_agree_with_a_scan(
                    #[strategy(block_ids(1..60).prop_flat_map(|ids| {
                        (Just(ids.clone()), search_sequence(ids, 0..40))
                    }))]
                    case: (Vec<u64>, Vec<u64>),
                ) {
                    let (ids, searches) = case;
                    let mut index = filled(&ids)?;

                    for id in searches {
                        let found = BlockIndex::search(&mut index, id);
                        prop_assert_eq!(found.is_some(), ids.contains(&id));
                    }
                }
            }
        }
    };
}

#[macro_export]
macro_rules! prop_assert_does_not_change {
    ($action: expr, $value: expr) => {
        let old_value = $value.clone();

        $action;

        prop_assert_eq!($value, old_value);
    };
}
