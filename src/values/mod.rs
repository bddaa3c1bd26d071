mod block;
mod timestamp;
mod transaction;

pub use {block::*, timestamp::*, transaction::*};
