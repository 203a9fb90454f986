//! Index teardown. Building and searching indexes happens elsewhere; this
//! module only knows enough of the block layout to release a whole tree
//! when the relation that owns it is deleted.

mod internal_block;
mod reclaimer;

pub use internal_block::{InternalBlockRef, InternalEntry, INTERNAL_ENTRY_SIZE, MAX_KEYS_INTERNAL};
pub use reclaimer::BlockIndexReclaimer;

use crate::common::{BlockId, Result};
use crate::storage::BlockStore;

/// Called by relation deletion for every attribute that carries an index.
pub trait IndexHook {
    /// Releases every block of the index rooted at `root`.
    fn destroy(&mut self, store: &mut BlockStore, root: BlockId) -> Result<()>;
}
