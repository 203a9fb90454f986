use tracing::debug;

use crate::common::{BlockId, CairnError, Result};
use crate::storage::block::BlockType;
use crate::storage::BlockStore;

use super::internal_block::InternalBlockRef;
use super::IndexHook;

/// Releases every block of an index tree, children before parents.
#[derive(Debug, Default)]
pub struct BlockIndexReclaimer {
    released: usize,
}

impl BlockIndexReclaimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total blocks released so far.
    pub fn released(&self) -> usize {
        self.released
    }

    fn reclaim(&mut self, store: &mut BlockStore, block: BlockId) -> Result<()> {
        match store.block_type(block)? {
            // already gone, e.g. a destroy that was interrupted
            BlockType::Unused => return Ok(()),
            BlockType::IndexLeaf => {}
            BlockType::IndexInternal => {
                let data = store.read_block(block)?;
                let children = InternalBlockRef::new(block, &data).children()?;
                for child in children {
                    self.reclaim(store, child)?;
                }
            }
            _ => return Err(CairnError::InvalidBlockType(block)),
        }
        store.release(block)?;
        self.released += 1;
        Ok(())
    }
}

impl IndexHook for BlockIndexReclaimer {
    fn destroy(&mut self, store: &mut BlockStore, root: BlockId) -> Result<()> {
        let before = self.released;
        self.reclaim(store, root)?;
        debug!(
            root = root.as_u32(),
            blocks = self.released - before,
            "destroyed index"
        );
        Ok(())
    }
}
