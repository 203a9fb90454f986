use crate::common::{BlockId, CairnError, Result, ATTR_SIZE, BLOCK_SIZE, HEADER_SIZE};
use crate::storage::block::{read_i32, BlockHeader, BlockType};
#[cfg(test)]
use crate::storage::block::write_i32;

const LCHILD_OFFSET: usize = 0;
const KEY_OFFSET: usize = 4;
const RCHILD_OFFSET: usize = 4 + ATTR_SIZE;

/// lchild (4) + key (ATTR_SIZE) + rchild (4)
pub const INTERNAL_ENTRY_SIZE: usize = 8 + ATTR_SIZE;

pub const MAX_KEYS_INTERNAL: usize = (BLOCK_SIZE - HEADER_SIZE) / INTERNAL_ENTRY_SIZE;

/// One separator of an internal index block. Adjacent entries share a
/// child: entry `i`'s `rchild` is entry `i + 1`'s `lchild`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalEntry {
    pub lchild: BlockId,
    pub key: [u8; ATTR_SIZE],
    pub rchild: BlockId,
}

fn entry_offset(index: usize) -> usize {
    HEADER_SIZE + index * INTERNAL_ENTRY_SIZE
}

fn read_child(data: &[u8], offset: usize, block: BlockId) -> Result<BlockId> {
    BlockId::from_raw(read_i32(data, offset)).ok_or(CairnError::InvalidBlockType(block))
}

/// Mutable view of an internal index block. Index construction lives
/// outside this crate; the view only exists to lay down trees in tests.
#[cfg(test)]
pub struct InternalBlock<'a> {
    block: BlockId,
    data: &'a mut [u8],
}

#[cfg(test)]
impl<'a> InternalBlock<'a> {
    pub fn new(block: BlockId, data: &'a mut [u8]) -> Self {
        Self { block, data }
    }

    pub fn init(&mut self, pblock: Option<BlockId>) {
        self.data.fill(0);
        BlockHeader {
            block_type: BlockType::IndexInternal,
            pblock,
            lblock: None,
            rblock: None,
            num_entries: 0,
            num_attrs: 0,
            num_slots: 0,
        }
        .write_to(self.data);
    }

    /// Appends a separator, updating the entry count.
    pub fn push_entry(&mut self, entry: &InternalEntry) -> Result<()> {
        let mut header = BlockHeader::read_from(self.block, self.data)?;
        if header.num_entries >= MAX_KEYS_INTERNAL {
            return Err(CairnError::InvalidSlot {
                block: self.block,
                slot: header.num_entries,
            });
        }

        let offset = entry_offset(header.num_entries);
        write_i32(self.data, offset + LCHILD_OFFSET, entry.lchild.as_u32() as i32);
        self.data[offset + KEY_OFFSET..offset + KEY_OFFSET + ATTR_SIZE].copy_from_slice(&entry.key);
        write_i32(self.data, offset + RCHILD_OFFSET, entry.rchild.as_u32() as i32);

        header.num_entries += 1;
        header.write_to(self.data);
        Ok(())
    }
}

/// Read-only view of an internal index block.
pub struct InternalBlockRef<'a> {
    block: BlockId,
    data: &'a [u8],
}

impl<'a> InternalBlockRef<'a> {
    pub fn new(block: BlockId, data: &'a [u8]) -> Self {
        Self { block, data }
    }

    pub fn num_entries(&self) -> Result<usize> {
        let header = BlockHeader::read_from(self.block, self.data)?;
        if header.block_type != BlockType::IndexInternal {
            return Err(CairnError::InvalidBlockType(self.block));
        }
        Ok(header.num_entries.min(MAX_KEYS_INTERNAL))
    }

    pub fn entry(&self, index: usize) -> Result<InternalEntry> {
        let offset = entry_offset(index);
        let mut key = [0u8; ATTR_SIZE];
        key.copy_from_slice(&self.data[offset + KEY_OFFSET..offset + KEY_OFFSET + ATTR_SIZE]);
        Ok(InternalEntry {
            lchild: read_child(self.data, offset + LCHILD_OFFSET, self.block)?,
            key,
            rchild: read_child(self.data, offset + RCHILD_OFFSET, self.block)?,
        })
    }

    /// All children in key order: the first entry's left child, then every
    /// entry's right child.
    pub fn children(&self) -> Result<Vec<BlockId>> {
        let num_entries = self.num_entries()?;
        let mut children = Vec::with_capacity(num_entries + 1);
        for i in 0..num_entries {
            let entry = self.entry(i)?;
            if i == 0 {
                children.push(entry.lchild);
            }
            children.push(entry.rchild);
        }
        Ok(children)
    }
}
