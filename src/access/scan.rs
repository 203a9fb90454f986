use crate::common::{BlockId, RecordId, RelId};

/// Where a scan picks up on its next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPosition {
    /// First block of the relation, slot 0
    Start,
    /// The slot after this record
    After(RecordId),
    /// Slot 0 of this block
    BlockStart(BlockId),
}

/// A resumable linear-scan cursor over one relation's block chain.
///
/// A scan only moves forward, in block-chain then slot order. Independent
/// scans need independent cursors: create a new one (or `reset` an old one)
/// rather than sharing a position between unrelated searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationScan {
    rel: RelId,
    position: ScanPosition,
}

/// A block that was unlinked from a chain, with its neighbours at the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplicedBlock {
    pub block: BlockId,
    pub lblock: Option<BlockId>,
    pub rblock: Option<BlockId>,
    /// Slot count of the left neighbour, used to park a scan after its last slot
    pub left_slots: usize,
}

impl RelationScan {
    /// Creates a cursor positioned before the first record of `rel`.
    pub fn new(rel: RelId) -> Self {
        Self {
            rel,
            position: ScanPosition::Start,
        }
    }

    pub fn rel_id(&self) -> RelId {
        self.rel
    }

    /// Moves the cursor back before the first record.
    pub fn reset(&mut self) {
        self.position = ScanPosition::Start;
    }

    /// Records `rid` as the last match; the next step resumes after it.
    pub fn advance_to(&mut self, rid: RecordId) {
        self.position = ScanPosition::After(rid);
    }

    /// Returns the last matched record, if the cursor sits after one.
    ///
    /// A cursor moved to the head of a neighbouring block after its block was
    /// released has no last match and returns `None` while still being mid
    /// chain; use `is_at_start` to tell the two apart.
    pub fn position(&self) -> Option<RecordId> {
        match self.position {
            ScanPosition::After(rid) => Some(rid),
            _ => None,
        }
    }

    /// True if the next step starts from the relation's first record.
    pub fn is_at_start(&self) -> bool {
        self.position == ScanPosition::Start
    }

    /// Returns the block and slot the next step starts from, given the
    /// relation's first block.
    pub(crate) fn resume_point(&self, first_blk: Option<BlockId>) -> (Option<BlockId>, usize) {
        match self.position {
            ScanPosition::Start => (first_blk, 0),
            ScanPosition::After(rid) => (Some(rid.block), rid.slot + 1),
            ScanPosition::BlockStart(block) => (Some(block), 0),
        }
    }

    /// Keeps the cursor valid after `spliced` was released from the chain.
    /// A cursor inside the released block moves to the right neighbour, or
    /// past the end of the left neighbour when there is none, so records
    /// appended later are still found.
    pub(crate) fn relink(&mut self, spliced: &SplicedBlock) {
        let inside = match self.position {
            ScanPosition::After(rid) => rid.block == spliced.block,
            ScanPosition::BlockStart(block) => block == spliced.block,
            ScanPosition::Start => false,
        };
        if !inside {
            return;
        }

        self.position = match (spliced.rblock, spliced.lblock) {
            (Some(right), _) => ScanPosition::BlockStart(right),
            (None, Some(left)) if spliced.left_slots > 0 => {
                ScanPosition::After(RecordId::new(left, spliced.left_slots - 1))
            }
            _ => ScanPosition::Start,
        };
    }
}
