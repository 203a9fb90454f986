mod allocation_map;
mod header;
mod record_block;

pub use allocation_map::{AllocationMap, AllocationMapRef};
pub use header::{BlockHeader, BlockType};
pub use record_block::{slots_per_block, RecordBlock, RecordBlockRef, SLOT_OCCUPIED, SLOT_UNOCCUPIED};

pub(crate) use header::{read_i32, write_i32};
