pub mod block;
mod block_store;
pub mod disk;

pub use block_store::BlockStore;
