//! Block vectors over overlapping domain partitions.

pub mod block;
pub mod overlapping_block_vector;

pub use block::BlockValue;
pub use overlapping_block_vector::OverlappingBlockVector;
