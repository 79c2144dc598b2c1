//! Overlap module: the index-overlap contract between partitions, an
//! in-memory implementation of it, and the delta rules used to fuse values
//! received from peers.

pub mod delta;
pub mod descriptor;
pub mod overlap;

pub use delta::SyncPolicy;
pub use descriptor::OverlapDescriptor;
pub use overlap::{DomesticOverlap, DomesticOverlapBuilder};
