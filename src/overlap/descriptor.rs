//! The index-overlap contract consumed by the overlapping block vector.
//!
//! A partition sees three index spaces: *domestic* (local rows including the
//! overlap), *native* (local rows of the non-overlapping system) and *global*
//! (mesh-wide). Every native index maps to exactly one domestic index and every
//! domestic index to exactly one global index; the reverse maps are partial.

use std::collections::BTreeSet;

/// Read-only description of how one partition overlaps with its peers.
pub trait OverlapDescriptor {
    /// Rank owning this descriptor.
    fn my_rank(&self) -> usize;

    /// Number of domestic rows (native rows plus overlap rows).
    fn num_domestic(&self) -> usize;
    /// Number of native rows.
    fn num_native(&self) -> usize;

    fn domestic_to_native(&self, domestic_idx: usize) -> Option<usize>;
    fn native_to_domestic(&self, native_idx: usize) -> Option<usize>;
    fn domestic_to_global(&self, domestic_idx: usize) -> usize;
    fn global_to_domestic(&self, global_idx: usize) -> Option<usize>;

    /// Ranks this partition exchanges rows with, in ascending order.
    fn peer_set(&self) -> &BTreeSet<usize>;

    /// Rank whose value is authoritative for `domestic_idx`.
    fn master_rank(&self, domestic_idx: usize) -> usize;

    /// Whether `domestic_idx` lies on the shared border with `peer_rank`, i.e.
    /// both ranks contribute to it additively.
    fn is_border_with(&self, domestic_idx: usize, peer_rank: usize) -> bool;

    /// Number of domestic rows that `peer_rank` also holds.
    fn foreign_overlap_size(&self, peer_rank: usize) -> usize;

    /// Domestic index of the `offset`-th row shared with `peer_rank`.
    fn foreign_overlap_offset_to_domestic_idx(&self, peer_rank: usize, offset: usize) -> usize;

    /// Rows with a native counterpart are local; all others belong to the overlap.
    fn is_local(&self, domestic_idx: usize) -> bool {
        self.domestic_to_native(domestic_idx).is_some()
    }
}
