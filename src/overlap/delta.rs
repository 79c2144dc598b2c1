//! Delta rules: how an incoming row value is fused into the local one.
//!
//! The three synchronisation policies of the overlapping block vector are
//! built from two elementary deltas, [`CopyDelta`] and [`AddDelta`];
//! [`SyncPolicy`] decides per (row, sending peer) which one applies.

use crate::linear::block::BlockValue;
use crate::overlap::descriptor::OverlapDescriptor;

/// *Delta* encapsulates how a received value is merged into a local one.
pub trait Delta<V> {
    /// Merge an incoming value into the local value.
    fn fuse(local: &mut V, incoming: &V);
}

/// Copy-overwrites-local.
#[derive(Copy, Clone, Debug)]
pub struct CopyDelta;

impl<V: Copy> Delta<V> for CopyDelta {
    #[inline]
    fn fuse(local: &mut V, incoming: &V) {
        *local = *incoming;
    }
}

/// Additive delta for contributions that are summed across ranks.
#[derive(Copy, Clone, Debug)]
pub struct AddDelta;

impl<V: BlockValue> Delta<V> for AddDelta {
    #[inline]
    fn fuse(local: &mut V, incoming: &V) {
        local.add_assign_block(incoming);
    }
}

/// Conflict-resolution policy of one synchronisation call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Rows take the value of their master rank; other senders are ignored.
    FromMaster,
    /// Every received value is added, regardless of mastership.
    Add,
    /// Border rows add the peer's value; other rows take the master's value.
    ///
    /// A sender that is neither border with the row nor its master is
    /// ignored, so such a row never picks up a non-master value.
    AddBorder,
}

impl SyncPolicy {
    /// Fuse the value `peer` sent for `domestic_idx` into `local`.
    #[inline]
    pub fn apply<B, O>(self, overlap: &O, domestic_idx: usize, peer: usize, local: &mut B, incoming: &B)
    where
        B: BlockValue,
        O: OverlapDescriptor + ?Sized,
    {
        match self {
            SyncPolicy::FromMaster => {
                if overlap.master_rank(domestic_idx) == peer {
                    CopyDelta::fuse(local, incoming);
                }
            }
            SyncPolicy::Add => AddDelta::fuse(local, incoming),
            SyncPolicy::AddBorder => {
                if overlap.is_border_with(domestic_idx, peer) {
                    AddDelta::fuse(local, incoming);
                } else if overlap.master_rank(domestic_idx) == peer {
                    CopyDelta::fuse(local, incoming);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::overlap::DomesticOverlap;

    fn overlap() -> DomesticOverlap {
        let mut b = DomesticOverlap::builder(1);
        b.native(5, 0).share(5, 0).share_border(5, 2);
        b.build().unwrap()
    }

    #[test]
    fn from_master_ignores_other_senders() {
        let ov = overlap();
        let mut v = 1.0f64;
        SyncPolicy::FromMaster.apply(&ov, 0, 2, &mut v, &3.0);
        assert_eq!(v, 1.0);
        SyncPolicy::FromMaster.apply(&ov, 0, 0, &mut v, &10.0);
        assert_eq!(v, 10.0);
    }

    #[test]
    fn add_border_adds_only_on_border() {
        let ov = overlap();
        let mut v = [1.0f64, 2.0];
        SyncPolicy::AddBorder.apply(&ov, 0, 2, &mut v, &[3.0, 3.0]);
        assert_eq!(v, [4.0, 5.0]);
        SyncPolicy::AddBorder.apply(&ov, 0, 0, &mut v, &[10.0, 20.0]);
        assert_eq!(v, [10.0, 20.0]);
    }

    #[test]
    fn add_border_ignores_plain_non_master_senders() {
        let mut b = DomesticOverlap::builder(1);
        b.native(5, 0).share(5, 0).share_border(5, 2).share(5, 3);
        let ov = b.build().unwrap();
        let mut v = 1.0f64;
        SyncPolicy::AddBorder.apply(&ov, 0, 3, &mut v, &7.0);
        assert_eq!(v, 1.0);
        SyncPolicy::AddBorder.apply(&ov, 0, 2, &mut v, &7.0);
        assert_eq!(v, 8.0);
    }
}
