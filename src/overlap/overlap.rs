//! In-memory overlap descriptor for one partition.
//!
//! Native rows occupy the domestic indices `0..num_native` in registration
//! order, overlap rows follow. Each row shared with a peer is listed in that
//! peer's foreign overlap in the order it was linked; the peer must link the
//! same global rows for the exchange to line up, though not necessarily in the
//! same order since rows travel by global index during setup.

use crate::debug_invariants::DebugInvariants;
use crate::fv_error::FvError;
use crate::overlap::descriptor::OverlapDescriptor;
use hashbrown::{HashMap, HashSet};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
pub struct DomesticOverlap {
    my_rank: usize,
    num_native: usize,
    domestic_to_global: Vec<usize>,
    global_to_domestic: HashMap<usize, usize>,
    master: Vec<usize>,
    peers: BTreeSet<usize>,
    /// peer -> domestic rows shared with it, in send order
    foreign: BTreeMap<usize, Vec<usize>>,
    /// (domestic, peer)
    border: HashSet<(usize, usize)>,
}

impl DomesticOverlap {
    /// Start describing the partition owned by `my_rank`.
    pub fn builder(my_rank: usize) -> DomesticOverlapBuilder {
        DomesticOverlapBuilder {
            my_rank,
            ..Default::default()
        }
    }

    /// A partition with no peers: every row is native and mastered locally.
    pub fn serial(num_rows: usize) -> Self {
        DomesticOverlap {
            my_rank: 0,
            num_native: num_rows,
            domestic_to_global: (0..num_rows).collect(),
            global_to_domestic: (0..num_rows).map(|g| (g, g)).collect(),
            master: vec![0; num_rows],
            peers: BTreeSet::new(),
            foreign: BTreeMap::new(),
            border: HashSet::new(),
        }
    }

    /// Domestic rows shared with `peer`, in send order.
    pub fn foreign_overlap(&self, peer: usize) -> &[usize] {
        self.foreign.get(&peer).map_or(&[], Vec::as_slice)
    }
}

impl OverlapDescriptor for DomesticOverlap {
    fn my_rank(&self) -> usize {
        self.my_rank
    }

    fn num_domestic(&self) -> usize {
        self.domestic_to_global.len()
    }

    fn num_native(&self) -> usize {
        self.num_native
    }

    fn domestic_to_native(&self, domestic_idx: usize) -> Option<usize> {
        (domestic_idx < self.num_native).then_some(domestic_idx)
    }

    fn native_to_domestic(&self, native_idx: usize) -> Option<usize> {
        (native_idx < self.num_native).then_some(native_idx)
    }

    fn domestic_to_global(&self, domestic_idx: usize) -> usize {
        self.domestic_to_global[domestic_idx]
    }

    fn global_to_domestic(&self, global_idx: usize) -> Option<usize> {
        self.global_to_domestic.get(&global_idx).copied()
    }

    fn peer_set(&self) -> &BTreeSet<usize> {
        &self.peers
    }

    fn master_rank(&self, domestic_idx: usize) -> usize {
        self.master[domestic_idx]
    }

    fn is_border_with(&self, domestic_idx: usize, peer_rank: usize) -> bool {
        self.border.contains(&(domestic_idx, peer_rank))
    }

    fn foreign_overlap_size(&self, peer_rank: usize) -> usize {
        self.foreign_overlap(peer_rank).len()
    }

    fn foreign_overlap_offset_to_domestic_idx(&self, peer_rank: usize, offset: usize) -> usize {
        self.foreign_overlap(peer_rank)[offset]
    }
}

impl DebugInvariants for DomesticOverlap {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "DomesticOverlap");
    }

    fn validate_invariants(&self) -> Result<(), FvError> {
        if self.master.len() != self.domestic_to_global.len()
            || self.global_to_domestic.len() != self.domestic_to_global.len()
        {
            return Err(FvError::OverlapInvariant(
                "index maps have inconsistent lengths".into(),
            ));
        }
        for (d, &g) in self.domestic_to_global.iter().enumerate() {
            if self.global_to_domestic.get(&g) != Some(&d) {
                return Err(FvError::OverlapInvariant(format!(
                    "global {g} does not map back to domestic {d}"
                )));
            }
        }
        if self.peers.contains(&self.my_rank) {
            return Err(FvError::OverlapInvariant(format!(
                "rank {} lists itself as a peer",
                self.my_rank
            )));
        }
        for (d, &m) in self.master.iter().enumerate() {
            if m == self.my_rank {
                if !self.is_local(d) {
                    return Err(FvError::OverlapInvariant(format!(
                        "overlap row {d} cannot be mastered locally"
                    )));
                }
                continue;
            }
            if !self.foreign_overlap(m).contains(&d) {
                return Err(FvError::OverlapInvariant(format!(
                    "row {d} is mastered by rank {m} but not shared with it"
                )));
            }
        }
        for &(d, p) in &self.border {
            if !self.foreign_overlap(p).contains(&d) {
                return Err(FvError::OverlapInvariant(format!(
                    "row {d} is border with rank {p} but not shared with it"
                )));
            }
        }
        Ok(())
    }
}

/// Incremental construction of a [`DomesticOverlap`].
#[derive(Clone, Debug, Default)]
pub struct DomesticOverlapBuilder {
    my_rank: usize,
    native: Vec<(usize, usize)>,
    overlap: Vec<(usize, usize)>,
    links: Vec<(usize, usize, bool)>,
}

impl DomesticOverlapBuilder {
    /// Register a native row with its master rank.
    pub fn native(&mut self, global: usize, master: usize) -> &mut Self {
        self.native.push((global, master));
        self
    }

    /// Register an overlap (non-native) row owned by `master`.
    pub fn overlap(&mut self, global: usize, master: usize) -> &mut Self {
        self.overlap.push((global, master));
        self
    }

    /// Declare that `peer` also holds row `global`.
    pub fn share(&mut self, global: usize, peer: usize) -> &mut Self {
        self.links.push((global, peer, false));
        self
    }

    /// Like [`share`](Self::share), and both ranks contribute additively.
    pub fn share_border(&mut self, global: usize, peer: usize) -> &mut Self {
        self.links.push((global, peer, true));
        self
    }

    pub fn build(&self) -> Result<DomesticOverlap, FvError> {
        let rows = self.native.len() + self.overlap.len();
        let mut out = DomesticOverlap {
            my_rank: self.my_rank,
            num_native: self.native.len(),
            domestic_to_global: Vec::with_capacity(rows),
            global_to_domestic: HashMap::with_capacity(rows),
            master: Vec::with_capacity(rows),
            peers: BTreeSet::new(),
            foreign: BTreeMap::new(),
            border: HashSet::new(),
        };

        for &(global, master) in self.native.iter().chain(&self.overlap) {
            let d = out.domestic_to_global.len();
            if out.global_to_domestic.insert(global, d).is_some() {
                return Err(FvError::DuplicateGlobalIndex(global));
            }
            out.domestic_to_global.push(global);
            out.master.push(master);
        }

        for &(global, peer, border) in &self.links {
            let d = out
                .global_to_domestic
                .get(&global)
                .copied()
                .ok_or(FvError::UnknownGlobalIndex(global))?;
            let shared = out.foreign.entry(peer).or_default();
            if !shared.contains(&d) {
                shared.push(d);
            }
            if border {
                out.border.insert((d, peer));
            }
            out.peers.insert(peer);
        }

        out.validate_invariants()?;
        log::debug!(
            "rank {}: overlap with {} domestic / {} native rows, peers {:?}",
            out.my_rank,
            out.num_domestic(),
            out.num_native,
            out.peers
        );
        Ok(out)
    }
}
