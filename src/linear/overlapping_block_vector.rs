//! Overlap-aware block vector for domain-decomposed linear algebra.
//!
//! An [`OverlappingBlockVector`] stores one block per *domestic* row of a
//! partition and keeps the rows it shares with peer ranks consistent through
//! point-to-point exchanges. Which rows travel to which peer is negotiated
//! once at construction (by global index, translated to domestic indices on
//! arrival); every later synchronisation only moves values.
//!
//! # Blocking behaviour
//! Every `sync*` call posts all sends first, then receives from each peer in
//! ascending rank order and applies the policy as each payload arrives, and
//! finally waits for all sends. A call returns only once every peer has
//! answered: there is no timeout, so a peer that never synchronises hangs
//! the caller. The message layer is trusted not to lose or reorder messages
//! between a pair of ranks.

use crate::algs::communicator::{Communicator, VectorCommTags, Wait};
use crate::algs::wire::{WireCount, WireIndex, cast_slice, cast_slice_mut, copy_into};
use crate::fv_error::FvError;
use crate::linear::block::BlockValue;
use crate::overlap::delta::SyncPolicy;
use crate::overlap::descriptor::OverlapDescriptor;
use std::collections::BTreeMap;
use std::io;
use std::ops::{Index, IndexMut};

/// Send/receive state for one peer, fixed at construction.
#[derive(Clone, Debug)]
struct PeerBuffers<B> {
    send_indices: Vec<usize>,
    recv_indices: Vec<usize>,
    send_values: Vec<B>,
    recv_values: Vec<B>,
}

impl<B: BlockValue> PeerBuffers<B> {
    fn new(send_indices: Vec<usize>, recv_indices: Vec<usize>) -> Self {
        Self {
            send_values: vec![B::zero(); send_indices.len()],
            recv_values: vec![B::zero(); recv_indices.len()],
            send_indices,
            recv_indices,
        }
    }
}

/// A block vector over the domestic rows of one partition.
///
/// The overlap descriptor and the communicator are borrowed and must outlive
/// the vector.
pub struct OverlappingBlockVector<'a, B, O, C>
where
    B: BlockValue,
    O: OverlapDescriptor + ?Sized,
    C: Communicator,
{
    values: Vec<B>,
    overlap: &'a O,
    comm: &'a C,
    tags: VectorCommTags,
    peers: BTreeMap<usize, PeerBuffers<B>>,
}

impl<'a, B, O, C> OverlappingBlockVector<'a, B, O, C>
where
    B: BlockValue,
    O: OverlapDescriptor + ?Sized,
    C: Communicator,
{
    /// Create a zero vector coherent to `overlap`, using the default tags.
    ///
    /// This is a collective call: every peer in the overlap must construct its
    /// vector with matching tags.
    pub fn new(overlap: &'a O, comm: &'a C) -> Result<Self, FvError> {
        Self::with_tags(overlap, comm, VectorCommTags::default())
    }

    /// Create a zero vector using explicit communication tags.
    pub fn with_tags(overlap: &'a O, comm: &'a C, tags: VectorCommTags) -> Result<Self, FvError> {
        let peers = create_buffers::<B, O, C>(overlap, comm, tags)?;
        Ok(Self {
            values: vec![B::zero(); overlap.num_domestic()],
            overlap,
            comm,
            tags,
            peers,
        })
    }

    pub fn overlap(&self) -> &'a O {
        self.overlap
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[B] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [B] {
        &mut self.values
    }

    /// Set every domestic row to `value` without communicating.
    pub fn fill(&mut self, value: B) {
        self.values.fill(value);
    }

    /// Ranks this vector exchanges with, ascending.
    pub fn peer_ranks(&self) -> impl Iterator<Item = usize> + '_ {
        self.peers.keys().copied()
    }

    /// Domestic rows whose values are sent to `peer`, in wire order.
    pub fn send_indices(&self, peer: usize) -> Option<&[usize]> {
        self.peers.get(&peer).map(|p| p.send_indices.as_slice())
    }

    /// Domestic rows that receive the values `peer` sends, in wire order.
    pub fn recv_indices(&self, peer: usize) -> Option<&[usize]> {
        self.peers.get(&peer).map(|p| p.recv_indices.as_slice())
    }

    /// Assign from a native vector; rows shared with peers are then
    /// overwritten by their master rank.
    pub fn assign(&mut self, native: &[B]) -> Result<(), FvError> {
        self.load_native(native)?;
        self.sync()
    }

    /// Assign from a native vector; border rows are summed across the ranks
    /// sharing them, other shared rows come from their master rank.
    pub fn assign_add_border(&mut self, native: &[B]) -> Result<(), FvError> {
        self.load_native(native)?;
        self.sync_add_border()
    }

    /// Project onto a native vector. Native rows without a domestic
    /// counterpart are zero.
    pub fn assign_to(&self, native: &mut Vec<B>) {
        let num_native = self.overlap.num_native();
        native.clear();
        native.extend((0..num_native).map(|n| {
            self.overlap
                .native_to_domestic(n)
                .map_or_else(B::zero, |d| self.values[d])
        }));
    }

    /// Every row mastered by a peer takes that peer's value.
    pub fn sync(&mut self) -> Result<(), FvError> {
        self.sync_with(SyncPolicy::FromMaster)
    }

    /// Every received value is added to the local row, for every peer.
    pub fn sync_add(&mut self) -> Result<(), FvError> {
        self.sync_with(SyncPolicy::Add)
    }

    /// Border rows add the peer's value, other rows take the master's value.
    pub fn sync_add_border(&mut self) -> Result<(), FvError> {
        self.sync_with(SyncPolicy::AddBorder)
    }

    /// Debug dump, one row per line; overlap rows are marked with `*`.
    pub fn print<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        for (i, v) in self.values.iter().enumerate() {
            let mark = if self.overlap.is_local(i) { ' ' } else { '*' };
            writeln!(out, "row {i}{mark}: {v:?}")?;
        }
        out.flush()
    }

    fn load_native(&mut self, native: &[B]) -> Result<(), FvError> {
        let expected = self.overlap.num_native();
        if native.len() != expected {
            return Err(FvError::NativeLengthMismatch {
                expected,
                found: native.len(),
            });
        }
        for (d, slot) in self.values.iter_mut().enumerate() {
            *slot = self
                .overlap
                .domestic_to_native(d)
                .map_or_else(B::zero, |n| native[n]);
        }
        Ok(())
    }

    fn sync_with(&mut self, policy: SyncPolicy) -> Result<(), FvError> {
        log::trace!(
            "rank {}: {policy:?} sync with {} peers",
            self.overlap.my_rank(),
            self.peers.len()
        );
        let tag = self.tags.values.as_u16();

        // 1) pack and post all sends before awaiting anything
        let mut pending = Vec::with_capacity(self.peers.len());
        for (&peer, buf) in self.peers.iter_mut() {
            for (slot, &d) in buf.send_values.iter_mut().zip(&buf.send_indices) {
                *slot = self.values[d];
            }
            pending.push(self.comm.isend(peer, tag, cast_slice(&buf.send_values)));
        }

        // 2) receive peer by peer and fuse (but do not early-return)
        let mut maybe_err = None;
        for (&peer, buf) in self.peers.iter_mut() {
            let handle = self.comm.irecv(peer, tag, cast_slice_mut(&mut buf.recv_values));
            let received = match handle.wait() {
                Some(raw) => copy_into(&mut buf.recv_values, &raw).map_err(|(expected, actual)| {
                    FvError::MessageSizeMismatch {
                        neighbor: peer,
                        expected,
                        actual,
                    }
                }),
                None => Err(FvError::CommError {
                    neighbor: peer,
                    message: "no payload for value exchange".into(),
                }),
            };
            match received {
                Ok(()) => {
                    for (&d, incoming) in buf.recv_indices.iter().zip(&buf.recv_values) {
                        policy.apply(self.overlap, d, peer, &mut self.values[d], incoming);
                    }
                }
                Err(e) => {
                    maybe_err.get_or_insert(e);
                }
            }
        }

        // 3) every send buffer must be reusable before we return
        for send in pending {
            let _ = send.wait();
        }

        maybe_err.map_or(Ok(()), Err)
    }
}

impl<B, O, C> Clone for OverlappingBlockVector<'_, B, O, C>
where
    B: BlockValue,
    O: OverlapDescriptor + ?Sized,
    C: Communicator,
{
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            overlap: self.overlap,
            comm: self.comm,
            tags: self.tags,
            peers: self.peers.clone(),
        }
    }
}

impl<B, O, C> Index<usize> for OverlappingBlockVector<'_, B, O, C>
where
    B: BlockValue,
    O: OverlapDescriptor + ?Sized,
    C: Communicator,
{
    type Output = B;
    fn index(&self, domestic_idx: usize) -> &B {
        &self.values[domestic_idx]
    }
}

impl<B, O, C> IndexMut<usize> for OverlappingBlockVector<'_, B, O, C>
where
    B: BlockValue,
    O: OverlapDescriptor + ?Sized,
    C: Communicator,
{
    fn index_mut(&mut self, domestic_idx: usize) -> &mut B {
        &mut self.values[domestic_idx]
    }
}

/// Exchange the foreign-overlap row lists with every peer.
///
/// Sends carry global indices; the receiver translates them to its own
/// domestic numbering. All send handles are drained before returning, even
/// if a receive failed.
fn create_buffers<B, O, C>(
    overlap: &O,
    comm: &C,
    tags: VectorCommTags,
) -> Result<BTreeMap<usize, PeerBuffers<B>>, FvError>
where
    B: BlockValue,
    O: OverlapDescriptor + ?Sized,
    C: Communicator,
{
    let peer_set = overlap.peer_set();

    // counts are checked before anything is posted
    let mut counts = Vec::with_capacity(peer_set.len());
    for &peer in peer_set {
        let rows = overlap.foreign_overlap_size(peer);
        counts.push(WireCount::new(rows).ok_or(FvError::OverlapTooLarge { peer, rows })?);
    }

    // 1) send the row count, then the global rows themselves
    let mut pending = Vec::with_capacity(2 * peer_set.len());
    let mut send_lists = BTreeMap::new();
    for (&peer, count) in peer_set.iter().zip(counts) {
        let n = count.get();
        let domestic: Vec<usize> = (0..n)
            .map(|i| overlap.foreign_overlap_offset_to_domestic_idx(peer, i))
            .collect();
        let wire: Vec<WireIndex> = domestic
            .iter()
            .map(|&d| WireIndex::of(overlap.domestic_to_global(d)))
            .collect();
        pending.push(comm.isend(peer, tags.sizes.as_u16(), cast_slice(std::slice::from_ref(&count))));
        pending.push(comm.isend(peer, tags.indices.as_u16(), cast_slice(&wire)));
        send_lists.insert(peer, domestic);
    }

    // 2) receive what each peer will send us
    let mut peers = BTreeMap::new();
    let mut maybe_err = None;
    for &peer in peer_set {
        match receive_rows(overlap, comm, tags, peer) {
            Ok(recv_indices) => {
                let send_indices = send_lists.remove(&peer).unwrap_or_default();
                peers.insert(peer, PeerBuffers::new(send_indices, recv_indices));
            }
            Err(e) => {
                maybe_err.get_or_insert(e);
            }
        }
    }

    // 3) always drain sends
    for send in pending {
        let _ = send.wait();
    }

    if let Some(err) = maybe_err {
        return Err(err);
    }
    debug_assert!(peer_set.iter().all(|p| peers.contains_key(p)));
    log::debug!(
        "rank {}: overlapping vector buffers for peers {:?} (send {:?} / recv {:?} rows)",
        overlap.my_rank(),
        peers.keys().collect::<Vec<_>>(),
        peers.values().map(|p: &PeerBuffers<B>| p.send_indices.len()).collect::<Vec<_>>(),
        peers.values().map(|p: &PeerBuffers<B>| p.recv_indices.len()).collect::<Vec<_>>(),
    );
    Ok(peers)
}

fn receive_rows<O, C>(overlap: &O, comm: &C, tags: VectorCommTags, peer: usize) -> Result<Vec<usize>, FvError>
where
    O: OverlapDescriptor + ?Sized,
    C: Communicator,
{
    let size_err = |(expected, actual): (usize, usize)| FvError::MessageSizeMismatch {
        neighbor: peer,
        expected,
        actual,
    };

    let mut count = [WireCount::default()];
    let raw = comm
        .irecv(peer, tags.sizes.as_u16(), cast_slice_mut(&mut count))
        .wait()
        .ok_or_else(|| FvError::CommError {
            neighbor: peer,
            message: "no row count received".into(),
        })?;
    copy_into(&mut count, &raw).map_err(size_err)?;

    let mut wire = vec![WireIndex::default(); count[0].get()];
    let raw = comm
        .irecv(peer, tags.indices.as_u16(), cast_slice_mut(&mut wire))
        .wait()
        .ok_or_else(|| FvError::CommError {
            neighbor: peer,
            message: "no row indices received".into(),
        })?;
    copy_into(&mut wire, &raw).map_err(size_err)?;

    wire.iter()
        .map(|w| {
            let global = w.get();
            overlap
                .global_to_domestic(global)
                .ok_or(FvError::MissingDomesticIndex { global, peer })
        })
        .collect()
}
