//! Thin façade over intra-process (threads as ranks) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Send handles are **waitable** but non-blocking; receive handles block in
//! `wait()` until the peer's payload is available. The overlapping vector
//! calls `.wait()` on every handle before it trusts that a buffer is ready
//! or reusable.
//!
//! There is no timeout: a peer that never sends hangs the waiting rank.

use bytes::Bytes;
use dashmap::DashMap;
use static_assertions::assert_impl_all;
use std::collections::VecDeque;
use std::sync::Arc;

/// Non-blocking point-to-point communication interface.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// Rank of the calling process within its world.
    fn rank(&self) -> usize;
    /// Number of ranks in the world.
    fn size(&self) -> usize;

    /// Post a send of `buf` to `peer`. The buffer may be reused immediately.
    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive from `peer`; `buf.len()` bounds the accepted payload.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

/// Message tag newtype so that independent exchange epochs never collide.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        CommTag(tag)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Tag `k` slots after this one (wrapping).
    pub const fn offset(self, k: u16) -> Self {
        CommTag(self.0.wrapping_add(k))
    }
}

/// Tags used by one overlapping vector: index-list setup and value exchange.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VectorCommTags {
    pub sizes: CommTag,
    pub indices: CommTag,
    pub values: CommTag,
}

impl VectorCommTags {
    pub const fn from_base(base: CommTag) -> Self {
        Self {
            sizes: base,
            indices: base.offset(1),
            values: base.offset(2),
        }
    }
}

impl Default for VectorCommTags {
    fn default() -> Self {
        Self::from_base(CommTag::new(0x0B70))
    }
}

/// Compile-time no-op comm for pure serial runs.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- RayonComm: ranks simulated by threads of one process ---
type Key = (usize, usize, u16); // (src, dst, tag)

/// FIFO queues per (src, dst, tag), shared by all ranks of one world.
#[derive(Debug, Default)]
struct Mailbox {
    slots: DashMap<Key, VecDeque<Bytes>>,
}

impl Mailbox {
    fn post(&self, key: Key, payload: Bytes) {
        self.slots.entry(key).or_default().push_back(payload);
    }

    fn take(&self, key: &Key) -> Option<Bytes> {
        // the shard guard must be released before the caller yields
        self.slots.get_mut(key).and_then(|mut q| q.pop_front())
    }
}

/// Receive handle of [`RayonComm`]; `wait` spins until the payload arrives.
pub struct LocalRecvHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    len: usize,
}

impl Wait for LocalRecvHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some(bytes) = self.mailbox.take(&self.key) {
                let n = bytes.len().min(self.len);
                return Some(bytes[..n].to_vec());
            }
            std::thread::yield_now();
        }
    }
}

/// In-process communicator: every rank is a thread and all ranks of a world
/// share one mailbox. Sends complete immediately (the payload is copied).
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl RayonComm {
    /// Create all `size` ranks of a fresh world.
    pub fn world(size: usize) -> Vec<RayonComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalRecvHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        debug_assert!(peer < self.size, "peer {peer} outside world of size {}", self.size);
        self.mailbox
            .post((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        LocalRecvHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            len: buf.len(),
        }
    }
}

assert_impl_all!(RayonComm: Send, Sync, Clone);
assert_impl_all!(LocalRecvHandle: Send);

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use mpi::environment::Universe;
    use mpi::request::{Request, StaticScope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        _universe: Universe,
    }

    impl MpiComm {
        /// Initialise MPI. Returns `None` if MPI was already initialised.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Some(Self {
                world,
                rank,
                size,
                _universe: universe,
            })
        }
    }

    /// Owns the payload of an in-flight send until `wait` has completed.
    pub struct MpiSendHandle {
        request: Option<Request<'static, [u8], StaticScope>>,
        payload: *mut [u8],
    }

    impl Wait for MpiSendHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(req) = self.request.take() {
                req.wait();
                // SAFETY: `payload` came from `Box::into_raw` in `isend` and the
                // request that borrowed it has completed.
                unsafe { drop(Box::from_raw(self.payload)) };
            }
            None
        }
    }

    /// Receives are a blocking fill; the handle only carries the result.
    pub struct MpiRecvHandle(Option<Vec<u8>>);

    impl Wait for MpiRecvHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle = MpiRecvHandle;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSendHandle {
            let payload: *mut [u8] = Box::into_raw(buf.to_vec().into_boxed_slice());
            // SAFETY: the allocation is only freed in `MpiSendHandle::wait`,
            // after the request has completed. A dropped handle leaks it.
            let data: &'static [u8] = unsafe { &*payload };
            let request = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, data, tag as i32);
            MpiSendHandle {
                request: Some(request),
                payload,
            }
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiRecvHandle {
            let (mut data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(tag as i32);
            data.truncate(buf.len());
            MpiRecvHandle(Some(data))
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
