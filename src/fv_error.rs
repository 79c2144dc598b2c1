//! FvError: Unified error type for fvbox public APIs
//!
//! Precondition violations (out-of-range dof, face or history indices) are
//! programming errors and panic at the call site. Everything that depends on
//! collaborator data or on the message layer is reported through this type.

use thiserror::Error;

/// Unified error type for fvbox operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FvError {
    /// The message layer did not deliver a payload from `neighbor`.
    #[error("Communication error with rank {neighbor}: {message}")]
    CommError { neighbor: usize, message: String },
    /// A payload from `neighbor` had an unexpected byte count.
    #[error("Message from rank {neighbor} has {actual} bytes, expected {expected}")]
    MessageSizeMismatch {
        neighbor: usize,
        expected: usize,
        actual: usize,
    },
    /// More rows are shared with `peer` than the setup exchange can count.
    #[error("{rows} rows shared with rank {peer} exceed the wire count limit")]
    OverlapTooLarge { peer: usize, rows: usize },
    /// A peer announced a global index this partition does not hold.
    #[error("Global index {global} sent by rank {peer} has no domestic counterpart")]
    MissingDomesticIndex { global: usize, peer: usize },
    /// The same global index was registered twice on one partition.
    #[error("Global index {0} registered twice")]
    DuplicateGlobalIndex(usize),
    /// A global index was referenced before it was registered.
    #[error("Global index {0} is not part of this partition")]
    UnknownGlobalIndex(usize),
    /// The overlap descriptor violates one of its structural invariants.
    #[error("Overlap invariant violated: {0}")]
    OverlapInvariant(String),
    /// An element context's storage disagrees with its bound stencil.
    #[error("Element context invariant violated: {0}")]
    ContextInvariant(String),
    /// A native vector passed to a projection has the wrong length.
    #[error("Native vector has {found} entries, expected {expected}")]
    NativeLengthMismatch { expected: usize, found: usize },
    /// A stencil refers to a global dof the solution vector does not cover.
    #[error("Global dof {global} out of range for solution of length {len} at time index {time_idx}")]
    SolutionIndexOutOfRange {
        global: usize,
        len: usize,
        time_idx: usize,
    },
    /// The stencil does not implement the requested operation.
    #[error("Unsupported stencil operation: {0}")]
    UnsupportedStencilOperation(&'static str),
    /// A physical model failed to compute derived quantities.
    #[error("Quantity update failed for dof {dof_idx} at time index {time_idx}: {message}")]
    QuantityUpdate {
        dof_idx: usize,
        time_idx: usize,
        message: String,
    },
    /// A configuration value is out of its admissible range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FvError {
    /// Shorthand used by model implementations reporting a failed update.
    pub fn quantity_update(dof_idx: usize, time_idx: usize, message: impl Into<String>) -> Self {
        FvError::QuantityUpdate {
            dof_idx,
            time_idx,
            message: message.into(),
        }
    }
}
