//! Structural self-checks for the crate's stateful types.
//!
//! Checks run in debug builds, or in release builds with the
//! `check-invariants` / `strict-invariants` features.

use crate::fv_error::FvError;

/// A type whose internal consistency can be verified on demand.
pub trait DebugInvariants {
    /// First violated invariant, if any.
    fn validate_invariants(&self) -> Result<(), FvError>;

    /// Panic on a violated invariant when checks are compiled in.
    fn debug_assert_invariants(&self);
}

/// Panic with `$what` as context if `$check` returns an error, but only when
/// invariant checks are compiled in.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $what:expr) => {
        #[cfg(any(debug_assertions, feature = "check-invariants", feature = "strict-invariants"))]
        if let Err(e) = $check {
            panic!("[invariants] {}: {}", $what, e);
        }
    };
}
