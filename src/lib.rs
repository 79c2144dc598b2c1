#![cfg_attr(docsrs, feature(doc_cfg))]
//! # fvbox
//!
//! fvbox is the assembly and parallel-data core of a box / finite-volume PDE
//! simulator for subsurface flow. It provides two pieces every physical model
//! and every domain-decomposed solver relies on:
//!
//! - an element context that gathers primary variables, derived per-dof
//!   ("intensive") and per-face ("extensive") quantities over a stencil, for
//!   several time levels, with a model-wide cache and an evaluation point for
//!   numerical differentiation ([`assembly`]);
//! - a block vector over overlapping partitions that keeps shared rows
//!   consistent through point-to-point exchange ([`linear`], [`overlap`]).
//!
//! Physics, grids and solvers stay outside: they plug in through the traits
//! in [`assembly::types`], [`assembly::stencil`], [`overlap::descriptor`] and
//! [`algs::communicator`].
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! fvbox = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "rayon"]
//! ```
//!
//! ## Determinism
//!
//! Synchronisation receives from peers in ascending rank order, so the result
//! of an additive exchange does not depend on message arrival order.

pub mod algs;
pub mod assembly;
pub mod config;
pub mod debug_invariants;
pub mod fv_error;
pub mod linear;
pub mod overlap;
pub mod rate;

pub use debug_invariants::DebugInvariants;
pub use fv_error::FvError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm, Wait};
    pub use crate::assembly::{
        CellCenteredStencil, CellGrid, DiscreteModel, ElementContext, ExtensiveQuantities,
        FiniteDifferenceLinearizer, FvTypes, GradientCalculator, IntensiveQuantities,
        LocalResidual, ModelView, Stencil,
    };
    pub use crate::config::FvConfig;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::fv_error::FvError;
    pub use crate::linear::{BlockValue, OverlappingBlockVector};
    pub use crate::overlap::{DomesticOverlap, OverlapDescriptor, SyncPolicy};
    pub use crate::rate::{ComponentRateVector, FluidStateView, RateLayout, RateVector};
}
