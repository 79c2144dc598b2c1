//! Element-local assembly: stencils, the element context and its caches.
//!
//! The pieces fit together like this: a [`DiscreteModel`](model::DiscreteModel)
//! owns the solution history and the [`IntensiveQuantityCache`]; one
//! [`ElementContext`] per worker borrows it as a [`ModelView`] and is bound to
//! one element at a time through a [`Stencil`]; a model's
//! [`LocalResidual`](local_linearizer::LocalResidual) reads the context and the
//! [`FiniteDifferenceLinearizer`] turns that into a local Jacobian.

pub mod cell_centered;
pub mod element_context;
pub mod gradient;
pub mod intensive_cache;
pub mod local_linearizer;
pub mod model;
pub mod stencil;
pub mod sweep;
pub mod types;

pub use cell_centered::{CellCenteredStencil, CellGrid, Intersection};
pub use element_context::{ElementContext, EvalPoint};
pub use gradient::{NoGradients, TwoPointGradientCalculator};
pub use intensive_cache::IntensiveQuantityCache;
pub use local_linearizer::{FiniteDifferenceLinearizer, LocalJacobian, LocalResidual};
pub use model::{DiscreteModel, ModelView, SolutionHistory};
pub use stencil::{Position, Stencil, SubControlVolume, SubControlVolumeFace};
pub use sweep::for_each_element;
#[cfg(feature = "rayon")]
pub use sweep::par_for_each_element;
pub use types::{
    ElementOf, ExtensiveQuantities, FvTypes, GradientCalculator, IntensiveQuantities,
    PrimaryVariableVector,
};
