//! Capability traits a physical model plugs into the element context.
//!
//! A model is described by one [`FvTypes`] implementation naming its primary
//! variables, its derived quantities, its stencil and its rate vector. The
//! element context is generic over that bundle and calls back into the
//! quantity types through the traits below.

use crate::assembly::element_context::ElementContext;
use crate::assembly::stencil::Stencil;
use crate::fv_error::FvError;
use crate::rate::RateVector;
use std::fmt::Debug;
use std::ops::{Index, IndexMut};

/// The type bundle of one discretised model.
pub trait FvTypes: Sized {
    /// Read-only problem description (material laws, boundary data, ...).
    type Problem: Sync;
    type PrimaryVariables: PrimaryVariableVector;
    type IntensiveQuantities: IntensiveQuantities<Self>;
    type ExtensiveQuantities: ExtensiveQuantities<Self>;
    type GradientCalculator: GradientCalculator<Self>;
    type Stencil: Stencil;
    type RateVector: RateVector;
}

/// The element type a model's stencil binds to.
pub type ElementOf<T> = <<T as FvTypes>::Stencil as Stencil>::Element;

/// Primary variables of one dof.
pub trait PrimaryVariableVector:
    Clone + Default + Debug + PartialEq + Send + Sync + Index<usize, Output = f64> + IndexMut<usize, Output = f64>
{
    /// Number of primary variables.
    fn num_pv(&self) -> usize;
}

impl<const N: usize> PrimaryVariableVector for [f64; N]
where
    [f64; N]: Default,
{
    fn num_pv(&self) -> usize {
        N
    }
}

/// Derived per-dof quantities, computed from the primary variables.
pub trait IntensiveQuantities<T: FvTypes>: Clone + Default + Debug + Send + Sync {
    /// Recompute from `ctx.primary_vars(dof_idx, time_idx)`.
    ///
    /// While this runs, `ctx.intensive_quantities(dof_idx, time_idx)` does not
    /// hold the previous bundle.
    fn update<const H: usize>(
        &mut self,
        ctx: &ElementContext<'_, T, H>,
        dof_idx: usize,
        time_idx: usize,
    ) -> Result<(), FvError>;

    /// Second pass, run after every dof of the element has been updated.
    fn update_scv_gradients<const H: usize>(
        &mut self,
        _ctx: &ElementContext<'_, T, H>,
        _dof_idx: usize,
        _time_idx: usize,
    ) -> Result<(), FvError> {
        Ok(())
    }
}

/// Derived per-face quantities, computed from the adjacent dofs.
pub trait ExtensiveQuantities<T: FvTypes>: Clone + Default + Debug + Send {
    fn update<const H: usize>(
        &mut self,
        ctx: &ElementContext<'_, T, H>,
        face_idx: usize,
        time_idx: usize,
    ) -> Result<(), FvError>;
}

/// Face interpolation and gradients of the spatial discretisation.
pub trait GradientCalculator<T: FvTypes>: Default + Debug + Send {
    /// Cache whatever the current stencil needs before faces are evaluated.
    fn prepare<const H: usize>(&mut self, ctx: &ElementContext<'_, T, H>, time_idx: usize);
}
