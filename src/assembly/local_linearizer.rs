//! Local residual and its Jacobian by numerical differentiation.
//!
//! For each primary dof `j` of the bound element and each primary variable
//! `k` of that dof, the linearizer snapshots the dof, recomputes it from a
//! perturbed copy of its primary variables, refreshes the face quantities,
//! evaluates the residual and restores the snapshot. The face quantities of
//! the unperturbed state are the evaluation point for the whole sweep.

use crate::assembly::element_context::ElementContext;
use crate::assembly::types::{FvTypes, PrimaryVariableVector};
use crate::config::{DifferenceMethod, LinearizerConfig};
use crate::fv_error::FvError;
use crate::rate::RateVector;

/// The storage, flux and source terms of a model, per dof of an element.
pub trait LocalResidual<T: FvTypes> {
    /// Write the residual of every dof of `ctx` into `residual`, which holds
    /// `ctx.num_dof()` zeroed entries.
    fn eval<const H: usize>(&self, ctx: &ElementContext<'_, T, H>, residual: &mut [T::RateVector]) -> Result<(), FvError>;
}

/// Dense element Jacobian: `d residual[eq_dof][eq] / d pv[pv_dof][pv]` for
/// every dof of the element and every primary dof.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalJacobian {
    num_dof: usize,
    num_primary_dof: usize,
    num_eq: usize,
    num_pv: usize,
    data: Vec<f64>,
}

impl LocalJacobian {
    fn reset(&mut self, num_dof: usize, num_primary_dof: usize, num_eq: usize, num_pv: usize) {
        self.num_dof = num_dof;
        self.num_primary_dof = num_primary_dof;
        self.num_eq = num_eq;
        self.num_pv = num_pv;
        self.data.clear();
        self.data.resize(num_dof * num_primary_dof * num_eq * num_pv, 0.0);
    }

    #[inline]
    fn offset(&self, eq_dof: usize, eq_idx: usize, pv_dof: usize, pv_idx: usize) -> usize {
        assert!(
            eq_dof < self.num_dof && pv_dof < self.num_primary_dof && eq_idx < self.num_eq && pv_idx < self.num_pv,
            "jacobian entry ({eq_dof}, {eq_idx}; {pv_dof}, {pv_idx}) out of range"
        );
        ((eq_dof * self.num_primary_dof + pv_dof) * self.num_eq + eq_idx) * self.num_pv + pv_idx
    }

    pub fn get(&self, eq_dof: usize, eq_idx: usize, pv_dof: usize, pv_idx: usize) -> f64 {
        self.data[self.offset(eq_dof, eq_idx, pv_dof, pv_idx)]
    }

    fn set(&mut self, eq_dof: usize, eq_idx: usize, pv_dof: usize, pv_idx: usize, value: f64) {
        let at = self.offset(eq_dof, eq_idx, pv_dof, pv_idx);
        self.data[at] = value;
    }

    pub fn num_dof(&self) -> usize {
        self.num_dof
    }

    pub fn num_primary_dof(&self) -> usize {
        self.num_primary_dof
    }

    pub fn num_eq(&self) -> usize {
        self.num_eq
    }

    pub fn num_pv(&self) -> usize {
        self.num_pv
    }
}

/// Finite-difference linearizer with reusable buffers.
#[derive(Debug)]
pub struct FiniteDifferenceLinearizer<T: FvTypes> {
    config: LinearizerConfig,
    residual: Vec<T::RateVector>,
    plus: Vec<T::RateVector>,
    minus: Vec<T::RateVector>,
    jacobian: LocalJacobian,
}

impl<T: FvTypes> FiniteDifferenceLinearizer<T> {
    pub fn new(config: LinearizerConfig) -> Result<Self, FvError> {
        if !(config.base_epsilon.is_finite() && config.base_epsilon > 0.0) {
            return Err(FvError::InvalidConfig(format!(
                "base_epsilon must be positive and finite, got {}",
                config.base_epsilon
            )));
        }
        Ok(Self {
            config,
            residual: Vec::new(),
            plus: Vec::new(),
            minus: Vec::new(),
            jacobian: LocalJacobian::default(),
        })
    }

    pub fn config(&self) -> &LinearizerConfig {
        &self.config
    }

    /// Perturbation applied to a primary variable of value `pv`.
    pub fn numeric_epsilon(&self, pv: f64) -> f64 {
        self.config.base_epsilon * (1.0 + pv.abs())
    }

    /// Residual of the last [`linearize`](Self::linearize) call, per dof.
    pub fn residual(&self) -> &[T::RateVector] {
        &self.residual
    }

    pub fn jacobian(&self) -> &LocalJacobian {
        &self.jacobian
    }

    /// Residual and Jacobian of the element `ctx` is bound to.
    ///
    /// `ctx` must hold up-to-date intensive and extensive quantities. On
    /// return the intensive quantities are as before, even if evaluating a
    /// perturbed state failed; gradients and face quantities are recomputed
    /// and the live faces are the evaluation point again.
    pub fn linearize<R, const H: usize>(
        &mut self,
        ctx: &mut ElementContext<'_, T, H>,
        local: &R,
    ) -> Result<(), FvError>
    where
        R: LocalResidual<T>,
    {
        let num_dof = ctx.num_dof();
        let num_primary_dof = ctx.num_primary_dof();
        let num_pv = if num_dof > 0 { ctx.primary_vars(0, 0).num_pv() } else { 0 };
        self.jacobian
            .reset(num_dof, num_primary_dof, T::RateVector::NUM_EQ, num_pv);

        evaluate(ctx, local, &mut self.residual)?;
        ctx.save_extensive_quantities();

        let mut outcome = Ok(());
        'dofs: for pv_dof in 0..num_primary_dof {
            for pv_idx in 0..num_pv {
                ctx.save_intensive_quantities(pv_dof);
                let column = self.partial_derivative(ctx, local, pv_dof, pv_idx);
                ctx.restore_intensive_quantities(pv_dof);
                if let Err(e) = column {
                    outcome = Err(e);
                    break 'dofs;
                }
            }
        }

        // gradients and faces still reflect the last perturbation
        let refreshed = ctx
            .update_scv_gradients(0)
            .and_then(|()| ctx.update_all_extensive_quantities());
        ctx.restore_extensive_quantities();
        outcome.and(refreshed)
    }

    fn partial_derivative<R, const H: usize>(
        &mut self,
        ctx: &mut ElementContext<'_, T, H>,
        local: &R,
        pv_dof: usize,
        pv_idx: usize,
    ) -> Result<(), FvError>
    where
        R: LocalResidual<T>,
    {
        let base = ctx.primary_vars(pv_dof, 0).clone();
        let eps = self.numeric_epsilon(base[pv_idx]);
        let method = self.config.difference;

        if method != DifferenceMethod::Backward {
            let mut pv = base.clone();
            pv[pv_idx] += eps;
            ctx.update_intensive_quantities(&pv, pv_dof, 0)?;
            ctx.update_all_extensive_quantities()?;
            evaluate(ctx, local, &mut self.plus)?;
        } else {
            self.plus.clone_from(&self.residual);
        }

        if method != DifferenceMethod::Forward {
            let mut pv = base;
            pv[pv_idx] -= eps;
            ctx.update_intensive_quantities(&pv, pv_dof, 0)?;
            ctx.update_all_extensive_quantities()?;
            evaluate(ctx, local, &mut self.minus)?;
        } else {
            self.minus.clone_from(&self.residual);
        }

        let delta = if method == DifferenceMethod::Central { 2.0 * eps } else { eps };
        for eq_dof in 0..self.residual.len() {
            for eq_idx in 0..T::RateVector::NUM_EQ {
                let d = (self.plus[eq_dof][eq_idx] - self.minus[eq_dof][eq_idx]) / delta;
                self.jacobian.set(eq_dof, eq_idx, pv_dof, pv_idx, d);
            }
        }
        Ok(())
    }
}

fn evaluate<T, R, const H: usize>(
    ctx: &ElementContext<'_, T, H>,
    local: &R,
    out: &mut Vec<T::RateVector>,
) -> Result<(), FvError>
where
    T: FvTypes,
    R: LocalResidual<T>,
{
    out.resize_with(ctx.num_dof(), Default::default);
    for r in out.iter_mut() {
        r.assign_scalar(0.0);
    }
    local.eval(ctx, out)
}
