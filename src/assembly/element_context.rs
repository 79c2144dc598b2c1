//! Per-element cache of primary variables and derived quantities.
//!
//! An [`ElementContext`] is bound to one element at a time. For every dof of
//! the element's stencil it keeps, per history level, the primary variables,
//! the intensive quantities and an optional thermodynamic hint. For every
//! interior face it keeps the extensive quantities of the current level.
//!
//! # Evaluation point
//! Numerical differentiation perturbs one dof at a time. The context can
//! snapshot the intensive quantities of that dof
//! ([`save_intensive_quantities`](ElementContext::save_intensive_quantities))
//! and the extensive quantities of all faces
//! ([`save_extensive_quantities`](ElementContext::save_extensive_quantities)).
//! The `eval_point_*` accessors then return the snapshot while the live
//! arrays are recomputed for the perturbed state. Restoring the extensive
//! quantities only switches the selection back, no data is copied.
//!
//! # Panics
//! Dof, face and history indices are preconditions: every accessor asserts
//! them in all builds.

use crate::assembly::model::ModelView;
use crate::assembly::stencil::{Position, Stencil};
use crate::assembly::types::{ElementOf, ExtensiveQuantities, FvTypes, GradientCalculator, IntensiveQuantities};
use crate::config::ContextConfig;
use crate::debug_invariants::DebugInvariants;
use crate::fv_error::FvError;
use std::fmt;
use std::sync::Arc;

/// Cached state of one dof for every history level.
struct DofStore<T: FvTypes, const H: usize> {
    intensive: [T::IntensiveQuantities; H],
    primary: [T::PrimaryVariables; H],
    hint: [Option<Arc<T::IntensiveQuantities>>; H],
}

impl<T: FvTypes, const H: usize> DofStore<T, H> {
    fn new() -> Self {
        Self {
            intensive: std::array::from_fn(|_| Default::default()),
            primary: std::array::from_fn(|_| Default::default()),
            hint: std::array::from_fn(|_| None),
        }
    }
}

/// Snapshot of the one dof that is currently perturbed.
struct SavedDof<T: FvTypes> {
    dof_idx: usize,
    intensive: T::IntensiveQuantities,
    primary: T::PrimaryVariables,
}

/// Which face array the `eval_point_extensive_quantities` accessor reads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EvalPoint {
    Live,
    Saved,
}

/// Element-local assembly state. `H` is the number of history levels.
pub struct ElementContext<'m, T: FvTypes, const H: usize = 2> {
    model: &'m dyn ModelView<T>,
    config: ContextConfig,
    stencil: T::Stencil,
    element: Option<ElementOf<T>>,
    gradient_calculator: T::GradientCalculator,
    dof_vars: Vec<DofStore<T, H>>,
    saved_dof: Option<SavedDof<T>>,
    extensive: Vec<T::ExtensiveQuantities>,
    saved_extensive: Vec<T::ExtensiveQuantities>,
    eval_point: EvalPoint,
}

impl<'m, T: FvTypes, const H: usize> ElementContext<'m, T, H> {
    /// An unbound context; call [`update_stencil`](Self::update_stencil)
    /// before anything else.
    pub fn new(model: &'m dyn ModelView<T>, stencil: T::Stencil, config: ContextConfig) -> Self {
        const { assert!(H >= 1, "an element context needs at least one history level") };
        Self {
            model,
            config,
            stencil,
            element: None,
            gradient_calculator: T::GradientCalculator::default(),
            dof_vars: Vec::new(),
            saved_dof: None,
            extensive: Vec::new(),
            saved_extensive: Vec::new(),
            eval_point: EvalPoint::Live,
        }
    }

    // ------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------

    /// Bind to `element`, recompute stencil, intensive and extensive quantities.
    pub fn update_all(&mut self, element: &ElementOf<T>) -> Result<(), FvError> {
        self.update_stencil(element)?;
        self.update_all_intensive_quantities()?;
        self.update_all_extensive_quantities()
    }

    /// Bind to `element` and size the per-dof and per-face storage.
    ///
    /// Center gradients are computed only if the context is configured to
    /// require them. Any saved evaluation point is discarded. If the stencil
    /// fails, the context is left unbound.
    pub fn update_stencil(&mut self, element: &ElementOf<T>) -> Result<(), FvError> {
        let res = self.stencil.update(element).and_then(|()| {
            self.bind(element);
            if self.config.require_center_gradients {
                self.stencil.update_center_gradients()?;
            }
            Ok(())
        });
        res.inspect_err(|_| self.unbind())
    }

    /// Like [`update_stencil`](Self::update_stencil) but only the connectivity
    /// of the stencil is computed.
    pub fn update_stencil_topology(&mut self, element: &ElementOf<T>) -> Result<(), FvError> {
        let res = self.stencil.update_topology(element);
        match res {
            Ok(()) => self.bind(element),
            Err(_) => self.unbind(),
        }
        res
    }

    fn bind(&mut self, element: &ElementOf<T>) {
        self.element = Some(element.clone());
        self.saved_dof = None;
        self.eval_point = EvalPoint::Live;
        self.dof_vars.resize_with(self.stencil.num_dof(), DofStore::new);
        self.extensive
            .resize_with(self.stencil.num_interior_faces(), Default::default);
        self.debug_assert_invariants();
    }

    /// Forget the element; every dof and face index is out of range afterwards.
    fn unbind(&mut self) {
        self.element = None;
        self.saved_dof = None;
        self.eval_point = EvalPoint::Live;
        self.dof_vars.clear();
        self.extensive.clear();
        self.saved_extensive.clear();
    }

    // ------------------------------------------------------------------
    // Intensive quantities
    // ------------------------------------------------------------------

    /// Refresh every dof at every history level, then drop the saved dof.
    pub fn update_all_intensive_quantities(&mut self) -> Result<(), FvError> {
        for time_idx in 0..H {
            self.update_intensive_quantities_at(time_idx)?;
        }
        self.saved_dof = None;
        Ok(())
    }

    /// Refresh every dof at `time_idx`.
    ///
    /// Primary variables and hints come from the model. Intensive quantities
    /// are taken from the model cache when it has an up-to-date bundle and
    /// computed (and offered back to the cache) otherwise. A second pass then
    /// updates the sub-control-volume gradients of every dof.
    pub fn update_intensive_quantities_at(&mut self, time_idx: usize) -> Result<(), FvError> {
        self.assert_time_idx(time_idx);
        let model = self.model;
        let solution = model.solution(time_idx);

        for dof_idx in 0..self.num_dof() {
            let global = self.stencil.global_space_index(dof_idx);
            let pv = solution
                .get(global)
                .ok_or(FvError::SolutionIndexOutOfRange {
                    global,
                    len: solution.len(),
                    time_idx,
                })?;
            let store = &mut self.dof_vars[dof_idx];
            store.primary[time_idx].clone_from(pv);
            store.hint[time_idx] = model.thermodynamic_hint(global, time_idx);
        }

        let mut misses = 0usize;
        for dof_idx in 0..self.num_dof() {
            let global = self.stencil.global_space_index(dof_idx);
            match model.cached_intensive_quantities(global, time_idx) {
                Some(cached) => {
                    self.dof_vars[dof_idx].intensive[time_idx].clone_from(&cached);
                }
                None => {
                    misses += 1;
                    self.compute_intensive(dof_idx, time_idx)?;
                    model.update_cached_intensive_quantities(
                        &self.dof_vars[dof_idx].intensive[time_idx],
                        global,
                        time_idx,
                    );
                }
            }
        }
        log::trace!(
            "element {:?}, level {time_idx}: {} dofs, {misses} intensive quantity misses",
            self.element,
            self.num_dof()
        );

        self.update_scv_gradients(time_idx)
    }

    /// Recompute one dof from caller-supplied primary variables, bypassing
    /// the model cache, then rerun the gradient pass of `time_idx`.
    pub fn update_intensive_quantities(
        &mut self,
        primary_vars: &T::PrimaryVariables,
        dof_idx: usize,
        time_idx: usize,
    ) -> Result<(), FvError> {
        self.assert_dof_idx(dof_idx);
        self.assert_time_idx(time_idx);
        self.dof_vars[dof_idx].primary[time_idx].clone_from(primary_vars);
        self.compute_intensive(dof_idx, time_idx)?;
        self.update_scv_gradients(time_idx)
    }

    fn compute_intensive(&mut self, dof_idx: usize, time_idx: usize) -> Result<(), FvError> {
        let mut iq = std::mem::take(&mut self.dof_vars[dof_idx].intensive[time_idx]);
        let res = iq.update(self, dof_idx, time_idx);
        self.dof_vars[dof_idx].intensive[time_idx] = iq;
        res
    }

    /// Rerun the gradient pass of every dof at `time_idx`.
    pub fn update_scv_gradients(&mut self, time_idx: usize) -> Result<(), FvError> {
        self.assert_time_idx(time_idx);
        for dof_idx in 0..self.num_dof() {
            let mut iq = std::mem::take(&mut self.dof_vars[dof_idx].intensive[time_idx]);
            let res = iq.update_scv_gradients(self, dof_idx, time_idx);
            self.dof_vars[dof_idx].intensive[time_idx] = iq;
            res?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Extensive quantities
    // ------------------------------------------------------------------

    pub fn update_all_extensive_quantities(&mut self) -> Result<(), FvError> {
        self.update_extensive_quantities(0)
    }

    /// Prepare the gradient calculator, then recompute every interior face
    /// from the intensive quantities of `time_idx`.
    ///
    /// This writes the live face array only; which array the evaluation point
    /// selects is left unchanged.
    pub fn update_extensive_quantities(&mut self, time_idx: usize) -> Result<(), FvError> {
        self.assert_time_idx(time_idx);
        let mut calc = std::mem::take(&mut self.gradient_calculator);
        calc.prepare(self, time_idx);
        self.gradient_calculator = calc;

        for face_idx in 0..self.extensive.len() {
            let mut eq = std::mem::take(&mut self.extensive[face_idx]);
            let res = eq.update(self, face_idx, time_idx);
            self.extensive[face_idx] = eq;
            res?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Evaluation point
    // ------------------------------------------------------------------

    /// Snapshot the level-0 intensive quantities and primary variables of
    /// `dof_idx`. Replaces any earlier snapshot.
    pub fn save_intensive_quantities(&mut self, dof_idx: usize) {
        self.assert_dof_idx(dof_idx);
        let store = &self.dof_vars[dof_idx];
        self.saved_dof = Some(SavedDof {
            dof_idx,
            intensive: store.intensive[0].clone(),
            primary: store.primary[0].clone(),
        });
    }

    /// Put the snapshot of `dof_idx` back in place.
    ///
    /// # Panics
    /// If the current snapshot is not of `dof_idx`.
    pub fn restore_intensive_quantities(&mut self, dof_idx: usize) {
        let saved = self.saved_dof.take();
        assert!(
            matches!(&saved, Some(s) if s.dof_idx == dof_idx),
            "restore_intensive_quantities({dof_idx}) without a matching save"
        );
        if let Some(SavedDof {
            intensive, primary, ..
        }) = saved
        {
            let store = &mut self.dof_vars[dof_idx];
            store.intensive[0] = intensive;
            store.primary[0] = primary;
        }
    }

    /// Copy the live face quantities and make the copy the evaluation point.
    pub fn save_extensive_quantities(&mut self) {
        self.saved_extensive.clone_from(&self.extensive);
        self.eval_point = EvalPoint::Saved;
        self.debug_assert_invariants();
    }

    /// Make the live face quantities the evaluation point again.
    pub fn restore_extensive_quantities(&mut self) {
        self.eval_point = EvalPoint::Live;
    }

    pub fn eval_point(&self) -> EvalPoint {
        self.eval_point
    }

    /// Index of the dof whose intensive quantities are saved, if any.
    pub fn saved_dof_idx(&self) -> Option<usize> {
        self.saved_dof.as_ref().map(|s| s.dof_idx)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn intensive_quantities(&self, dof_idx: usize, time_idx: usize) -> &T::IntensiveQuantities {
        self.assert_dof_idx(dof_idx);
        self.assert_time_idx(time_idx);
        &self.dof_vars[dof_idx].intensive[time_idx]
    }

    /// Mutable access for models that patch quantities in place.
    pub fn intensive_quantities_mut(&mut self, dof_idx: usize, time_idx: usize) -> &mut T::IntensiveQuantities {
        self.assert_dof_idx(dof_idx);
        self.assert_time_idx(time_idx);
        &mut self.dof_vars[dof_idx].intensive[time_idx]
    }

    /// The saved bundle if `dof_idx` is the saved dof and `time_idx == 0`,
    /// the live bundle otherwise.
    pub fn eval_point_intensive_quantities(&self, dof_idx: usize, time_idx: usize) -> &T::IntensiveQuantities {
        if time_idx == 0 {
            if let Some(saved) = self.saved_dof.as_ref().filter(|s| s.dof_idx == dof_idx) {
                return &saved.intensive;
            }
        }
        self.intensive_quantities(dof_idx, time_idx)
    }

    pub fn primary_vars(&self, dof_idx: usize, time_idx: usize) -> &T::PrimaryVariables {
        self.assert_dof_idx(dof_idx);
        self.assert_time_idx(time_idx);
        &self.dof_vars[dof_idx].primary[time_idx]
    }

    pub fn thermodynamic_hint(&self, dof_idx: usize, time_idx: usize) -> Option<&T::IntensiveQuantities> {
        self.assert_dof_idx(dof_idx);
        self.assert_time_idx(time_idx);
        self.dof_vars[dof_idx].hint[time_idx].as_deref()
    }

    /// Face quantities are kept for the current level only; `time_idx` is
    /// checked but does not select storage.
    pub fn extensive_quantities(&self, face_idx: usize, time_idx: usize) -> &T::ExtensiveQuantities {
        self.assert_face_idx(face_idx);
        self.assert_time_idx(time_idx);
        &self.extensive[face_idx]
    }

    pub fn eval_point_extensive_quantities(&self, face_idx: usize, time_idx: usize) -> &T::ExtensiveQuantities {
        if time_idx != 0 || self.eval_point == EvalPoint::Live {
            return self.extensive_quantities(face_idx, time_idx);
        }
        self.assert_face_idx(face_idx);
        &self.saved_extensive[face_idx]
    }

    pub fn global_space_index(&self, dof_idx: usize) -> usize {
        self.assert_dof_idx(dof_idx);
        self.stencil.global_space_index(dof_idx)
    }

    /// Center of the sub-control volume of `dof_idx`.
    pub fn pos(&self, dof_idx: usize) -> Position {
        self.assert_dof_idx(dof_idx);
        self.stencil.sub_control_volume(dof_idx).global_pos
    }

    /// Total volume of the dof over all elements sharing it.
    pub fn dof_total_volume(&self, dof_idx: usize) -> f64 {
        self.model.dof_total_volume(self.global_space_index(dof_idx))
    }

    /// Volume of the dof's sub-control volume inside this element.
    pub fn dof_volume(&self, dof_idx: usize) -> f64 {
        self.assert_dof_idx(dof_idx);
        self.stencil.sub_control_volume(dof_idx).volume
    }

    pub fn on_boundary(&self) -> bool {
        self.stencil.num_boundary_faces() > 0
    }

    pub fn num_dof(&self) -> usize {
        self.dof_vars.len()
    }

    pub fn num_primary_dof(&self) -> usize {
        self.stencil.num_primary_dof()
    }

    pub fn num_interior_faces(&self) -> usize {
        self.extensive.len()
    }

    pub fn num_boundary_faces(&self) -> usize {
        self.stencil.num_boundary_faces()
    }

    pub fn history_size(&self) -> usize {
        H
    }

    pub fn stencil(&self) -> &T::Stencil {
        &self.stencil
    }

    pub fn model(&self) -> &'m dyn ModelView<T> {
        self.model
    }

    pub fn problem(&self) -> &'m T::Problem {
        self.model.problem()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn gradient_calculator(&self) -> &T::GradientCalculator {
        &self.gradient_calculator
    }

    /// The element the context is bound to, if any.
    pub fn element(&self) -> Option<&ElementOf<T>> {
        self.element.as_ref()
    }

    #[inline]
    fn assert_dof_idx(&self, dof_idx: usize) {
        assert!(
            dof_idx < self.dof_vars.len(),
            "dof index {dof_idx} out of range for stencil with {} dofs",
            self.dof_vars.len()
        );
    }

    #[inline]
    fn assert_face_idx(&self, face_idx: usize) {
        assert!(
            face_idx < self.extensive.len(),
            "face index {face_idx} out of range for stencil with {} interior faces",
            self.extensive.len()
        );
    }

    #[inline]
    fn assert_time_idx(&self, time_idx: usize) {
        assert!(time_idx < H, "time index {time_idx} out of range for history of {H}");
    }
}

impl<T: FvTypes, const H: usize> DebugInvariants for ElementContext<'_, T, H> {
    fn validate_invariants(&self) -> Result<(), FvError> {
        if self.element.is_none() {
            return Ok(());
        }
        if self.dof_vars.len() != self.stencil.num_dof() {
            return Err(FvError::ContextInvariant(format!(
                "{} dof slots for a stencil of {} dofs",
                self.dof_vars.len(),
                self.stencil.num_dof()
            )));
        }
        if self.extensive.len() != self.stencil.num_interior_faces() {
            return Err(FvError::ContextInvariant(format!(
                "{} face slots for a stencil of {} interior faces",
                self.extensive.len(),
                self.stencil.num_interior_faces()
            )));
        }
        if let Some(saved) = self.saved_dof_idx().filter(|&d| d >= self.dof_vars.len()) {
            return Err(FvError::ContextInvariant(format!("saved dof {saved} outside the stencil")));
        }
        if self.eval_point == EvalPoint::Saved && self.saved_extensive.len() != self.extensive.len() {
            return Err(FvError::ContextInvariant(
                "saved face quantities do not match the bound stencil".into(),
            ));
        }
        Ok(())
    }

    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ElementContext");
    }
}

impl<T: FvTypes, const H: usize> fmt::Debug for ElementContext<'_, T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementContext")
            .field("element", &self.element)
            .field("num_dof", &self.num_dof())
            .field("num_interior_faces", &self.num_interior_faces())
            .field("saved_dof", &self.saved_dof_idx())
            .field("eval_point", &self.eval_point)
            .finish()
    }
}
