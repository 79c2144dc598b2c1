//! What an element context needs from the model-wide state.

use crate::assembly::intensive_cache::IntensiveQuantityCache;
use crate::assembly::types::FvTypes;
use crate::config::CacheConfig;
use crate::fv_error::FvError;
use std::sync::Arc;

/// Read access to model-wide state plus the shared intensive-quantity cache.
///
/// Element contexts hold a `&dyn ModelView`; worker threads share one view.
pub trait ModelView<T: FvTypes>: Sync {
    fn problem(&self) -> &T::Problem;

    /// Solution vector of history level `time_idx`, indexed by global dof.
    fn solution(&self, time_idx: usize) -> &[T::PrimaryVariables];

    /// Total volume of the control volume of `global_idx` over all elements.
    fn dof_total_volume(&self, global_idx: usize) -> f64;

    /// Up-to-date cached intensive quantities, if any.
    fn cached_intensive_quantities(&self, global_idx: usize, time_idx: usize) -> Option<Arc<T::IntensiveQuantities>>;

    /// Offer freshly computed quantities to the cache.
    fn update_cached_intensive_quantities(&self, quantities: &T::IntensiveQuantities, global_idx: usize, time_idx: usize);

    /// A previous bundle usable as a starting guess, if any.
    fn thermodynamic_hint(&self, global_idx: usize, time_idx: usize) -> Option<Arc<T::IntensiveQuantities>>;
}

/// Solution vectors of the current and `H - 1` previous time levels.
#[derive(Clone, Debug)]
pub struct SolutionHistory<PV, const H: usize> {
    levels: [Vec<PV>; H],
}

impl<PV: Clone, const H: usize> SolutionHistory<PV, H> {
    /// Every level starts as a copy of `initial`.
    pub fn new(initial: Vec<PV>) -> Self {
        Self {
            levels: std::array::from_fn(|_| initial.clone()),
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.levels[0].len()
    }

    /// # Panics
    /// If `time_idx >= H`.
    pub fn level(&self, time_idx: usize) -> &[PV] {
        assert!(time_idx < H, "time index {time_idx} out of range for history of {H}");
        &self.levels[time_idx]
    }

    /// # Panics
    /// If `time_idx >= H`.
    pub fn level_mut(&mut self, time_idx: usize) -> &mut [PV] {
        assert!(time_idx < H, "time index {time_idx} out of range for history of {H}");
        &mut self.levels[time_idx]
    }

    /// Accept the current level: level `k` becomes level `k + 1` and the new
    /// current level starts from the accepted solution.
    pub fn advance(&mut self) {
        if H < 2 {
            return;
        }
        self.levels.rotate_right(1);
        self.levels[0] = self.levels[1].clone();
    }
}

/// Model-wide state of one partition: problem, solution history, dof
/// volumes and the intensive-quantity cache.
pub struct DiscreteModel<T: FvTypes, const H: usize = 2> {
    problem: T::Problem,
    solution: SolutionHistory<T::PrimaryVariables, H>,
    dof_volumes: Vec<f64>,
    cache: IntensiveQuantityCache<T::IntensiveQuantities>,
}

impl<T: FvTypes, const H: usize> DiscreteModel<T, H> {
    /// `initial` and `dof_volumes` are indexed by global dof.
    pub fn new(
        problem: T::Problem,
        initial: Vec<T::PrimaryVariables>,
        dof_volumes: Vec<f64>,
        cache_config: CacheConfig,
    ) -> Result<Self, FvError> {
        if dof_volumes.len() != initial.len() {
            return Err(FvError::InvalidConfig(format!(
                "{} dof volumes for {} dofs",
                dof_volumes.len(),
                initial.len()
            )));
        }
        let num_dofs = initial.len();
        log::debug!("discrete model with {num_dofs} dofs and {H} history levels");
        Ok(Self {
            problem,
            solution: SolutionHistory::new(initial),
            dof_volumes,
            cache: IntensiveQuantityCache::new(H, num_dofs, cache_config),
        })
    }

    pub fn num_dofs(&self) -> usize {
        self.solution.num_dofs()
    }

    pub fn problem_mut(&mut self) -> &mut T::Problem {
        &mut self.problem
    }

    pub fn solution_history(&self) -> &SolutionHistory<T::PrimaryVariables, H> {
        &self.solution
    }

    /// Mutable access to level `time_idx`; its cache entries become stale.
    pub fn solution_mut(&mut self, time_idx: usize) -> &mut [T::PrimaryVariables] {
        self.cache.invalidate_level(time_idx);
        self.solution.level_mut(time_idx)
    }

    /// Accept the current time step.
    pub fn advance_time_level(&mut self) {
        self.solution.advance();
        self.cache.shift_history();
    }

    pub fn intensive_quantity_cache(&self) -> &IntensiveQuantityCache<T::IntensiveQuantities> {
        &self.cache
    }

    pub fn intensive_quantity_cache_mut(&mut self) -> &mut IntensiveQuantityCache<T::IntensiveQuantities> {
        &mut self.cache
    }
}

impl<T: FvTypes, const H: usize> ModelView<T> for DiscreteModel<T, H> {
    fn problem(&self) -> &T::Problem {
        &self.problem
    }

    fn solution(&self, time_idx: usize) -> &[T::PrimaryVariables] {
        self.solution.level(time_idx)
    }

    fn dof_total_volume(&self, global_idx: usize) -> f64 {
        self.dof_volumes[global_idx]
    }

    fn cached_intensive_quantities(&self, global_idx: usize, time_idx: usize) -> Option<Arc<T::IntensiveQuantities>> {
        self.cache.cached(global_idx, time_idx)
    }

    fn update_cached_intensive_quantities(&self, quantities: &T::IntensiveQuantities, global_idx: usize, time_idx: usize) {
        self.cache.store(quantities, global_idx, time_idx);
    }

    fn thermodynamic_hint(&self, global_idx: usize, time_idx: usize) -> Option<Arc<T::IntensiveQuantities>> {
        self.cache.hint(global_idx, time_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_shifts_levels() {
        let mut h = SolutionHistory::<f64, 3>::new(vec![1.0, 2.0]);
        h.level_mut(0)[0] = 5.0;
        h.advance();
        assert_eq!(h.level(0), &[5.0, 2.0]);
        assert_eq!(h.level(1), &[5.0, 2.0]);
        assert_eq!(h.level(2), &[1.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn level_is_bounds_checked() {
        let h = SolutionHistory::<f64, 2>::new(vec![]);
        let _ = h.level(2);
    }
}
