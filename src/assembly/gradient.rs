//! Face values and gradients from the intensive quantities of a stencil.

use crate::assembly::element_context::ElementContext;
use crate::assembly::stencil::{Position, Stencil};
use crate::assembly::types::{FvTypes, GradientCalculator};

/// Calculator for models whose fluxes need no gradients.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoGradients;

impl<T: FvTypes> GradientCalculator<T> for NoGradients {
    fn prepare<const H: usize>(&mut self, _ctx: &ElementContext<'_, T, H>, _time_idx: usize) {}
}

/// Two-point flux approximation: gradients along the line connecting the two
/// dofs of a face, values as the arithmetic mean of both sides.
#[derive(Clone, Debug, Default)]
pub struct TwoPointGradientCalculator {
    /// Per interior face: exterior minus interior dof position, and its
    /// squared length.
    distances: Vec<(Position, f64)>,
}

impl<T: FvTypes> GradientCalculator<T> for TwoPointGradientCalculator {
    fn prepare<const H: usize>(&mut self, ctx: &ElementContext<'_, T, H>, _time_idx: usize) {
        let stencil = ctx.stencil();
        self.distances.clear();
        self.distances.extend((0..ctx.num_interior_faces()).map(|face_idx| {
            let face = stencil.interior_face(face_idx);
            let inner = stencil.sub_control_volume(face.interior_index).global_pos;
            let outer = stencil.sub_control_volume(face.exterior_index).global_pos;
            let d: Position = std::array::from_fn(|k| outer[k] - inner[k]);
            (d, d.iter().map(|c| c * c).sum::<f64>())
        }));
    }
}

impl TwoPointGradientCalculator {
    /// Mean of `f` over the two dofs adjacent to `face_idx`.
    pub fn calculate_value<T, const H: usize, F>(
        &self,
        ctx: &ElementContext<'_, T, H>,
        face_idx: usize,
        time_idx: usize,
        f: F,
    ) -> f64
    where
        T: FvTypes,
        F: Fn(&T::IntensiveQuantities) -> f64,
    {
        let face = ctx.stencil().interior_face(face_idx);
        let inner = f(ctx.intensive_quantities(face.interior_index, time_idx));
        let outer = f(ctx.intensive_quantities(face.exterior_index, time_idx));
        0.5 * (inner + outer)
    }

    /// Gradient of `f` at `face_idx`, projected onto the dof-to-dof line.
    ///
    /// Zero for coincident dof positions.
    ///
    /// # Panics
    /// If [`prepare`](GradientCalculator::prepare) has not been run for the
    /// current stencil.
    pub fn calculate_gradient<T, const H: usize, F>(
        &self,
        ctx: &ElementContext<'_, T, H>,
        face_idx: usize,
        time_idx: usize,
        f: F,
    ) -> Position
    where
        T: FvTypes,
        F: Fn(&T::IntensiveQuantities) -> f64,
    {
        let (d, len2) = self.distances[face_idx];
        if len2 == 0.0 {
            return [0.0; 3];
        }
        let face = ctx.stencil().interior_face(face_idx);
        let delta = f(ctx.intensive_quantities(face.exterior_index, time_idx))
            - f(ctx.intensive_quantities(face.interior_index, time_idx));
        d.map(|c| c * delta / len2)
    }
}
