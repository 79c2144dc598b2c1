#![allow(dead_code)]
//! Shared fixtures: a 1-D line of cells, a slightly compressible tracer
//! model on it, and helpers to run one closure per in-process rank.

use fvbox::algs::communicator::RayonComm;
use fvbox::assembly::{
    CellCenteredStencil, CellGrid, DiscreteModel, ElementContext, ExtensiveQuantities, FvTypes,
    IntensiveQuantities, Intersection, LocalResidual, Position, Stencil,
    TwoPointGradientCalculator,
};
use fvbox::config::{CacheConfig, ContextConfig};
use fvbox::rate::{ComponentRateVector, RateBasis, RateLayout};
use fvbox::FvError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const RHO0: f64 = 1000.0;
pub const COMPRESSIBILITY: f64 = 1e-3;

/// `n` cells of width `dx` along x, unit cross-section.
#[derive(Clone, Debug)]
pub struct LineGrid {
    pub n: usize,
    pub dx: f64,
}

impl CellGrid for LineGrid {
    fn num_cells(&self) -> usize {
        self.n
    }

    fn cell_center(&self, cell: usize) -> Position {
        [(cell as f64 + 0.5) * self.dx, 0.5, 0.5]
    }

    fn cell_volume(&self, _cell: usize) -> f64 {
        self.dx
    }

    fn intersections(&self, cell: usize) -> Vec<Intersection> {
        let x = cell as f64 * self.dx;
        vec![
            Intersection {
                neighbor: cell.checked_sub(1),
                normal: [-1.0, 0.0, 0.0],
                area: 1.0,
                center: [x, 0.5, 0.5],
            },
            Intersection {
                neighbor: (cell + 1 < self.n).then_some(cell + 1),
                normal: [1.0, 0.0, 0.0],
                area: 1.0,
                center: [x + self.dx, 0.5, 0.5],
            },
        ]
    }
}

#[derive(Debug, Default)]
pub struct TracerProblem {
    pub porosity: f64,
    pub mobility: f64,
    /// Number of intensive quantity computations so far.
    pub updates: AtomicUsize,
}

impl TracerProblem {
    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TracerIq {
    pub pressure: f64,
    pub saturation: f64,
    pub density: f64,
    pub storage: f64,
    /// Filled by the gradient pass: mean pressure over the element's dofs.
    pub element_mean_pressure: f64,
}

impl TracerIq {
    /// What `update` followed by the gradient pass must produce.
    pub fn reference(problem: &TracerProblem, pv: &[f64; 2], element_mean_pressure: f64) -> Self {
        let density = RHO0 * (1.0 + COMPRESSIBILITY * pv[0]);
        TracerIq {
            pressure: pv[0],
            saturation: pv[1],
            density,
            storage: problem.porosity * density * pv[1],
            element_mean_pressure,
        }
    }
}

impl IntensiveQuantities<Tracer> for TracerIq {
    fn update<const H: usize>(
        &mut self,
        ctx: &ElementContext<'_, Tracer, H>,
        dof_idx: usize,
        time_idx: usize,
    ) -> Result<(), FvError> {
        let problem = ctx.problem();
        problem.updates.fetch_add(1, Ordering::SeqCst);
        let pv = ctx.primary_vars(dof_idx, time_idx);
        if pv[1] < 0.0 {
            return Err(FvError::quantity_update(dof_idx, time_idx, "negative saturation"));
        }
        *self = TracerIq::reference(problem, pv, 0.0);
        Ok(())
    }

    fn update_scv_gradients<const H: usize>(
        &mut self,
        ctx: &ElementContext<'_, Tracer, H>,
        _dof_idx: usize,
        time_idx: usize,
    ) -> Result<(), FvError> {
        self.element_mean_pressure = mean_pressure(ctx, time_idx);
        Ok(())
    }
}

pub fn mean_pressure<const H: usize>(ctx: &ElementContext<'_, Tracer, H>, time_idx: usize) -> f64 {
    let n = ctx.num_dof();
    (0..n).map(|d| ctx.primary_vars(d, time_idx)[0]).sum::<f64>() / n as f64
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TracerFlux {
    pub pressure_gradient: Position,
    pub face_pressure: f64,
    /// Outflow through the face, from the interior to the exterior dof.
    pub volume_flux: f64,
}

impl ExtensiveQuantities<Tracer> for TracerFlux {
    fn update<const H: usize>(
        &mut self,
        ctx: &ElementContext<'_, Tracer, H>,
        face_idx: usize,
        time_idx: usize,
    ) -> Result<(), FvError> {
        let calc = ctx.gradient_calculator();
        self.pressure_gradient = calc.calculate_gradient(ctx, face_idx, time_idx, |iq: &TracerIq| iq.pressure);
        self.face_pressure = calc.calculate_value(ctx, face_idx, time_idx, |iq: &TracerIq| iq.pressure);
        let face = ctx.stencil().interior_face(face_idx);
        let dpdn: f64 = self
            .pressure_gradient
            .iter()
            .zip(&face.normal)
            .map(|(g, n)| g * n)
            .sum();
        self.volume_flux = -ctx.problem().mobility * dpdn * face.area;
        Ok(())
    }
}

pub struct TracerLayout;

impl RateLayout for TracerLayout {
    const CONTI0_EQ_IDX: usize = 0;
    const NUM_COMPONENTS: usize = 2;
    const BASIS: RateBasis = RateBasis::Mass;
    fn molar_mass(comp_idx: usize) -> f64 {
        [0.018, 0.030][comp_idx]
    }
}

pub struct Tracer;

impl FvTypes for Tracer {
    type Problem = TracerProblem;
    type PrimaryVariables = [f64; 2];
    type IntensiveQuantities = TracerIq;
    type ExtensiveQuantities = TracerFlux;
    type GradientCalculator = TwoPointGradientCalculator;
    type Stencil = CellCenteredStencil<Arc<LineGrid>>;
    type RateVector = ComponentRateVector<TracerLayout, 2>;
}

/// Storage of the primary dofs plus the face fluxes, added to both sides.
pub struct TracerResidual;

impl LocalResidual<Tracer> for TracerResidual {
    fn eval<const H: usize>(
        &self,
        ctx: &ElementContext<'_, Tracer, H>,
        residual: &mut [<Tracer as FvTypes>::RateVector],
    ) -> Result<(), FvError> {
        for dof in 0..ctx.num_primary_dof() {
            let iq = ctx.intensive_quantities(dof, 0);
            let vol = ctx.dof_volume(dof);
            residual[dof][0] += iq.storage * vol;
            residual[dof][1] += iq.density * vol;
        }
        for face_idx in 0..ctx.num_interior_faces() {
            let flux = ctx.extensive_quantities(face_idx, 0).volume_flux;
            let face = ctx.stencil().interior_face(face_idx);
            residual[face.interior_index][0] += flux;
            residual[face.exterior_index][0] -= flux;
        }
        Ok(())
    }
}

pub fn line_grid(n: usize) -> Arc<LineGrid> {
    Arc::new(LineGrid { n, dx: 1.0 })
}

/// Pressure rises and saturation grows from left to right.
pub fn initial_state(n: usize) -> Vec<[f64; 2]> {
    (0..n)
        .map(|i| [1.0 + 0.1 * i as f64, 0.2 + 0.05 * i as f64])
        .collect()
}

pub fn tracer_model(n: usize, cache: CacheConfig) -> DiscreteModel<Tracer> {
    let problem = TracerProblem {
        porosity: 0.3,
        mobility: 2.0,
        updates: AtomicUsize::new(0),
    };
    DiscreteModel::new(problem, initial_state(n), vec![1.0; n], cache).expect("consistent model")
}

pub fn context<'m>(model: &'m DiscreteModel<Tracer>, grid: &Arc<LineGrid>) -> ElementContext<'m, Tracer> {
    ElementContext::new(
        model,
        CellCenteredStencil::new(Arc::clone(grid)),
        ContextConfig::default(),
    )
}

/// Run `f` once per rank of a fresh in-process world, each on its own thread.
pub fn run_ranks<R, F>(size: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(&RayonComm) -> R + Sync,
{
    let world = RayonComm::world(size);
    std::thread::scope(|s| {
        let handles: Vec<_> = world
            .iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}
