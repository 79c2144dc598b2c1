//! Rate vectors: per-equation residual contributions.
//!
//! A rate vector holds one entry per conservation equation. Models fill it
//! from mass, molar, volumetric or enthalpy rates and the storage basis of the
//! concrete vector decides which conversions apply.

pub mod component_rate_vector;

pub use component_rate_vector::{ComponentRateVector, RateBasis, RateLayout};

use std::fmt::Debug;
use std::ops::{Index, IndexMut};

/// Thermodynamic state of a fluid, as far as rate conversions need it.
pub trait FluidStateView {
    /// Mass density of `phase_idx` \[kg/m^3\].
    fn density(&self, phase_idx: usize) -> f64;
    /// Molar density of `phase_idx` \[mol/m^3\].
    fn molar_density(&self, phase_idx: usize) -> f64;
    fn mass_fraction(&self, phase_idx: usize, comp_idx: usize) -> f64;
    fn mole_fraction(&self, phase_idx: usize, comp_idx: usize) -> f64;
    /// Specific enthalpy of `phase_idx` \[J/kg\].
    fn enthalpy(&self, phase_idx: usize) -> f64;
}

/// Fixed-length vector of equation contributions.
pub trait RateVector:
    Clone + Default + Debug + Send + Index<usize, Output = f64> + IndexMut<usize, Output = f64>
{
    /// Number of equations.
    const NUM_EQ: usize;

    /// Set every entry to `value`.
    fn assign_scalar(&mut self, value: f64);

    /// Assign from rates given per unit mass.
    ///
    /// # Panics
    /// If `rates.len() != NUM_EQ`.
    fn set_mass_rate(&mut self, rates: &[f64]);

    /// Assign from rates given per mole.
    ///
    /// # Panics
    /// If `rates.len() != NUM_EQ`.
    fn set_molar_rate(&mut self, rates: &[f64]);

    /// Set the energy equation entry. No-op without an energy equation.
    fn set_enthalpy_rate(&mut self, rate: f64);

    /// Assign the rates of `volume` of phase `phase_idx` in state `fs`.
    fn set_volumetric_rate<F: FluidStateView>(&mut self, fs: &F, phase_idx: usize, volume: f64);

    fn as_slice(&self) -> &[f64];
    fn as_mut_slice(&mut self) -> &mut [f64];
}
