//! Rate vector for compositional models with optional energy equation.

use super::{FluidStateView, RateVector};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{AddAssign, Index, IndexMut};

/// Unit in which component equations are stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RateBasis {
    /// Component entries are mass rates \[kg/s\].
    Mass,
    /// Component entries are molar rates \[mol/s\].
    Molar,
}

/// Equation layout of a model: where the continuity equations start, how many
/// components there are and where the energy equation lives.
pub trait RateLayout: Send + Sync + 'static {
    /// Index of the continuity equation of component 0.
    const CONTI0_EQ_IDX: usize;
    const NUM_COMPONENTS: usize;
    const ENERGY_EQ_IDX: Option<usize> = None;
    const BASIS: RateBasis;

    /// Molar mass of `comp_idx` \[kg/mol\].
    fn molar_mass(comp_idx: usize) -> f64;
}

/// `N` equation entries laid out according to `L`.
pub struct ComponentRateVector<L: RateLayout, const N: usize> {
    values: [f64; N],
    _layout: PhantomData<fn() -> L>,
}

impl<L: RateLayout, const N: usize> ComponentRateVector<L, N> {
    pub fn new(values: [f64; N]) -> Self {
        debug_assert!(L::CONTI0_EQ_IDX + L::NUM_COMPONENTS <= N);
        Self {
            values,
            _layout: PhantomData,
        }
    }

    pub fn splat(value: f64) -> Self {
        Self::new([value; N])
    }

    fn components(&mut self) -> impl Iterator<Item = (usize, &mut f64)> {
        self.values[L::CONTI0_EQ_IDX..L::CONTI0_EQ_IDX + L::NUM_COMPONENTS]
            .iter_mut()
            .enumerate()
    }

    fn copy_from(&mut self, rates: &[f64]) {
        assert_eq!(rates.len(), N, "rate slice has {} entries, expected {N}", rates.len());
        self.values.copy_from_slice(rates);
    }
}

impl<L: RateLayout, const N: usize> RateVector for ComponentRateVector<L, N> {
    const NUM_EQ: usize = N;

    fn assign_scalar(&mut self, value: f64) {
        self.values.fill(value);
    }

    fn set_mass_rate(&mut self, rates: &[f64]) {
        self.copy_from(rates);
        if L::BASIS == RateBasis::Molar {
            for (comp, v) in self.components() {
                *v /= L::molar_mass(comp);
            }
        }
    }

    fn set_molar_rate(&mut self, rates: &[f64]) {
        self.copy_from(rates);
        if L::BASIS == RateBasis::Mass {
            for (comp, v) in self.components() {
                *v *= L::molar_mass(comp);
            }
        }
    }

    fn set_enthalpy_rate(&mut self, rate: f64) {
        if let Some(eq) = L::ENERGY_EQ_IDX {
            self.values[eq] = rate;
        }
    }

    fn set_volumetric_rate<F: FluidStateView>(&mut self, fs: &F, phase_idx: usize, volume: f64) {
        for (comp, v) in self.components() {
            *v = match L::BASIS {
                RateBasis::Mass => fs.density(phase_idx) * fs.mass_fraction(phase_idx, comp),
                RateBasis::Molar => fs.molar_density(phase_idx) * fs.mole_fraction(phase_idx, comp),
            } * volume;
        }
        self.set_enthalpy_rate(fs.density(phase_idx) * fs.enthalpy(phase_idx) * volume);
    }

    fn as_slice(&self) -> &[f64] {
        &self.values
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }
}

impl<L: RateLayout, const N: usize> Default for ComponentRateVector<L, N> {
    fn default() -> Self {
        Self::splat(0.0)
    }
}

impl<L: RateLayout, const N: usize> Clone for ComponentRateVector<L, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L: RateLayout, const N: usize> Copy for ComponentRateVector<L, N> {}

impl<L: RateLayout, const N: usize> PartialEq for ComponentRateVector<L, N> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<L: RateLayout, const N: usize> fmt::Debug for ComponentRateVector<L, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentRateVector").field(&self.values).finish()
    }
}

impl<L: RateLayout, const N: usize> Index<usize> for ComponentRateVector<L, N> {
    type Output = f64;
    fn index(&self, eq_idx: usize) -> &f64 {
        &self.values[eq_idx]
    }
}

impl<L: RateLayout, const N: usize> IndexMut<usize> for ComponentRateVector<L, N> {
    fn index_mut(&mut self, eq_idx: usize) -> &mut f64 {
        &mut self.values[eq_idx]
    }
}

impl<L: RateLayout, const N: usize> AddAssign<&Self> for ComponentRateVector<L, N> {
    fn add_assign(&mut self, rhs: &Self) {
        for (a, b) in self.values.iter_mut().zip(&rhs.values) {
            *a += b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flash2;
    impl RateLayout for Flash2 {
        const CONTI0_EQ_IDX: usize = 0;
        const NUM_COMPONENTS: usize = 2;
        const BASIS: RateBasis = RateBasis::Molar;
        fn molar_mass(comp_idx: usize) -> f64 {
            [0.018, 0.044][comp_idx]
        }
    }

    #[test]
    fn molar_basis_converts_mass_input() {
        let mut r = ComponentRateVector::<Flash2, 2>::default();
        r.set_mass_rate(&[0.018, 0.088]);
        assert!((r[0] - 1.0).abs() < 1e-12);
        assert!((r[1] - 2.0).abs() < 1e-12);
        r.set_molar_rate(&[3.0, 4.0]);
        assert_eq!(r.as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn enthalpy_without_energy_equation_is_ignored() {
        let mut r = ComponentRateVector::<Flash2, 2>::splat(1.0);
        r.set_enthalpy_rate(5.0);
        assert_eq!(r.as_slice(), &[1.0, 1.0]);
    }
}
