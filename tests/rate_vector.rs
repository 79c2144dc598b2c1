use fvbox::rate::{ComponentRateVector, FluidStateView, RateBasis, RateLayout, RateVector};

/// Two components in mass units followed by an energy equation.
struct Thermal;

impl RateLayout for Thermal {
    const CONTI0_EQ_IDX: usize = 0;
    const NUM_COMPONENTS: usize = 2;
    const ENERGY_EQ_IDX: Option<usize> = Some(2);
    const BASIS: RateBasis = RateBasis::Mass;

    fn molar_mass(comp_idx: usize) -> f64 {
        [0.018, 0.044][comp_idx]
    }
}

/// Pressure equation first, then two components in molar units.
struct Shifted;

impl RateLayout for Shifted {
    const CONTI0_EQ_IDX: usize = 1;
    const NUM_COMPONENTS: usize = 2;
    const BASIS: RateBasis = RateBasis::Molar;

    fn molar_mass(comp_idx: usize) -> f64 {
        [0.018, 0.044][comp_idx]
    }
}

/// One phase of brine with dissolved CO2.
struct Brine;

impl FluidStateView for Brine {
    fn density(&self, _phase_idx: usize) -> f64 {
        1050.0
    }
    fn molar_density(&self, _phase_idx: usize) -> f64 {
        57_000.0
    }
    fn mass_fraction(&self, _phase_idx: usize, comp_idx: usize) -> f64 {
        [0.96, 0.04][comp_idx]
    }
    fn mole_fraction(&self, _phase_idx: usize, comp_idx: usize) -> f64 {
        [0.98, 0.02][comp_idx]
    }
    fn enthalpy(&self, _phase_idx: usize) -> f64 {
        2.0e5
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * (1.0 + b.abs())
}

#[test]
fn volumetric_rate_in_mass_units_with_energy() {
    let mut r = ComponentRateVector::<Thermal, 3>::default();
    r.set_volumetric_rate(&Brine, 0, 0.5);
    assert!(close(r[0], 1050.0 * 0.96 * 0.5));
    assert!(close(r[1], 1050.0 * 0.04 * 0.5));
    assert!(close(r[2], 1050.0 * 2.0e5 * 0.5));
}

#[test]
fn volumetric_rate_in_molar_units_leaves_other_equations() {
    let mut r = ComponentRateVector::<Shifted, 3>::new([7.0, 0.0, 0.0]);
    r.set_volumetric_rate(&Brine, 0, 2.0);
    assert_eq!(r[0], 7.0);
    assert!(close(r[1], 57_000.0 * 0.98 * 2.0));
    assert!(close(r[2], 57_000.0 * 0.02 * 2.0));
}

#[test]
fn basis_conversions_touch_components_only() {
    let mut r = ComponentRateVector::<Shifted, 3>::default();
    r.set_mass_rate(&[5.0, 0.018, 0.088]);
    assert_eq!(r.as_slice(), &[5.0, 1.0, 2.0]);

    let mut m = ComponentRateVector::<Thermal, 3>::default();
    m.set_molar_rate(&[1.0, 2.0, 300.0]);
    assert!(close(m[0], 0.018));
    assert!(close(m[1], 0.088));
    assert_eq!(m[2], 300.0);
}

#[test]
fn enthalpy_rate_without_energy_equation_is_ignored() {
    let mut r = ComponentRateVector::<Shifted, 3>::splat(1.0);
    r.set_enthalpy_rate(42.0);
    assert_eq!(r, ComponentRateVector::splat(1.0));
}

#[test]
#[should_panic(expected = "expected 3")]
fn wrong_rate_length_panics() {
    let mut r = ComponentRateVector::<Thermal, 3>::default();
    r.set_mass_rate(&[1.0, 2.0]);
}

#[test]
fn accumulates_and_resets() {
    let mut a = ComponentRateVector::<Thermal, 3>::new([1.0, 2.0, 3.0]);
    a += &ComponentRateVector::splat(0.5);
    assert_eq!(a.as_slice(), &[1.5, 2.5, 3.5]);
    a.as_mut_slice()[1] = -1.0;
    assert_eq!(a[1], -1.0);
    a.assign_scalar(0.0);
    assert_eq!(a, ComponentRateVector::default());
}
