mod util;

use fvbox::assembly::{EvalPoint, FiniteDifferenceLinearizer};
use fvbox::config::{CacheConfig, DifferenceMethod, LinearizerConfig};
use fvbox::FvError;
use util::*;

fn linearizer(difference: DifferenceMethod) -> FiniteDifferenceLinearizer<Tracer> {
    FiniteDifferenceLinearizer::new(LinearizerConfig {
        base_epsilon: 1e-6,
        difference,
    })
    .unwrap()
}

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * (1.0 + b.abs())
}

#[test]
fn jacobian_matches_analytic_derivatives() {
    let grid = line_grid(3);
    let model = tracer_model(3, CacheConfig::default());
    let mut ctx = context(&model, &grid);
    ctx.update_all(&1).unwrap();

    let [p0, s0] = *ctx.primary_vars(0, 0);
    let (phi, mob) = (0.3, 2.0);

    for method in [DifferenceMethod::Central, DifferenceMethod::Forward, DifferenceMethod::Backward] {
        let mut lin = linearizer(method);
        lin.linearize(&mut ctx, &TracerResidual).unwrap();
        let jac = lin.jacobian();
        assert_eq!((jac.num_dof(), jac.num_primary_dof(), jac.num_eq(), jac.num_pv()), (3, 1, 2, 2));

        // storage plus two faces, each contributing mobility * area / dx
        let d_mass_dp = phi * RHO0 * COMPRESSIBILITY * s0 + 2.0 * mob;
        let d_mass_ds = phi * RHO0 * (1.0 + COMPRESSIBILITY * p0);
        assert!(close(jac.get(0, 0, 0, 0), d_mass_dp, 1e-5), "{method:?}: {}", jac.get(0, 0, 0, 0));
        assert!(close(jac.get(0, 0, 0, 1), d_mass_ds, 1e-5), "{method:?}");
        assert!(close(jac.get(0, 1, 0, 0), RHO0 * COMPRESSIBILITY, 1e-5), "{method:?}");
        assert!(close(jac.get(0, 1, 0, 1), 0.0, 1e-5), "{method:?}");
        // the neighbours see the opposite face flux
        assert!(close(jac.get(1, 0, 0, 0), -mob, 1e-5), "{method:?}");
        assert!(close(jac.get(2, 0, 0, 0), -mob, 1e-5), "{method:?}");
    }
}

#[test]
fn linearization_leaves_context_untouched() {
    let grid = line_grid(4);
    let model = tracer_model(4, CacheConfig::default());
    let mut ctx = context(&model, &grid);
    ctx.update_all(&2).unwrap();

    let iqs: Vec<_> = (0..ctx.num_dof()).map(|d| ctx.intensive_quantities(d, 0).clone()).collect();
    let fluxes: Vec<_> = (0..ctx.num_interior_faces())
        .map(|f| ctx.extensive_quantities(f, 0).clone())
        .collect();

    let mut lin = linearizer(DifferenceMethod::Central);
    lin.linearize(&mut ctx, &TracerResidual).unwrap();

    assert_eq!(ctx.eval_point(), EvalPoint::Live);
    assert_eq!(ctx.saved_dof_idx(), None);
    for (d, iq) in iqs.iter().enumerate() {
        assert_eq!(ctx.intensive_quantities(d, 0), iq);
    }
    for (f, flux) in fluxes.iter().enumerate() {
        assert_eq!(ctx.extensive_quantities(f, 0), flux);
    }
    // residual of the unperturbed state: storage of dof 0 plus net outflow
    let iq0 = &iqs[0];
    let net: f64 = fluxes.iter().map(|f| f.volume_flux).sum();
    assert!(close(lin.residual()[0][0], iq0.storage + net, 1e-12));
}

#[test]
fn failing_perturbation_restores_state() {
    let grid = line_grid(3);
    let mut model = tracer_model(3, CacheConfig::default());
    // zero saturation: the backward step in saturation goes negative
    model.solution_mut(0)[1] = [1.0, 0.0];
    let mut ctx = context(&model, &grid);
    ctx.update_all(&1).unwrap();
    let iq = ctx.intensive_quantities(0, 0).clone();

    let mut lin = linearizer(DifferenceMethod::Central);
    let err = lin.linearize(&mut ctx, &TracerResidual).unwrap_err();
    assert!(matches!(err, FvError::QuantityUpdate { dof_idx: 0, .. }));
    assert_eq!(ctx.intensive_quantities(0, 0), &iq);
    assert_eq!(ctx.eval_point(), EvalPoint::Live);
}

#[test]
fn epsilon_scales_with_magnitude() {
    let lin = linearizer(DifferenceMethod::Forward);
    assert_eq!(lin.numeric_epsilon(0.0), 1e-6);
    assert!((lin.numeric_epsilon(-99.0) - 1e-4).abs() < 1e-18);
    assert!(matches!(
        FiniteDifferenceLinearizer::<Tracer>::new(LinearizerConfig {
            base_epsilon: -1.0,
            ..Default::default()
        }),
        Err(FvError::InvalidConfig(_))
    ));
}
