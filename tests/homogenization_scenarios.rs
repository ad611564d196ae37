//! End-to-end homogenization scenarios (`spec.md` §8, S1-S6).
//!
//! Mirrors `fea-solver`'s `tests/von_mises_plate_pinned_corners.rs` in
//! placement (integration test under `tests/`, one scenario per concrete
//! grid/material combination) rather than in API shape, since a structural
//! frame test and a periodic homogenization scenario check different
//! things.

use approx::assert_abs_diff_eq;
use nalgebra::DMatrix;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use cellhom::elements::{
    ElasticMaterial, Hex20, Hex8, PiezoelectricMaterial, Quad4, Quad8, ReferenceElement,
    TransportMaterial,
};
use cellhom::error::CellError;
use cellhom::grid::{Grid, PeriodicGrid};
use cellhom::policy::{ElasticPolicy, Negative, PiezoPolicy, Positive, TransportPolicy};
use cellhom::results::SolverOptions;
use cellhom::solver::PeriodicCellSolver;

const NUMERICAL_ZERO: f64 = cellhom::NUMERICAL_ZERO;

/// Density-weighted arithmetic-mean (Voigt) and harmonic-mean (Reuss) bound
/// on a homogenized tensor that scales linearly with density, `C(rho) = rho
/// * base`. `tr(Reuss) <= tr(base-tensor-homogenized) <= tr(Voigt)`
/// (`spec.md` §8 "Material" property 1, §GLOSSARY "Voigt / Reuss bounds").
fn voigt_reuss_trace_bounds(densities: &[f64], base_trace: f64) -> (f64, f64) {
    let n = densities.len() as f64;
    let arithmetic_mean = densities.iter().sum::<f64>() / n;
    let harmonic_mean = n / densities.iter().map(|&rho| 1.0 / rho).sum::<f64>();
    (harmonic_mean * base_trace, arithmetic_mean * base_trace)
}

fn is_symmetric(m: &DMatrix<f64>, tol: f64) -> bool {
    (0..m.nrows()).all(|i| (0..m.ncols()).all(|j| (m[(i, j)] - m[(j, i)]).abs() < tol))
}

fn is_positive_definite(m: &DMatrix<f64>) -> bool {
    m.clone().cholesky().is_some()
}

/// S1: Quad8 3x3, size (1,1), densities = 1.0, elastic (E=1, nu=0.3, plane
/// stress). C_bar equals the base Voigt stiffness to NUMERICAL_ZERO.
#[test]
fn s1_solid_cell_recovers_base_elastic_stiffness() {
    let mut grid = Grid::<Quad8>::new(vec![3, 3], vec![1.0, 1.0]).unwrap();
    grid.set_densities_from_ones();
    let material = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
    let solver =
        PeriodicCellSolver::<Quad8, ElasticPolicy<Quad8>>::new(&grid, &material, SolverOptions::default())
            .unwrap();
    let result = solver.solve().unwrap();
    assert_abs_diff_eq!(result.c_bar().clone(), material.c, epsilon = 10.0 * NUMERICAL_ZERO);
}

/// S2: Quad8 3x3, densities = 0.0 (clamped to NUMERICAL_ZERO). C_bar is the
/// zero 3x3 matrix to 10*NUMERICAL_ZERO.
#[test]
fn s2_vanishing_density_cell_gives_zero_tensor() {
    let mut grid = Grid::<Quad8>::new(vec![3, 3], vec![1.0, 1.0]).unwrap();
    grid.set_densities_from_zeros();
    let material = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
    let solver =
        PeriodicCellSolver::<Quad8, ElasticPolicy<Quad8>>::new(&grid, &material, SolverOptions::default())
            .unwrap();
    let result = solver.solve().unwrap();
    for v in result.c_bar().iter() {
        assert_abs_diff_eq!(*v, 0.0, epsilon = 10.0 * NUMERICAL_ZERO);
    }
}

/// S3: Quad8 2x2, size (0.5,0.5), densities from the documented seeded RNG.
/// Checks symmetry, positive definiteness, Voigt/Reuss trace bounds, and
/// translational invariance (Open Question 4: the exact S3 density sequence
/// in `spec.md` is illustrative; this implementation's `rng(seed)` variant is
/// `StdRng` + `Uniform(NUMERICAL_ZERO, 1.0)`, so the scenario is checked by
/// its properties rather than by the literal listed values).
#[test]
fn s3_random_density_cell_satisfies_bounds_and_translational_invariance() {
    let mut grid_a = Grid::<Quad8>::new(vec![2, 2], vec![0.5, 0.5]).unwrap();
    grid_a.set_densities_from_rng(1234);
    let densities: Vec<f64> = (0..grid_a.num_elements())
        .map(|i| (&grid_a as &dyn PeriodicGrid).density(i).unwrap())
        .collect();

    let material = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
    let solver_a =
        PeriodicCellSolver::<Quad8, ElasticPolicy<Quad8>>::new(&grid_a, &material, SolverOptions::default())
            .unwrap();
    let result_a = solver_a.solve().unwrap();
    let c_bar = result_a.c_bar();

    assert!(is_symmetric(c_bar, 1e-8));
    assert!(is_positive_definite(c_bar));

    let base_trace: f64 = (0..material.c.nrows()).map(|i| material.c[(i, i)]).sum();
    let (reuss_trace, voigt_trace) = voigt_reuss_trace_bounds(&densities, base_trace);
    let c_bar_trace: f64 = (0..c_bar.nrows()).map(|i| c_bar[(i, i)]).sum();
    assert!(reuss_trace <= c_bar_trace + 1e-8);
    assert!(c_bar_trace <= voigt_trace + 1e-8);

    let mut grid_b = grid_a.clone();
    grid_b.translate(&[1, 1]).unwrap();
    let solver_b =
        PeriodicCellSolver::<Quad8, ElasticPolicy<Quad8>>::new(&grid_b, &material, SolverOptions::default())
            .unwrap();
    let result_b = solver_b.solve().unwrap();
    assert_abs_diff_eq!(result_a.c_bar().clone(), result_b.c_bar().clone(), epsilon = 1e-8);
}

/// S4: Hex8 2x3x4, size (0.5,1.5,2.0), densities = 1.0, elastic (E=1,
/// nu=0.3). C_bar equals the base 6x6 stiffness to NUMERICAL_ZERO.
#[test]
fn s4_solid_hex8_cell_recovers_base_3d_stiffness() {
    let mut grid = Grid::<Hex8>::new(vec![2, 3, 4], vec![0.5, 1.5, 2.0]).unwrap();
    grid.set_densities_from_ones();
    let material = ElasticMaterial::isotropic(3, 1.0, 0.3).unwrap();
    let solver =
        PeriodicCellSolver::<Hex8, ElasticPolicy<Hex8>>::new(&grid, &material, SolverOptions::default())
            .unwrap();
    let result = solver.solve().unwrap();
    assert_abs_diff_eq!(result.c_bar().clone(), material.c, epsilon = 1e-6);
}

/// S5: Quad4 3x3, size (0.5,0.5), isotropic transport K=2.1*I, densities=1,
/// under either gradient sign convention. K_bar = 2.1*I to NUMERICAL_ZERO;
/// translational invariance holds.
#[test]
fn s5_solid_transport_cell_recovers_base_conductivity_both_sign_conventions() {
    let mut grid = Grid::<Quad4>::new(vec![3, 3], vec![0.5, 0.5]).unwrap();
    grid.set_densities_from_ones();
    let material = TransportMaterial::isotropic(2, 2.1).unwrap();

    let solver_pos = PeriodicCellSolver::<Quad4, TransportPolicy<Quad4, Positive>>::new(
        &grid,
        &material,
        SolverOptions::default(),
    )
    .unwrap();
    let k_bar_pos = solver_pos.solve().unwrap();
    assert_abs_diff_eq!(k_bar_pos.k_bar().clone(), material.k, epsilon = 1e-6);

    let solver_neg = PeriodicCellSolver::<Quad4, TransportPolicy<Quad4, Negative>>::new(
        &grid,
        &material,
        SolverOptions::default(),
    )
    .unwrap();
    let k_bar_neg = solver_neg.solve().unwrap();
    assert_abs_diff_eq!(k_bar_neg.k_bar().clone(), material.k, epsilon = 1e-6);

    let mut grid_shifted = grid.clone();
    grid_shifted.translate(&[1, 1]).unwrap();
    let solver_shifted = PeriodicCellSolver::<Quad4, TransportPolicy<Quad4, Positive>>::new(
        &grid_shifted,
        &material,
        SolverOptions::default(),
    )
    .unwrap();
    let result_shifted = solver_shifted.solve().unwrap();
    assert_abs_diff_eq!(k_bar_pos.k_bar().clone(), result_shifted.k_bar().clone(), epsilon = 1e-8);
}

/// Builds a small-perturbation-of-isotropic 3D elastic stiffness: PD by
/// construction (isotropic base is PD; adding a nonnegative diagonal
/// perturbation preserves positive definiteness), with a seeded "random"
/// diagonal perturbation standing in for S6's unspecified random PD
/// stiffness generator.
fn random_pd_elastic(seed: u64) -> ElasticMaterial {
    let mut material = ElasticMaterial::isotropic(3, 1.0, 0.3).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::new(0.0, 0.2);
    for i in 0..material.c.nrows() {
        let bump = dist.sample(&mut rng);
        material.c[(i, i)] += bump;
    }
    ElasticMaterial::new(3, material.c).unwrap()
}

/// Builds a coupling tensor scaled small enough that the Schur-complement
/// stability check (`PiezoelectricMaterial::new`) is satisfied with margin:
/// `K = 2.1*I` so `K^-1 = I/2.1`, and the base isotropic elastic stiffness's
/// smallest eigenvalue is `O(1)`, so a `d` with entries of magnitude ~0.05
/// keeps `d^T K^-1 d` far below `C`'s smallest eigenvalue.
fn random_small_coupling(seed: u64, dim: usize, voigt: usize) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::new(-0.05, 0.05);
    DMatrix::from_fn(dim, voigt, |_, _| dist.sample(&mut rng))
}

/// S6: Hex20 2x2x2, size (0.5,0.5,0.5), piezoelectric with a random PD
/// stiffness, permittivity = 2.1*I, small random coupling, heterogeneous
/// densities. `PiezoPolicy::INDEFINITE` routes this solve through BiCGStab
/// rather than PCG (`spec.md` §4.5: PCG only applies when `K` is
/// SPD/PSD; the piezoelectric block's `-K_φφ` term is negative-definite, so
/// it is symmetric-but-indefinite and names BiCGStab instead), so the
/// resulting `c_bar`/`eps_bar` are checked unconditionally for positive
/// definiteness, Voigt/Reuss trace bounds, and translational invariance —
/// the same properties S1-S5 assert on their own physics.
#[test]
fn s6_piezoelectric_cell_satisfies_pd_bounds_and_translational_invariance() {
    let elastic = random_pd_elastic(99);
    let permittivity = TransportMaterial::isotropic(3, 2.1).unwrap();
    let voigt = cellhom::elements::voigt_size(3);
    let d = random_small_coupling(101, 3, voigt);
    let piezo_material =
        PiezoelectricMaterial::new(elastic.clone(), permittivity.clone(), d).unwrap();

    let mut grid_a = Grid::<Hex20>::new(vec![2, 2, 2], vec![0.5, 0.5, 0.5]).unwrap();
    grid_a.set_densities_from_rng(202);
    let densities: Vec<f64> = (0..grid_a.num_elements())
        .map(|i| (&grid_a as &dyn PeriodicGrid).density(i).unwrap())
        .collect();

    let options = SolverOptions::default().with_max_iterations(2000);
    let solver_a = PeriodicCellSolver::<Hex20, PiezoPolicy<Hex20>>::new(
        &grid_a,
        &piezo_material,
        options.clone(),
    )
    .unwrap();
    let result_a = solver_a.solve().unwrap();
    let c_bar = result_a.c_bar();
    let (eps_bar, _d_bar) = result_a.piezo_tensors();

    assert!(is_symmetric(c_bar, 1e-6));
    assert!(is_positive_definite(c_bar));
    assert!(is_symmetric(eps_bar, 1e-6));
    assert!(is_positive_definite(eps_bar));

    let c_base_trace: f64 = (0..elastic.c.nrows()).map(|i| elastic.c[(i, i)]).sum();
    let (c_reuss, c_voigt) = voigt_reuss_trace_bounds(&densities, c_base_trace);
    let c_bar_trace: f64 = (0..c_bar.nrows()).map(|i| c_bar[(i, i)]).sum();
    assert!(c_reuss <= c_bar_trace + 1e-6);
    assert!(c_bar_trace <= c_voigt + 1e-6);

    let eps_base_trace: f64 = (0..permittivity.k.nrows()).map(|i| permittivity.k[(i, i)]).sum();
    let (eps_reuss, eps_voigt) = voigt_reuss_trace_bounds(&densities, eps_base_trace);
    let eps_bar_trace: f64 = (0..eps_bar.nrows()).map(|i| eps_bar[(i, i)]).sum();
    assert!(eps_reuss <= eps_bar_trace + 1e-6);
    assert!(eps_bar_trace <= eps_voigt + 1e-6);

    let mut grid_b = grid_a.clone();
    grid_b.translate(&[1, 1, 1]).unwrap();
    let solver_b =
        PeriodicCellSolver::<Hex20, PiezoPolicy<Hex20>>::new(&grid_b, &piezo_material, options)
            .unwrap();
    let result_b = solver_b.solve().unwrap();
    assert_abs_diff_eq!(result_a.c_bar().clone(), result_b.c_bar().clone(), epsilon = 1e-6);
}

/// `spec.md` §8's "`maxIterations=1` must fail" requirement, checked on a
/// heterogeneous elastic cell: Jacobi-PCG on a many-element, randomly-dense
/// stiffness operator cannot reach a `1e-9` relative residual in a single
/// iteration.
#[test]
fn undersampled_iterations_fail_as_solver_failure_on_elastic_cell() {
    let mut grid = Grid::<Quad8>::new(vec![6, 6], vec![1.0, 1.0]).unwrap();
    grid.set_densities_from_rng(7);
    let material = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
    let options = SolverOptions::default().with_max_iterations(1).with_tolerance(1e-9);
    let solver = PeriodicCellSolver::<Quad8, ElasticPolicy<Quad8>>::new(&grid, &material, options).unwrap();
    assert!(matches!(solver.solve(), Err(CellError::SolverFailure { .. })));
}

/// `spec.md` §8's "`maxIterations=1` must fail" requirement on the
/// indefinite piezoelectric solve path: BiCGStab on a many-element Hex20
/// cell cannot reach a `1e-9` relative residual in a single iteration
/// either, so the dispatch added for S6 still reports `SolverFailure`
/// rather than silently returning a garbage solution.
#[test]
fn undersampled_iterations_fail_as_solver_failure_on_piezo_cell() {
    let elastic = random_pd_elastic(99);
    let permittivity = TransportMaterial::isotropic(3, 2.1).unwrap();
    let voigt = cellhom::elements::voigt_size(3);
    let d = random_small_coupling(101, 3, voigt);
    let piezo_material = PiezoelectricMaterial::new(elastic, permittivity, d).unwrap();

    let mut grid = Grid::<Hex20>::new(vec![2, 2, 2], vec![0.5, 0.5, 0.5]).unwrap();
    grid.set_densities_from_rng(303);

    let options = SolverOptions::default().with_max_iterations(1).with_tolerance(1e-9);
    let solver =
        PeriodicCellSolver::<Hex20, PiezoPolicy<Hex20>>::new(&grid, &piezo_material, options).unwrap();
    assert!(matches!(solver.solve(), Err(CellError::SolverFailure { .. })));
}

/// `spec.md` §8 Material property 2: for densities all equal to 1, Reuss =
/// Voigt = C (the trace bound collapses to equality).
#[test]
fn material_property_reuss_equals_voigt_at_unit_density() {
    let densities = vec![1.0; 16];
    let base_trace = 6.0;
    let (reuss, voigt) = voigt_reuss_trace_bounds(&densities, base_trace);
    assert_abs_diff_eq!(reuss, voigt, epsilon = 1e-12);
    assert_abs_diff_eq!(reuss, base_trace, epsilon = 1e-12);
}

/// Sanity check that `Quad4`/`Hex8`'s quadrature order is in fact the
/// `pExact=3` the element catalogue documents (spec §4.1 property 4),
/// exercised here as a cross-module regression rather than in
/// `elements::mod`'s own unit tests.
#[test]
fn quad4_quadrature_matches_documented_exactness() {
    assert_eq!(Quad4::P_EXACT, 3);
    assert_eq!(Quad4::quadrature_rule().len(), 4);
}
