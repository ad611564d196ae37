//! Command-line demo: builds a periodic unit cell, runs one homogenization
//! solve, prints the effective tensor, and optionally writes a Gmsh file.
//!
//! This is the "external collaborator" named in `spec.md` §1 — it contains
//! no homogenization logic of its own, only model construction and result
//! printing, mirroring `fea-solver/src/bin/example.rs`'s hardcoded-model +
//! `env_logger::init()` + summary-print shape.

use std::env;

use cellhom::elements::{ElasticMaterial, Quad8};
use cellhom::gmsh;
use cellhom::grid::{Grid, PeriodicGrid};
use cellhom::policy::ElasticPolicy;
use cellhom::results::SolverOptions;
use cellhom::solver::PeriodicCellSolver;

fn main() {
    env_logger::init();

    let seed: u64 = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(1234);

    log::info!("building 4x4 Quad8 unit cell, seed={seed}");
    let mut grid = Grid::<Quad8>::new(vec![4, 4], vec![1.0, 1.0]).expect("valid grid parameters");
    grid.set_densities_from_rng(seed);

    let material = ElasticMaterial::isotropic(2, 1.0, 0.3).expect("valid isotropic material");
    let options = SolverOptions::default().with_max_iterations(2000);

    let solver = PeriodicCellSolver::<Quad8, ElasticPolicy<Quad8>>::new(&grid, &material, options)
        .expect("solver construction");
    let result = solver.solve().expect("homogenization solve");

    println!("Homogenized elastic stiffness C_bar:");
    let c_bar = result.c_bar();
    for r in 0..c_bar.nrows() {
        let row: Vec<String> = (0..c_bar.ncols()).map(|c| format!("{:.6}", c_bar[(r, c)])).collect();
        println!("  [{}]", row.join(", "));
    }

    if let Some(path) = env::args().nth(2) {
        let mut file = std::fs::File::create(&path).expect("create mesh output file");
        gmsh::write_mesh::<Quad8>(&mut file, &grid as &dyn PeriodicGrid).expect("write mesh");
        let densities: Vec<f64> = (0..grid.num_elements())
            .map(|i| grid.density(i).expect("valid element index"))
            .collect();
        gmsh::write_element_data(&mut file, "density", &densities, 0.0, 0).expect("write density");
        println!("wrote mesh + density field to {path}");
    }
}
