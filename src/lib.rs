//! cellhom - periodic unit-cell homogenization for structured 2D/3D
//! microstructure grids.
//!
//! Given a rectangular unit cell with per-element densities in `[0, 1]` and a
//! constitutive model (linear elastic, linear scalar transport, or linear
//! piezoelectric), this crate computes the effective (homogenized) material
//! tensor by solving one periodic-boundary elasticity/transport problem per
//! independent macroscopic loading direction and assembling the result via
//! the Hill-Mandel lemma.
//!
//! ## Example
//! ```rust
//! use cellhom::elements::{ElasticMaterial, Quad8};
//! use cellhom::grid::Grid;
//! use cellhom::policy::ElasticPolicy;
//! use cellhom::results::SolverOptions;
//! use cellhom::solver::PeriodicCellSolver;
//!
//! let mut grid = Grid::<Quad8>::new(vec![3, 3], vec![1.0, 1.0]).unwrap();
//! grid.set_densities_from_rng(1234);
//!
//! let material = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
//! let solver = PeriodicCellSolver::<Quad8, ElasticPolicy<Quad8>>::new(
//!     &grid,
//!     &material,
//!     SolverOptions::default(),
//! )
//! .unwrap();
//!
//! let result = solver.solve().unwrap();
//! let c_bar = result.c_bar();
//! assert_eq!(c_bar.nrows(), 3);
//! ```

/// Density floor: densities are clamped into `[NUMERICAL_ZERO, 1.0]` so that
/// element matrices never become exactly singular at zero density.
pub const NUMERICAL_ZERO: f64 = 1e-9;

pub mod elements;
pub mod error;
pub mod gmsh;
pub mod grid;
pub mod kernels;
pub mod operator;
pub mod policy;
pub mod quadrature;
pub mod results;
pub mod solver;
pub mod traits_physics;

// Re-export the common types needed to build a grid, a material and a
// solver, and to read back a homogenized tensor.
pub mod prelude {
    pub use crate::elements::{
        ElasticMaterial, ElementKind, Hex20, Hex8, Material, PiezoelectricMaterial, Quad4, Quad8,
        ReferenceElement, TransportMaterial,
    };
    pub use crate::error::{CellError, CellResult};
    pub use crate::grid::{Grid, PeriodicGrid};
    pub use crate::policy::{ElasticPolicy, PhysicsPolicy, PiezoPolicy, Tensors, TransportPolicy};
    pub use crate::results::{FieldSave, HomogenizationResult, NodalFields, SolverOptions};
    pub use crate::solver::PeriodicCellSolver;
}
