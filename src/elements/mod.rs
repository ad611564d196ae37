//! Reference element catalogue
//!
//! Four concrete element kinds (`Quad4`, `Quad8`, `Hex8`, `Hex20`), each
//! exposing reference nodes, shape functions, shape function gradients and a
//! quadrature rule on the reference square/cube `[-1, 1]^dim`.

mod hex8;
mod hex20;
pub mod material;
mod quad4;
mod quad8;

pub use hex8::Hex8;
pub use hex20::Hex20;
pub use material::{voigt_size, ElasticMaterial, Material, PiezoelectricMaterial, TransportMaterial};
pub use quad4::Quad4;
pub use quad8::Quad8;

use nalgebra::DMatrix;

use crate::error::{CellError, CellResult};
use crate::quadrature::GaussRule;

/// Tag identifying one of the four supported element kinds at runtime.
///
/// The concrete [`ReferenceElement`] impls carry the same information at
/// compile time via `ReferenceElement::KIND`; this enum exists so that
/// [`crate::grid::Grid`]'s connectivity bookkeeping and the Gmsh writer can
/// dispatch on element kind without being generic themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Quad4,
    Quad8,
    Hex8,
    Hex20,
}

impl ElementKind {
    pub fn dim(self) -> usize {
        match self {
            ElementKind::Quad4 | ElementKind::Quad8 => 2,
            ElementKind::Hex8 | ElementKind::Hex20 => 3,
        }
    }

    pub fn num_nodes(self) -> usize {
        match self {
            ElementKind::Quad4 => 4,
            ElementKind::Quad8 => 8,
            ElementKind::Hex8 => 8,
            ElementKind::Hex20 => 20,
        }
    }

    /// Gmsh element-type identifier (§6).
    pub fn gmsh_type(self) -> i32 {
        match self {
            ElementKind::Quad4 => 3,
            ElementKind::Quad8 => 16,
            ElementKind::Hex8 => 5,
            ElementKind::Hex20 => 17,
        }
    }
}

/// A concrete reference element: corner/edge-midpoint nodes, shape
/// functions, shape function gradients, and a quadrature rule on the
/// reference domain `[-1, 1]^DIM`.
pub trait ReferenceElement: Copy + Clone + Send + Sync + std::fmt::Debug + 'static {
    const KIND: ElementKind;
    const DIM: usize;
    const NUM_NODES: usize;
    /// Total per-axis polynomial degree the quadrature rule integrates exactly.
    const P_EXACT: usize;
    const QUAD_POINTS_PER_AXIS: usize;

    /// `NUM_NODES x DIM` matrix of reference-domain node coordinates, in the
    /// canonical local order (corners first, then edge midpoints).
    fn local_nodes() -> DMatrix<f64>;

    /// Shape functions `N(xi)`, length `NUM_NODES`.
    fn shape_functions(xi: &[f64]) -> Vec<f64>;

    /// `DIM x NUM_NODES` matrix of `dN_i/dxi_j`.
    fn grad_shape_functions(xi: &[f64]) -> DMatrix<f64>;

    /// Quadrature rule of order sufficient to integrate the element's own
    /// stiffness/source kernels exactly at unit density.
    fn quadrature_rule() -> GaussRule {
        crate::quadrature::tensor_product_rule(Self::DIM, Self::QUAD_POINTS_PER_AXIS)
    }
}

/// `J = dN/dxi * nodes`, a `DIM x DIM` matrix.
pub fn jacobian(grad_n: &DMatrix<f64>, nodes: &DMatrix<f64>) -> DMatrix<f64> {
    grad_n * nodes
}

/// Validates `det(J)`, surfacing the degenerate/inverted-element failures
/// named in spec §4.3/§7.
pub fn check_jacobian(det_j: f64) -> CellResult<()> {
    if det_j == 0.0 {
        Err(CellError::DegenerateElement(det_j))
    } else if det_j < 0.0 {
        Err(CellError::InvertedElement(det_j))
    } else {
        Ok(())
    }
}

/// The reference-element measure (area/volume) at the given physical nodes.
pub fn measure<E: ReferenceElement>(nodes: &DMatrix<f64>) -> CellResult<f64> {
    let rule = E::quadrature_rule();
    let mut total = 0.0;
    for (xi, w) in rule.points.iter().zip(&rule.weights) {
        let grad_n = E::grad_shape_functions(xi);
        let j = jacobian(&grad_n, nodes);
        let det = j.determinant();
        check_jacobian(det)?;
        total += det.abs() * w;
    }
    log::trace!("measure::<{:?}>() = {total}", E::KIND);
    Ok(total)
}

/// Numerically integrate a scalar integrand over the reference element.
pub fn integrate_scalar<E: ReferenceElement>(mut f: impl FnMut(&[f64]) -> f64) -> f64 {
    let rule = E::quadrature_rule();
    rule.points
        .iter()
        .zip(&rule.weights)
        .map(|(xi, w)| f(xi) * w)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn check_partition_of_unity<E: ReferenceElement>() {
        let rule = E::quadrature_rule();
        for xi in &rule.points {
            let n = E::shape_functions(xi);
            let sum: f64 = n.iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-10);
        }
    }

    fn check_kronecker_delta<E: ReferenceElement>() {
        let local_nodes = E::local_nodes();
        for j in 0..E::NUM_NODES {
            let xi: Vec<f64> = (0..E::DIM).map(|d| local_nodes[(j, d)]).collect();
            let n = E::shape_functions(&xi);
            for (i, &ni) in n.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(ni, expected, epsilon = 1e-9);
            }
        }
    }

    fn check_gradient_finite_difference<E: ReferenceElement>() {
        let rule = E::quadrature_rule();
        let h = 1e-6;
        for xi in &rule.points {
            let analytic = E::grad_shape_functions(xi);
            for d in 0..E::DIM {
                let mut plus = xi.clone();
                plus[d] += h;
                let mut minus = xi.clone();
                minus[d] -= h;
                let n_plus = E::shape_functions(&plus);
                let n_minus = E::shape_functions(&minus);
                for i in 0..E::NUM_NODES {
                    let fd = (n_plus[i] - n_minus[i]) / (2.0 * h);
                    assert_abs_diff_eq!(analytic[(d, i)], fd, epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn quad4_invariants() {
        check_partition_of_unity::<Quad4>();
        check_kronecker_delta::<Quad4>();
        check_gradient_finite_difference::<Quad4>();
    }

    #[test]
    fn quad8_invariants() {
        check_partition_of_unity::<Quad8>();
        check_kronecker_delta::<Quad8>();
        check_gradient_finite_difference::<Quad8>();
    }

    #[test]
    fn hex8_invariants() {
        check_partition_of_unity::<Hex8>();
        check_kronecker_delta::<Hex8>();
        check_gradient_finite_difference::<Hex8>();
    }

    #[test]
    fn hex20_invariants() {
        check_partition_of_unity::<Hex20>();
        check_kronecker_delta::<Hex20>();
        check_gradient_finite_difference::<Hex20>();
    }

    #[test]
    fn measure_of_half_scale_reference_is_one() {
        // measure(0.5 * localNodes()) = 1 (spec §8 Quadrature property 5)
        let nodes = Quad4::local_nodes() * 0.5;
        let m = measure::<Quad4>(&nodes).unwrap();
        assert_abs_diff_eq!(m, 1.0, epsilon = 1e-10);

        let nodes3 = Hex8::local_nodes() * 0.5;
        let m3 = measure::<Hex8>(&nodes3).unwrap();
        assert_abs_diff_eq!(m3, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn degenerate_and_inverted_are_detected() {
        assert!(check_jacobian(0.0).is_err());
        assert!(check_jacobian(-1.0).is_err());
        assert!(check_jacobian(1.0).is_ok());
    }
}
