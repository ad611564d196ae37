//! Trilinear 8-node hexahedron reference element

use nalgebra::DMatrix;

use super::{ElementKind, ReferenceElement};

const NODES: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// Trilinear 8-node hexahedron on `[-1, 1]^3`.
#[derive(Debug, Clone, Copy)]
pub struct Hex8;

impl ReferenceElement for Hex8 {
    const KIND: ElementKind = ElementKind::Hex8;
    const DIM: usize = 3;
    const NUM_NODES: usize = 8;
    const P_EXACT: usize = 3;
    const QUAD_POINTS_PER_AXIS: usize = 2;

    fn local_nodes() -> DMatrix<f64> {
        DMatrix::from_fn(8, 3, |i, j| NODES[i][j])
    }

    fn shape_functions(xi: &[f64]) -> Vec<f64> {
        let (r, s, t) = (xi[0], xi[1], xi[2]);
        NODES
            .iter()
            .map(|&[ri, si, ti]| 0.125 * (1.0 + r * ri) * (1.0 + s * si) * (1.0 + t * ti))
            .collect()
    }

    fn grad_shape_functions(xi: &[f64]) -> DMatrix<f64> {
        let (r, s, t) = (xi[0], xi[1], xi[2]);
        let mut grad = DMatrix::zeros(3, 8);
        for (i, &[ri, si, ti]) in NODES.iter().enumerate() {
            grad[(0, i)] = 0.125 * ri * (1.0 + s * si) * (1.0 + t * ti);
            grad[(1, i)] = 0.125 * si * (1.0 + r * ri) * (1.0 + t * ti);
            grad[(2, i)] = 0.125 * ti * (1.0 + r * ri) * (1.0 + s * si);
        }
        grad
    }
}
