//! Bilinear 4-node quadrilateral reference element

use nalgebra::DMatrix;

use super::{ElementKind, ReferenceElement};

/// Corners in counter-clockwise order starting at `(-1, -1)`.
const NODES: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Bilinear 4-node quadrilateral on `[-1, 1]^2`.
#[derive(Debug, Clone, Copy)]
pub struct Quad4;

impl ReferenceElement for Quad4 {
    const KIND: ElementKind = ElementKind::Quad4;
    const DIM: usize = 2;
    const NUM_NODES: usize = 4;
    const P_EXACT: usize = 3;
    const QUAD_POINTS_PER_AXIS: usize = 2;

    fn local_nodes() -> DMatrix<f64> {
        DMatrix::from_fn(4, 2, |i, j| NODES[i][j])
    }

    fn shape_functions(xi: &[f64]) -> Vec<f64> {
        let (r, s) = (xi[0], xi[1]);
        NODES
            .iter()
            .map(|&[ri, si]| 0.25 * (1.0 + r * ri) * (1.0 + s * si))
            .collect()
    }

    fn grad_shape_functions(xi: &[f64]) -> DMatrix<f64> {
        let (r, s) = (xi[0], xi[1]);
        let mut grad = DMatrix::zeros(2, 4);
        for (i, &[ri, si]) in NODES.iter().enumerate() {
            grad[(0, i)] = 0.25 * ri * (1.0 + s * si);
            grad[(1, i)] = 0.25 * si * (1.0 + r * ri);
        }
        grad
    }
}
