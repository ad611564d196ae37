//! Serendipity 8-node quadrilateral reference element (corners + edge midpoints)

use nalgebra::DMatrix;

use super::{ElementKind, ReferenceElement};

/// Corners (0-3, CCW from `(-1,-1)`) then edge midpoints (4-7): bottom,
/// right, top, left. This ordering matches the "corners + x-mids + y-mids"
/// families used by `Grid`'s periodic connectivity (§3).
const NODES: [[f64; 2]; 8] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [1.0, 1.0],
    [-1.0, 1.0],
    [0.0, -1.0],
    [1.0, 0.0],
    [0.0, 1.0],
    [-1.0, 0.0],
];

/// Serendipity 8-node quadrilateral on `[-1, 1]^2`.
#[derive(Debug, Clone, Copy)]
pub struct Quad8;

impl ReferenceElement for Quad8 {
    const KIND: ElementKind = ElementKind::Quad8;
    const DIM: usize = 2;
    const NUM_NODES: usize = 8;
    const P_EXACT: usize = 5;
    const QUAD_POINTS_PER_AXIS: usize = 3;

    fn local_nodes() -> DMatrix<f64> {
        DMatrix::from_fn(8, 2, |i, j| NODES[i][j])
    }

    fn shape_functions(xi: &[f64]) -> Vec<f64> {
        let (r, s) = (xi[0], xi[1]);
        let mut n = vec![0.0; 8];
        for (i, &[ri, si]) in NODES.iter().enumerate().take(4) {
            n[i] = 0.25 * (1.0 + r * ri) * (1.0 + s * si) * (r * ri + s * si - 1.0);
        }
        // Midsides with r_i == 0 (top/bottom): index 4, 6
        for &i in &[4usize, 6] {
            let si = NODES[i][1];
            n[i] = 0.5 * (1.0 - r * r) * (1.0 + s * si);
        }
        // Midsides with s_i == 0 (left/right): index 5, 7
        for &i in &[5usize, 7] {
            let ri = NODES[i][0];
            n[i] = 0.5 * (1.0 + r * ri) * (1.0 - s * s);
        }
        n
    }

    fn grad_shape_functions(xi: &[f64]) -> DMatrix<f64> {
        let (r, s) = (xi[0], xi[1]);
        let mut grad = DMatrix::zeros(2, 8);
        for (i, &[ri, si]) in NODES.iter().enumerate().take(4) {
            let t = r * ri + s * si - 1.0;
            grad[(0, i)] = 0.25 * ri * (1.0 + s * si) * t + 0.25 * (1.0 + r * ri) * (1.0 + s * si) * ri;
            grad[(1, i)] = 0.25 * si * (1.0 + r * ri) * t + 0.25 * (1.0 + r * ri) * (1.0 + s * si) * si;
        }
        for &i in &[4usize, 6] {
            let si = NODES[i][1];
            grad[(0, i)] = 0.5 * (-2.0 * r) * (1.0 + s * si);
            grad[(1, i)] = 0.5 * (1.0 - r * r) * si;
        }
        for &i in &[5usize, 7] {
            let ri = NODES[i][0];
            grad[(0, i)] = 0.5 * ri * (1.0 - s * s);
            grad[(1, i)] = 0.5 * (1.0 + r * ri) * (-2.0 * s);
        }
        grad
    }
}
