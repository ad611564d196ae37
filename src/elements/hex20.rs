//! Serendipity 20-node hexahedron reference element (corners + edge midpoints)

use nalgebra::DMatrix;

use super::{ElementKind, ReferenceElement};

/// Corners (0-7) then 12 edge midpoints (8-19), grouped bottom face edges,
/// top face edges, then vertical edges — the conventional VTK quadratic
/// hexahedron ordering. This matches the "corners + x/y/z-mids" families
/// used by `Grid`'s periodic connectivity (§3).
const NODES: [[f64; 3]; 20] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [0.0, -1.0, -1.0],  // 8  mid(0,1)  x-mid
    [1.0, 0.0, -1.0],   // 9  mid(1,2)  y-mid
    [0.0, 1.0, -1.0],   // 10 mid(2,3)  x-mid
    [-1.0, 0.0, -1.0],  // 11 mid(3,0)  y-mid
    [0.0, -1.0, 1.0],   // 12 mid(4,5)  x-mid
    [1.0, 0.0, 1.0],    // 13 mid(5,6)  y-mid
    [0.0, 1.0, 1.0],    // 14 mid(6,7)  x-mid
    [-1.0, 0.0, 1.0],   // 15 mid(7,4)  y-mid
    [-1.0, -1.0, 0.0],  // 16 mid(0,4)  z-mid
    [1.0, -1.0, 0.0],   // 17 mid(1,5)  z-mid
    [1.0, 1.0, 0.0],    // 18 mid(2,6)  z-mid
    [-1.0, 1.0, 0.0],   // 19 mid(3,7)  z-mid
];

const X_MIDS: [usize; 4] = [8, 10, 12, 14];
const Y_MIDS: [usize; 4] = [9, 11, 13, 15];
const Z_MIDS: [usize; 4] = [16, 17, 18, 19];

/// Serendipity 20-node hexahedron on `[-1, 1]^3`.
#[derive(Debug, Clone, Copy)]
pub struct Hex20;

impl ReferenceElement for Hex20 {
    const KIND: ElementKind = ElementKind::Hex20;
    const DIM: usize = 3;
    const NUM_NODES: usize = 20;
    const P_EXACT: usize = 5;
    const QUAD_POINTS_PER_AXIS: usize = 3;

    fn local_nodes() -> DMatrix<f64> {
        DMatrix::from_fn(20, 3, |i, j| NODES[i][j])
    }

    fn shape_functions(xi: &[f64]) -> Vec<f64> {
        let (r, s, t) = (xi[0], xi[1], xi[2]);
        let mut n = vec![0.0; 20];
        for (i, &[ri, si, ti]) in NODES.iter().enumerate().take(8) {
            n[i] = 0.125 * (1.0 + r * ri) * (1.0 + s * si) * (1.0 + t * ti) * (r * ri + s * si + t * ti - 2.0);
        }
        for &i in &X_MIDS {
            let [_, si, ti] = NODES[i];
            n[i] = 0.25 * (1.0 - r * r) * (1.0 + s * si) * (1.0 + t * ti);
        }
        for &i in &Y_MIDS {
            let [ri, _, ti] = NODES[i];
            n[i] = 0.25 * (1.0 + r * ri) * (1.0 - s * s) * (1.0 + t * ti);
        }
        for &i in &Z_MIDS {
            let [ri, si, _] = NODES[i];
            n[i] = 0.25 * (1.0 + r * ri) * (1.0 + s * si) * (1.0 - t * t);
        }
        n
    }

    fn grad_shape_functions(xi: &[f64]) -> DMatrix<f64> {
        let (r, s, t) = (xi[0], xi[1], xi[2]);
        let mut grad = DMatrix::zeros(3, 20);
        for (i, &[ri, si, ti]) in NODES.iter().enumerate().take(8) {
            let a = 1.0 + r * ri;
            let b = 1.0 + s * si;
            let c = 1.0 + t * ti;
            let d = r * ri + s * si + t * ti - 2.0;
            grad[(0, i)] = 0.125 * ri * b * c * (d + a);
            grad[(1, i)] = 0.125 * si * a * c * (d + b);
            grad[(2, i)] = 0.125 * ti * a * b * (d + c);
        }
        for &i in &X_MIDS {
            let [_, si, ti] = NODES[i];
            let b = 1.0 + s * si;
            let c = 1.0 + t * ti;
            grad[(0, i)] = 0.25 * (-2.0 * r) * b * c;
            grad[(1, i)] = 0.25 * (1.0 - r * r) * si * c;
            grad[(2, i)] = 0.25 * (1.0 - r * r) * b * ti;
        }
        for &i in &Y_MIDS {
            let [ri, _, ti] = NODES[i];
            let a = 1.0 + r * ri;
            let c = 1.0 + t * ti;
            grad[(0, i)] = 0.25 * ri * (1.0 - s * s) * c;
            grad[(1, i)] = 0.25 * a * (-2.0 * s) * c;
            grad[(2, i)] = 0.25 * a * (1.0 - s * s) * ti;
        }
        for &i in &Z_MIDS {
            let [ri, si, _] = NODES[i];
            let a = 1.0 + r * ri;
            let b = 1.0 + s * si;
            grad[(0, i)] = 0.25 * ri * b * (1.0 - t * t);
            grad[(1, i)] = 0.25 * a * si * (1.0 - t * t);
            grad[(2, i)] = 0.25 * a * b * (-2.0 * t);
        }
        grad
    }
}
