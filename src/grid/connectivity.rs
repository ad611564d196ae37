//! Index arithmetic for standard and periodic node numbering (§3).
//!
//! Density storage and element numbering are row-major: x fastest, then y,
//! then z. Each element kind owns its own node-family layout (corners,
//! optionally x/y/z edge-midpoints); these free functions are the single
//! source of truth for both the node index formulas and the physical
//! coordinates assigned to each index, so the two can never drift apart.

use crate::elements::ElementKind;

pub fn num_elements(res: &[usize]) -> usize {
    res.iter().product()
}

pub fn element_coords(res: &[usize], elem_idx: usize) -> Vec<usize> {
    match res.len() {
        2 => {
            let nx = res[0];
            vec![elem_idx % nx, elem_idx / nx]
        }
        3 => {
            let (nx, ny) = (res[0], res[1]);
            let ex = elem_idx % nx;
            let ey = (elem_idx / nx) % ny;
            let ez = elem_idx / (nx * ny);
            vec![ex, ey, ez]
        }
        _ => unreachable!(),
    }
}

pub fn num_standard_nodes(kind: ElementKind, res: &[usize]) -> usize {
    match kind {
        ElementKind::Quad4 => {
            let (nx, ny) = (res[0], res[1]);
            (nx + 1) * (ny + 1)
        }
        ElementKind::Quad8 => {
            let (nx, ny) = (res[0], res[1]);
            let corners = (nx + 1) * (ny + 1);
            let xmids = nx * (ny + 1);
            let ymids = (nx + 1) * ny;
            corners + xmids + ymids
        }
        ElementKind::Hex8 => {
            let (nx, ny, nz) = (res[0], res[1], res[2]);
            (nx + 1) * (ny + 1) * (nz + 1)
        }
        ElementKind::Hex20 => {
            let (nx, ny, nz) = (res[0], res[1], res[2]);
            let corners = (nx + 1) * (ny + 1) * (nz + 1);
            let xmids = nx * (ny + 1) * (nz + 1);
            let ymids = (nx + 1) * ny * (nz + 1);
            let zmids = (nx + 1) * (ny + 1) * nz;
            corners + xmids + ymids + zmids
        }
    }
}

pub fn num_periodic_nodes(kind: ElementKind, res: &[usize]) -> usize {
    match kind {
        ElementKind::Quad4 => res[0] * res[1],
        ElementKind::Quad8 => 3 * res[0] * res[1],
        ElementKind::Hex8 => res[0] * res[1] * res[2],
        ElementKind::Hex20 => 4 * res[0] * res[1] * res[2],
    }
}

// ---- 2D families --------------------------------------------------------

fn corner_std_2d(nx: usize, _ny: usize, i: usize, j: usize) -> usize {
    j * (nx + 1) + i
}
fn corner_per_2d(nx: usize, ny: usize, i: usize, j: usize) -> usize {
    (j % ny) * nx + (i % nx)
}
fn xmid_std_2d(nx: usize, ny: usize, i: usize, j: usize) -> usize {
    (nx + 1) * (ny + 1) + j * nx + i
}
fn xmid_per_2d(nx: usize, ny: usize, i: usize, j: usize) -> usize {
    nx * ny + (j % ny) * nx + (i % nx)
}
fn ymid_std_2d(nx: usize, ny: usize, i: usize, j: usize) -> usize {
    (nx + 1) * (ny + 1) + nx * (ny + 1) + j * (nx + 1) + i
}
fn ymid_per_2d(nx: usize, ny: usize, i: usize, j: usize) -> usize {
    2 * nx * ny + (j % ny) * nx + (i % nx)
}

// ---- 3D families --------------------------------------------------------

fn corner_std_3d(nx: usize, ny: usize, _nz: usize, i: usize, j: usize, k: usize) -> usize {
    k * (nx + 1) * (ny + 1) + j * (nx + 1) + i
}
fn corner_per_3d(nx: usize, ny: usize, nz: usize, i: usize, j: usize, k: usize) -> usize {
    (k % nz) * nx * ny + (j % ny) * nx + (i % nx)
}
fn xmid_std_3d(nx: usize, ny: usize, nz: usize, i: usize, j: usize, k: usize) -> usize {
    let corners = (nx + 1) * (ny + 1) * (nz + 1);
    let _ = nz;
    corners + k * nx * (ny + 1) + j * nx + i
}
fn xmid_per_3d(nx: usize, ny: usize, nz: usize, i: usize, j: usize, k: usize) -> usize {
    nx * ny * nz + (k % nz) * nx * ny + (j % ny) * nx + (i % nx)
}
fn ymid_std_3d(nx: usize, ny: usize, nz: usize, i: usize, j: usize, k: usize) -> usize {
    let corners = (nx + 1) * (ny + 1) * (nz + 1);
    let xmids = nx * (ny + 1) * (nz + 1);
    corners + xmids + k * (nx + 1) * ny + j * (nx + 1) + i
}
fn ymid_per_3d(nx: usize, ny: usize, nz: usize, i: usize, j: usize, k: usize) -> usize {
    2 * nx * ny * nz + (k % nz) * nx * ny + (j % ny) * nx + (i % nx)
}
fn zmid_std_3d(nx: usize, ny: usize, nz: usize, i: usize, j: usize, k: usize) -> usize {
    let corners = (nx + 1) * (ny + 1) * (nz + 1);
    let xmids = nx * (ny + 1) * (nz + 1);
    let ymids = (nx + 1) * ny * (nz + 1);
    let _ = nz;
    corners + xmids + ymids + k * (nx + 1) * (ny + 1) + j * (nx + 1) + i
}
fn zmid_per_3d(nx: usize, ny: usize, nz: usize, i: usize, j: usize, k: usize) -> usize {
    3 * nx * ny * nz + (k % nz) * nx * ny + (j % ny) * nx + (i % nx)
}

/// Local node indices (standard view) for element `elem_idx`, in the
/// element kind's canonical local order.
pub fn element_standard_nodes(kind: ElementKind, res: &[usize], elem_idx: usize) -> Vec<usize> {
    element_nodes_impl(kind, res, elem_idx, false)
}

/// Local node indices (periodic view) for element `elem_idx`.
pub fn element_periodic_nodes(kind: ElementKind, res: &[usize], elem_idx: usize) -> Vec<usize> {
    element_nodes_impl(kind, res, elem_idx, true)
}

fn element_nodes_impl(kind: ElementKind, res: &[usize], elem_idx: usize, periodic: bool) -> Vec<usize> {
    match kind {
        ElementKind::Quad4 => {
            let (nx, ny) = (res[0], res[1]);
            let c = element_coords(res, elem_idx);
            let (ex, ey) = (c[0], c[1]);
            let corner = |i: usize, j: usize| {
                if periodic {
                    corner_per_2d(nx, ny, i, j)
                } else {
                    corner_std_2d(nx, ny, i, j)
                }
            };
            vec![
                corner(ex, ey),
                corner(ex + 1, ey),
                corner(ex + 1, ey + 1),
                corner(ex, ey + 1),
            ]
        }
        ElementKind::Quad8 => {
            let (nx, ny) = (res[0], res[1]);
            let c = element_coords(res, elem_idx);
            let (ex, ey) = (c[0], c[1]);
            let corner = |i: usize, j: usize| {
                if periodic {
                    corner_per_2d(nx, ny, i, j)
                } else {
                    corner_std_2d(nx, ny, i, j)
                }
            };
            let xmid = |i: usize, j: usize| {
                if periodic {
                    xmid_per_2d(nx, ny, i, j)
                } else {
                    xmid_std_2d(nx, ny, i, j)
                }
            };
            let ymid = |i: usize, j: usize| {
                if periodic {
                    ymid_per_2d(nx, ny, i, j)
                } else {
                    ymid_std_2d(nx, ny, i, j)
                }
            };
            vec![
                corner(ex, ey),
                corner(ex + 1, ey),
                corner(ex + 1, ey + 1),
                corner(ex, ey + 1),
                xmid(ex, ey),
                ymid(ex + 1, ey),
                xmid(ex, ey + 1),
                ymid(ex, ey),
            ]
        }
        ElementKind::Hex8 => {
            let (nx, ny, nz) = (res[0], res[1], res[2]);
            let c = element_coords(res, elem_idx);
            let (ex, ey, ez) = (c[0], c[1], c[2]);
            let corner = |i: usize, j: usize, k: usize| {
                if periodic {
                    corner_per_3d(nx, ny, nz, i, j, k)
                } else {
                    corner_std_3d(nx, ny, nz, i, j, k)
                }
            };
            vec![
                corner(ex, ey, ez),
                corner(ex + 1, ey, ez),
                corner(ex + 1, ey + 1, ez),
                corner(ex, ey + 1, ez),
                corner(ex, ey, ez + 1),
                corner(ex + 1, ey, ez + 1),
                corner(ex + 1, ey + 1, ez + 1),
                corner(ex, ey + 1, ez + 1),
            ]
        }
        ElementKind::Hex20 => {
            let (nx, ny, nz) = (res[0], res[1], res[2]);
            let c = element_coords(res, elem_idx);
            let (ex, ey, ez) = (c[0], c[1], c[2]);
            let corner = |i: usize, j: usize, k: usize| {
                if periodic {
                    corner_per_3d(nx, ny, nz, i, j, k)
                } else {
                    corner_std_3d(nx, ny, nz, i, j, k)
                }
            };
            let xmid = |i: usize, j: usize, k: usize| {
                if periodic {
                    xmid_per_3d(nx, ny, nz, i, j, k)
                } else {
                    xmid_std_3d(nx, ny, nz, i, j, k)
                }
            };
            let ymid = |i: usize, j: usize, k: usize| {
                if periodic {
                    ymid_per_3d(nx, ny, nz, i, j, k)
                } else {
                    ymid_std_3d(nx, ny, nz, i, j, k)
                }
            };
            let zmid = |i: usize, j: usize, k: usize| {
                if periodic {
                    zmid_per_3d(nx, ny, nz, i, j, k)
                } else {
                    zmid_std_3d(nx, ny, nz, i, j, k)
                }
            };
            vec![
                corner(ex, ey, ez),
                corner(ex + 1, ey, ez),
                corner(ex + 1, ey + 1, ez),
                corner(ex, ey + 1, ez),
                corner(ex, ey, ez + 1),
                corner(ex + 1, ey, ez + 1),
                corner(ex + 1, ey + 1, ez + 1),
                corner(ex, ey + 1, ez + 1),
                xmid(ex, ey, ez),
                ymid(ex + 1, ey, ez),
                xmid(ex, ey + 1, ez),
                ymid(ex, ey, ez),
                xmid(ex, ey, ez + 1),
                ymid(ex + 1, ey, ez + 1),
                xmid(ex, ey + 1, ez + 1),
                ymid(ex, ey, ez + 1),
                zmid(ex, ey, ez),
                zmid(ex + 1, ey, ez),
                zmid(ex + 1, ey + 1, ez),
                zmid(ex, ey + 1, ez),
            ]
        }
    }
}

/// Physical coordinates of every standard node, in standard-index order.
/// Built by the same nested-loop order the `*_std_*` index formulas above
/// assume, so index <-> coordinate correspondence holds by construction.
pub fn standard_node_coords(kind: ElementKind, res: &[usize], size: &[f64]) -> Vec<Vec<f64>> {
    match kind {
        ElementKind::Quad4 => {
            let (nx, ny) = (res[0], res[1]);
            let (dx, dy) = (size[0] / nx as f64, size[1] / ny as f64);
            let mut coords = Vec::with_capacity((nx + 1) * (ny + 1));
            for j in 0..=ny {
                for i in 0..=nx {
                    coords.push(vec![i as f64 * dx, j as f64 * dy]);
                }
            }
            coords
        }
        ElementKind::Quad8 => {
            let (nx, ny) = (res[0], res[1]);
            let (dx, dy) = (size[0] / nx as f64, size[1] / ny as f64);
            let mut coords = Vec::new();
            for j in 0..=ny {
                for i in 0..=nx {
                    coords.push(vec![i as f64 * dx, j as f64 * dy]);
                }
            }
            for j in 0..=ny {
                for i in 0..nx {
                    coords.push(vec![(i as f64 + 0.5) * dx, j as f64 * dy]);
                }
            }
            for j in 0..ny {
                for i in 0..=nx {
                    coords.push(vec![i as f64 * dx, (j as f64 + 0.5) * dy]);
                }
            }
            coords
        }
        ElementKind::Hex8 => {
            let (nx, ny, nz) = (res[0], res[1], res[2]);
            let (dx, dy, dz) = (size[0] / nx as f64, size[1] / ny as f64, size[2] / nz as f64);
            let mut coords = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
            for k in 0..=nz {
                for j in 0..=ny {
                    for i in 0..=nx {
                        coords.push(vec![i as f64 * dx, j as f64 * dy, k as f64 * dz]);
                    }
                }
            }
            coords
        }
        ElementKind::Hex20 => {
            let (nx, ny, nz) = (res[0], res[1], res[2]);
            let (dx, dy, dz) = (size[0] / nx as f64, size[1] / ny as f64, size[2] / nz as f64);
            let mut coords = Vec::new();
            for k in 0..=nz {
                for j in 0..=ny {
                    for i in 0..=nx {
                        coords.push(vec![i as f64 * dx, j as f64 * dy, k as f64 * dz]);
                    }
                }
            }
            for k in 0..=nz {
                for j in 0..=ny {
                    for i in 0..nx {
                        coords.push(vec![(i as f64 + 0.5) * dx, j as f64 * dy, k as f64 * dz]);
                    }
                }
            }
            for k in 0..=nz {
                for j in 0..ny {
                    for i in 0..=nx {
                        coords.push(vec![i as f64 * dx, (j as f64 + 0.5) * dy, k as f64 * dz]);
                    }
                }
            }
            for k in 0..nz {
                for j in 0..=ny {
                    for i in 0..=nx {
                        coords.push(vec![i as f64 * dx, j as f64 * dy, (k as f64 + 0.5) * dz]);
                    }
                }
            }
            coords
        }
    }
}
