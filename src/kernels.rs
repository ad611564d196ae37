//! Per-element stiffness and source kernels (§4.3).
//!
//! Each kernel integrates `Bᵀ C B |det J|` (stiffness) and a `B`-derived
//! source matrix over the element's own quadrature rule, at unit density;
//! density scaling is applied later by the matrix-free operator.

use nalgebra::DMatrix;

use crate::elements::material::{ElasticMaterial, PiezoelectricMaterial, TransportMaterial};
use crate::elements::{check_jacobian, jacobian, voigt_size, ReferenceElement};
use crate::error::{CellError, CellResult};

fn symmetrize(m: &mut DMatrix<f64>) {
    let t = m.transpose();
    *m = (&*m + &t) * 0.5;
}

/// `D x K` global shape function gradient `J⁻¹ · ∂N/∂ξ` and `det J`.
fn global_gradient(grad_n: &DMatrix<f64>, nodes: &DMatrix<f64>) -> CellResult<(DMatrix<f64>, f64)> {
    let j = jacobian(grad_n, nodes);
    let det = j.determinant();
    check_jacobian(det)?;
    let j_inv = j
        .clone()
        .try_inverse()
        .ok_or(CellError::DegenerateElement(det))?;
    Ok((j_inv * grad_n, det))
}

/// Elastic strain-displacement matrix, 2D: `3 x 2K`.
fn elastic_b_2d(g: &DMatrix<f64>) -> DMatrix<f64> {
    let k = g.ncols();
    let mut b = DMatrix::zeros(3, 2 * k);
    for i in 0..k {
        b[(0, 2 * i)] = g[(0, i)];
        b[(1, 2 * i + 1)] = g[(1, i)];
        b[(2, 2 * i)] = g[(1, i)];
        b[(2, 2 * i + 1)] = g[(0, i)];
    }
    b
}

/// Elastic strain-displacement matrix, 3D: `6 x 3K`.
fn elastic_b_3d(g: &DMatrix<f64>) -> DMatrix<f64> {
    let k = g.ncols();
    let mut b = DMatrix::zeros(6, 3 * k);
    for i in 0..k {
        let (gx, gy, gz) = (g[(0, i)], g[(1, i)], g[(2, i)]);
        b[(0, 3 * i)] = gx;
        b[(1, 3 * i + 1)] = gy;
        b[(2, 3 * i + 2)] = gz;
        // shear rows: (xy), (xz), (yz)
        b[(3, 3 * i)] = gy;
        b[(3, 3 * i + 1)] = gx;
        b[(4, 3 * i)] = gz;
        b[(4, 3 * i + 2)] = gx;
        b[(5, 3 * i + 1)] = gz;
        b[(5, 3 * i + 2)] = gy;
    }
    b
}

fn elastic_b_matrix(dim: usize, g: &DMatrix<f64>) -> DMatrix<f64> {
    match dim {
        2 => elastic_b_2d(g),
        3 => elastic_b_3d(g),
        _ => unreachable!("dim must be 2 or 3"),
    }
}

/// Scalar transport gradient matrix `s · J⁻¹ · ∂N/∂ξ`, `D x K`.
fn transport_b_matrix(g: &DMatrix<f64>, sign: f64) -> DMatrix<f64> {
    g * sign
}

/// `(Kₑ, Fₑ)` for the elastic physics: `Kₑ` is `(D·K) x (D·K)`, `Fₑ` is
/// `(D·K) x VoigtSize`.
pub fn elastic_kernel<E: ReferenceElement>(
    nodes: &DMatrix<f64>,
    material: &ElasticMaterial,
) -> CellResult<(DMatrix<f64>, DMatrix<f64>)> {
    let dim = E::DIM;
    let num_dofs = dim * E::NUM_NODES;
    let voigt = voigt_size(dim);
    let mut ke = DMatrix::zeros(num_dofs, num_dofs);
    let mut fe = DMatrix::zeros(num_dofs, voigt);

    let rule = E::quadrature_rule();
    for (xi, w) in rule.points.iter().zip(&rule.weights) {
        let grad_n = E::grad_shape_functions(xi);
        let (g, det) = global_gradient(&grad_n, nodes)?;
        let b = elastic_b_matrix(dim, &g);
        let scale = det.abs() * w;
        ke += b.transpose() * &material.c * &b * scale;
        fe += -(b.transpose() * &material.c) * scale;
    }
    symmetrize(&mut ke);
    Ok((ke, fe))
}

/// `(Kₑ, Fₑ)` for scalar transport: `Kₑ` is `K x K`, `Fₑ` is `K x D`.
/// `sign` is the gradient sign convention (`+1` or `-1`, §4.3); it cancels
/// in `Kₑ` but flips `Fₑ`.
pub fn transport_kernel<E: ReferenceElement>(
    nodes: &DMatrix<f64>,
    material: &TransportMaterial,
    sign: f64,
) -> CellResult<(DMatrix<f64>, DMatrix<f64>)> {
    let dim = E::DIM;
    let num_nodes = E::NUM_NODES;
    let mut ke = DMatrix::zeros(num_nodes, num_nodes);
    let mut fe = DMatrix::zeros(num_nodes, dim);

    let rule = E::quadrature_rule();
    for (xi, w) in rule.points.iter().zip(&rule.weights) {
        let grad_n = E::grad_shape_functions(xi);
        let (g, det) = global_gradient(&grad_n, nodes)?;
        let b = transport_b_matrix(&g, sign);
        let scale = det.abs() * w;
        ke += b.transpose() * &material.k * &b * scale;
        fe += -(b.transpose() * &material.k) * scale;
    }
    symmetrize(&mut ke);
    Ok((ke, fe))
}

/// `(Kₑ, Fₑ)` for the coupled piezoelectric physics, block-assembled per
/// §4.3: `NumDofs = D·K + K`, `NumMacroFields = VoigtSize + D`. The
/// electric gradient uses the negative ("electric-like") sign convention.
pub fn piezo_kernel<E: ReferenceElement>(
    nodes: &DMatrix<f64>,
    material: &PiezoelectricMaterial,
) -> CellResult<(DMatrix<f64>, DMatrix<f64>)> {
    const ELECTRIC_SIGN: f64 = -1.0;

    let dim = E::DIM;
    let k = E::NUM_NODES;
    let voigt = voigt_size(dim);
    let u_dofs = dim * k;
    let num_dofs = u_dofs + k;
    let num_macro = voigt + dim;

    let mut k_uu = DMatrix::zeros(u_dofs, u_dofs);
    let mut k_phiphi_raw = DMatrix::zeros(k, k);
    let mut k_phiu = DMatrix::zeros(k, u_dofs);
    let mut f_uu = DMatrix::zeros(u_dofs, voigt);
    let mut f_phiphi_raw = DMatrix::zeros(k, dim);
    let mut f_phiu = DMatrix::zeros(k, voigt);
    let mut f_uphi = DMatrix::zeros(u_dofs, dim);

    let rule = E::quadrature_rule();
    for (xi, w) in rule.points.iter().zip(&rule.weights) {
        let grad_n = E::grad_shape_functions(xi);
        let (g, det) = global_gradient(&grad_n, nodes)?;
        let b_u = elastic_b_matrix(dim, &g);
        let b_phi = transport_b_matrix(&g, ELECTRIC_SIGN);
        let scale = det.abs() * w;
        let d = &material.d;

        k_uu += b_u.transpose() * &material.elastic.c * &b_u * scale;
        k_phiphi_raw += b_phi.transpose() * &material.permittivity.k * &b_phi * scale;
        k_phiu += b_phi.transpose() * d * &b_u * scale;

        f_uu += -(b_u.transpose() * &material.elastic.c) * scale;
        f_phiphi_raw += -(b_phi.transpose() * &material.permittivity.k) * scale;
        f_phiu += -(b_phi.transpose() * d) * scale;
        f_uphi += b_u.transpose() * d.transpose() * scale;
    }

    let mut ke = DMatrix::zeros(num_dofs, num_dofs);
    ke.view_mut((0, 0), (u_dofs, u_dofs)).copy_from(&k_uu);
    ke.view_mut((0, u_dofs), (u_dofs, k))
        .copy_from(&(-k_phiu.transpose()));
    ke.view_mut((u_dofs, 0), (k, u_dofs)).copy_from(&(-&k_phiu));
    ke.view_mut((u_dofs, u_dofs), (k, k))
        .copy_from(&(-&k_phiphi_raw));
    symmetrize(&mut ke);

    let mut fe = DMatrix::zeros(num_dofs, num_macro);
    fe.view_mut((0, 0), (u_dofs, voigt)).copy_from(&f_uu);
    fe.view_mut((0, voigt), (u_dofs, dim)).copy_from(&f_uphi);
    fe.view_mut((u_dofs, 0), (k, voigt)).copy_from(&f_phiu);
    fe.view_mut((u_dofs, voigt), (k, dim))
        .copy_from(&(-&f_phiphi_raw));

    Ok((ke, fe))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElasticMaterial, Hex8, Quad4, Quad8, TransportMaterial};
    use approx::assert_abs_diff_eq;

    fn unit_quad4_nodes() -> DMatrix<f64> {
        DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])
    }

    #[test]
    fn elastic_stiffness_is_symmetric_and_psd() {
        let nodes = unit_quad4_nodes();
        let material = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
        let (ke, _fe) = elastic_kernel::<Quad4>(&nodes, &material).unwrap();
        assert_abs_diff_eq!(ke.clone(), ke.transpose(), epsilon = 1e-10);
        let eigen = ke.clone().symmetric_eigenvalues();
        assert!(eigen.iter().all(|&lambda| lambda >= -1e-8));
    }

    #[test]
    fn rigid_body_translation_is_in_stiffness_nullspace() {
        let nodes = unit_quad4_nodes();
        let material = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
        let (ke, fe) = elastic_kernel::<Quad4>(&nodes, &material).unwrap();
        // Unit translation in x: u = (1,0) at every node.
        let u_r = DMatrix::from_row_slice(8, 1, &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let energy = (u_r.transpose() * &ke * &u_r)[(0, 0)];
        assert_abs_diff_eq!(energy, 0.0, epsilon = 1e-8);
        let work = u_r.transpose() * &fe;
        for v in work.iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn transport_stiffness_is_symmetric_and_psd() {
        let nodes = unit_quad4_nodes();
        let material = TransportMaterial::isotropic(2, 2.1).unwrap();
        let (ke, _) = transport_kernel::<Quad4>(&nodes, &material, 1.0).unwrap();
        assert_abs_diff_eq!(ke.clone(), ke.transpose(), epsilon = 1e-10);
        let eigen = ke.clone().symmetric_eigenvalues();
        assert!(eigen.iter().all(|&lambda| lambda >= -1e-8));
    }

    #[test]
    fn transport_sign_convention_does_not_change_stiffness() {
        let nodes = unit_quad4_nodes();
        let material = TransportMaterial::isotropic(2, 2.1).unwrap();
        let (ke_pos, _) = transport_kernel::<Quad4>(&nodes, &material, 1.0).unwrap();
        let (ke_neg, _) = transport_kernel::<Quad4>(&nodes, &material, -1.0).unwrap();
        assert_abs_diff_eq!(ke_pos, ke_neg, epsilon = 1e-12);
    }

    #[test]
    fn quad8_elastic_kernel_has_expected_shape() {
        let nodes = DMatrix::from_row_slice(
            8,
            2,
            &[
                0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.5, 0.0, 1.0, 0.5, 0.5, 1.0, 0.0, 0.5,
            ],
        );
        let material = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
        let (ke, fe) = elastic_kernel::<Quad8>(&nodes, &material).unwrap();
        assert_eq!(ke.nrows(), 16);
        assert_eq!(ke.ncols(), 16);
        assert_eq!(fe.ncols(), 3);
    }

    #[test]
    fn hex8_elastic_kernel_has_expected_shape() {
        let nodes = DMatrix::from_row_slice(
            8,
            3,
            &[
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0,
                0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
            ],
        );
        let material = ElasticMaterial::isotropic(3, 1.0, 0.3).unwrap();
        let (ke, fe) = elastic_kernel::<Hex8>(&nodes, &material).unwrap();
        assert_eq!(ke.nrows(), 24);
        assert_eq!(fe.ncols(), 6);
    }
}
