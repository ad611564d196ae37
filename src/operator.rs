//! Matrix-free global reduced-stiffness operator and its two iterative
//! solves (§4.4, §4.5): preconditioned CG for the symmetric positive
//! semidefinite elastic/transport operators, and preconditioned BiCGStab for
//! the symmetric-but-indefinite piezoelectric operator.
//!
//! The global stiffness is never assembled. Per-element dofs are
//! precomputed once as reduced-index arrays (with a `-1` sentinel for
//! fixed dofs); `apply` gathers, scales by density, and scatters.

use nalgebra::{DMatrix, DVector};

use crate::error::{CellError, CellResult};
use crate::grid::PeriodicGrid;
use crate::traits_physics::PhysicsDofs;

/// `K · x` on the reduced (non-fixed) dof space, density-weighted per
/// element from a single precomputed reference element matrix `Kᵣ`.
pub struct MatrixFreeOperator {
    /// Reduced dof index (or `-1` if fixed) for each element, local order.
    element_dofs: Vec<Vec<i64>>,
    densities: Vec<f64>,
    k_ref: DMatrix<f64>,
    n_reduced: usize,
    diag: DVector<f64>,
}

impl MatrixFreeOperator {
    /// Builds the operator's element-dof index table and Jacobi diagonal
    /// from `grid`'s periodic connectivity and the physics dof strategy `P`.
    pub fn new<P: PhysicsDofs>(grid: &dyn PeriodicGrid, k_ref: DMatrix<f64>) -> CellResult<Self> {
        let dim = grid.dim();
        let num_periodic_nodes = grid.num_periodic_nodes();
        let n_total = P::num_node_dofs(dim) * num_periodic_nodes;
        let n_reduced = n_total - P::num_fixed_dofs(dim);

        let num_elements = grid.num_elements();
        let mut element_dofs = Vec::with_capacity(num_elements);
        let mut densities = Vec::with_capacity(num_elements);
        let mut diag = DVector::zeros(n_reduced);

        for i in 0..num_elements {
            let periodic_nodes = grid.periodic_element(i)?;
            let global_dofs = P::dofs(&periodic_nodes, num_periodic_nodes, dim);
            let rho = grid.density(i)?;
            let reduced: Vec<i64> = global_dofs
                .iter()
                .map(|&d| {
                    if P::is_fixed_dof(d, num_periodic_nodes, dim) {
                        -1
                    } else {
                        P::reduced_dof(d, num_periodic_nodes, dim) as i64
                    }
                })
                .collect();
            for (j, &g) in reduced.iter().enumerate() {
                if g >= 0 {
                    diag[g as usize] += rho * k_ref[(j, j)];
                }
            }
            element_dofs.push(reduced);
            densities.push(rho);
        }

        Ok(Self {
            element_dofs,
            densities,
            k_ref,
            n_reduced,
            diag,
        })
    }

    pub fn n_reduced(&self) -> usize {
        self.n_reduced
    }

    /// `y = K · x` via per-element gather/scale/scatter.
    pub fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut y = DVector::zeros(self.n_reduced);
        for (dofs, &rho) in self.element_dofs.iter().zip(&self.densities) {
            let num_local = dofs.len();
            let mut x_local = DVector::zeros(num_local);
            for (j, &g) in dofs.iter().enumerate() {
                if g >= 0 {
                    x_local[j] = x[g as usize];
                }
            }
            let y_local = &self.k_ref * x_local * rho;
            for (j, &g) in dofs.iter().enumerate() {
                if g >= 0 {
                    y[g as usize] += y_local[j];
                }
            }
        }
        y
    }

    /// Jacobi preconditioner application `z = r / diag`.
    pub fn precondition(&self, r: &DVector<f64>) -> DVector<f64> {
        r.component_div(&self.diag)
    }

    /// Gathers a reduced right-hand side from a per-element reference
    /// source column `f_ref_col` (length `NumElementDofs`), density-scaled.
    pub fn assemble_rhs(&self, f_ref_col: &DVector<f64>) -> DVector<f64> {
        let mut b = DVector::zeros(self.n_reduced);
        for (dofs, &rho) in self.element_dofs.iter().zip(&self.densities) {
            let local = f_ref_col * rho;
            for (j, &g) in dofs.iter().enumerate() {
                if g >= 0 {
                    b[g as usize] += local[j];
                }
            }
        }
        b
    }

    /// Expands a reduced-space vector to the full periodic-node dof space,
    /// placing zeros at the dofs fixed by `P`.
    pub fn expand_to_periodic<P: PhysicsDofs>(
        &self,
        x_red: &DVector<f64>,
        num_periodic_nodes: usize,
        dim: usize,
    ) -> DVector<f64> {
        let n_total = P::num_node_dofs(dim) * num_periodic_nodes;
        let mut out = DVector::zeros(n_total);
        for dof in 0..n_total {
            if !P::is_fixed_dof(dof, num_periodic_nodes, dim) {
                let r = P::reduced_dof(dof, num_periodic_nodes, dim);
                out[dof] = x_red[r];
            }
        }
        out
    }
}

/// Preconditioned conjugate gradient, matrix-free via `op.apply`.
///
/// `tolerance` is a relative-residual threshold: `||r|| / max(||b||, eps)`.
pub fn solve_pcg(
    op: &MatrixFreeOperator,
    b: &DVector<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> CellResult<DVector<f64>> {
    let n = b.len();
    let b_norm = b.norm().max(crate::NUMERICAL_ZERO);

    let mut x = DVector::zeros(n);
    let mut r = b.clone();
    let rel_residual = r.norm() / b_norm;
    log::trace!("pcg iter 0: relative residual {rel_residual:e}");
    if rel_residual < tolerance {
        return Ok(x);
    }

    let mut z = op.precondition(&r);
    let mut p = z.clone();
    let mut r_dot_z = r.dot(&z);

    for iter in 0..max_iterations {
        let ap = op.apply(&p);
        let p_dot_ap = p.dot(&ap);
        if p_dot_ap.abs() < 1e-300 {
            return Err(CellError::NumericalIssue(format!(
                "conjugate direction breakdown at iteration {iter}: p^T A p = {p_dot_ap:e}"
            )));
        }

        let alpha = r_dot_z / p_dot_ap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        let rel_residual = r.norm() / b_norm;
        log::trace!("pcg iter {}: relative residual {rel_residual:e}", iter + 1);
        if rel_residual < tolerance {
            return Ok(x);
        }

        z = op.precondition(&r);
        let r_dot_z_new = r.dot(&z);
        if !r_dot_z_new.is_finite() {
            return Err(CellError::NumericalIssue(
                "non-finite residual during PCG iteration".into(),
            ));
        }
        let beta = r_dot_z_new / r_dot_z;
        r_dot_z = r_dot_z_new;
        p = &z + beta * &p;
    }

    let final_residual = (b - op.apply(&x)).norm() / b_norm;
    log::warn!(
        "pcg did not converge after {max_iterations} iterations: relative residual {final_residual:e} (tolerance {tolerance:e})"
    );
    Err(CellError::SolverFailure {
        iterations: max_iterations,
        residual: final_residual,
        tolerance,
    })
}

/// Preconditioned BiCGStab (Saad, *Iterative Methods for Sparse Linear
/// Systems*, Algorithm 7.7), matrix-free via `op.apply`/`op.precondition`.
///
/// PCG requires `K` symmetric positive semidefinite; the piezoelectric
/// reduced operator is symmetric but indefinite (the `-K_φφ` block is
/// negative-definite), so its Jacobi-preconditioned inner product is
/// sign-indefinite and PCG has no convergence guarantee there (§4.5). This
/// is the BiCGStab path §4.5 names for that case: it only needs `K`
/// symmetric, not definite.
pub fn solve_bicgstab(
    op: &MatrixFreeOperator,
    b: &DVector<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> CellResult<DVector<f64>> {
    let n = b.len();
    let b_norm = b.norm().max(crate::NUMERICAL_ZERO);

    let mut x = DVector::zeros(n);
    let mut r = b.clone();
    let rel_residual = r.norm() / b_norm;
    log::trace!("bicgstab iter 0: relative residual {rel_residual:e}");
    if rel_residual < tolerance {
        return Ok(x);
    }

    let r_hat0 = r.clone();
    let mut p = r.clone();
    let mut rho_prev = r.dot(&r_hat0);

    for iter in 0..max_iterations {
        let p_hat = op.precondition(&p);
        let ap_hat = op.apply(&p_hat);
        let denom = ap_hat.dot(&r_hat0);
        if denom.abs() < 1e-300 {
            return Err(CellError::NumericalIssue(format!(
                "BiCGStab breakdown at iteration {iter}: (A p_hat, r0_hat) = {denom:e}"
            )));
        }
        let alpha = rho_prev / denom;

        let mut s = r.clone();
        s.axpy(-alpha, &ap_hat, 1.0);

        let s_rel_residual = s.norm() / b_norm;
        if s_rel_residual < tolerance {
            x.axpy(alpha, &p_hat, 1.0);
            log::trace!(
                "bicgstab iter {iter}: converged at half-step, relative residual {s_rel_residual:e}"
            );
            return Ok(x);
        }

        let s_hat = op.precondition(&s);
        let as_hat = op.apply(&s_hat);
        let as_hat_dot_as_hat = as_hat.dot(&as_hat);
        if as_hat_dot_as_hat.abs() < 1e-300 {
            return Err(CellError::NumericalIssue(format!(
                "BiCGStab breakdown at iteration {iter}: (A s_hat, A s_hat) = {as_hat_dot_as_hat:e}"
            )));
        }
        let omega = as_hat.dot(&s) / as_hat_dot_as_hat;
        if omega.abs() < 1e-300 {
            return Err(CellError::NumericalIssue(format!(
                "BiCGStab breakdown at iteration {iter}: omega = {omega:e}"
            )));
        }

        x.axpy(alpha, &p_hat, 1.0);
        x.axpy(omega, &s_hat, 1.0);

        let mut r_new = s.clone();
        r_new.axpy(-omega, &as_hat, 1.0);

        let rel_residual = r_new.norm() / b_norm;
        log::trace!("bicgstab iter {}: relative residual {rel_residual:e}", iter + 1);
        if rel_residual < tolerance {
            return Ok(x);
        }

        let rho_new = r_new.dot(&r_hat0);
        if !rho_new.is_finite() {
            return Err(CellError::NumericalIssue(
                "non-finite residual during BiCGStab iteration".into(),
            ));
        }
        if rho_prev.abs() < 1e-300 {
            return Err(CellError::NumericalIssue(format!(
                "BiCGStab breakdown at iteration {iter}: rho_prev ~ 0"
            )));
        }
        let beta = (rho_new / rho_prev) * (alpha / omega);

        let mut p_next = p.clone();
        p_next.axpy(-omega, &ap_hat, 1.0);
        p = &r_new + beta * &p_next;

        r = r_new;
        rho_prev = rho_new;
    }

    let final_residual = (b - op.apply(&x)).norm() / b_norm;
    log::warn!(
        "bicgstab did not converge after {max_iterations} iterations: relative residual {final_residual:e} (tolerance {tolerance:e})"
    );
    Err(CellError::SolverFailure {
        iterations: max_iterations,
        residual: final_residual,
        tolerance,
    })
}
