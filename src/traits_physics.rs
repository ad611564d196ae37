//! Per-physics dof bookkeeping for the matrix-free operator (§4.4).
//!
//! Each physics fixes a small, known set of dofs at the origin node to
//! remove the rigid-body/constant-mode nullspace before the reduced system
//! is solved. The fixed set is always a union of two contiguous runs (never
//! more), so `reduced_dof`/`expanded_dof` are closed-form rather than a
//! generic search. `dim` (2 or 3) is a runtime parameter rather than a
//! const generic since it is only known once a concrete element/grid is
//! chosen, not at the physics-strategy-type level.
pub trait PhysicsDofs {
    /// Dofs carried per (periodic) node.
    fn num_node_dofs(dim: usize) -> usize;
    /// Dofs fixed to zero to remove the rigid-body/constant-mode nullspace.
    fn num_fixed_dofs(dim: usize) -> usize;

    /// Flat global dof list for an element's periodic node list, in the
    /// local ordering the FEM kernels build `Kₑ`/`Fₑ` against.
    fn dofs(element_nodes: &[usize], num_nodes: usize, dim: usize) -> Vec<usize>;

    /// Whether `dof` (in `0..num_node_dofs(dim)*num_nodes`) is pinned to zero.
    fn is_fixed_dof(dof: usize, num_nodes: usize, dim: usize) -> bool;

    /// Maps a non-fixed dof to its index in the reduced system.
    fn reduced_dof(dof: usize, num_nodes: usize, dim: usize) -> usize;

    /// Inverse of [`PhysicsDofs::reduced_dof`].
    fn expanded_dof(reduced: usize, num_nodes: usize, dim: usize) -> usize;

    /// Reads local dof `component` (`0..num_node_dofs(dim)`) of node `node`
    /// out of a standard-dof vector built by [`PhysicsDofs::dofs`]'s layout.
    /// Default assumes node-major interleaving (`node * num_node_dofs +
    /// component`), which holds for [`ElasticDofs`] and [`TransportDofs`];
    /// [`PiezoDofs`] overrides this since its vector is block-structured
    /// rather than interleaved.
    fn node_component(
        vec: &nalgebra::DVector<f64>,
        node: usize,
        component: usize,
        _num_nodes: usize,
        dim: usize,
    ) -> f64 {
        vec[node * Self::num_node_dofs(dim) + component]
    }
}

/// Linear elasticity: `dim` displacement dofs per node, node-major
/// (`node * dim + component`). Fixes the origin node's `dim` dofs.
#[derive(Debug, Clone, Copy)]
pub struct ElasticDofs;

impl PhysicsDofs for ElasticDofs {
    fn num_node_dofs(dim: usize) -> usize {
        dim
    }

    fn num_fixed_dofs(dim: usize) -> usize {
        dim
    }

    fn dofs(element_nodes: &[usize], _num_nodes: usize, dim: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(element_nodes.len() * dim);
        for &n in element_nodes {
            for c in 0..dim {
                out.push(n * dim + c);
            }
        }
        out
    }

    fn is_fixed_dof(dof: usize, _num_nodes: usize, dim: usize) -> bool {
        dof < dim
    }

    fn reduced_dof(dof: usize, _num_nodes: usize, dim: usize) -> usize {
        dof - dim
    }

    fn expanded_dof(reduced: usize, _num_nodes: usize, dim: usize) -> usize {
        reduced + dim
    }
}

/// Scalar transport: one potential dof per node. Fixes the origin node's
/// potential. `dim` only affects `dofs`' caller-side macroscopic field
/// shape, not this physics's own dof layout.
#[derive(Debug, Clone, Copy)]
pub struct TransportDofs;

impl PhysicsDofs for TransportDofs {
    fn num_node_dofs(_dim: usize) -> usize {
        1
    }

    fn num_fixed_dofs(_dim: usize) -> usize {
        1
    }

    fn dofs(element_nodes: &[usize], _num_nodes: usize, _dim: usize) -> Vec<usize> {
        element_nodes.to_vec()
    }

    fn is_fixed_dof(dof: usize, _num_nodes: usize, _dim: usize) -> bool {
        dof == 0
    }

    fn reduced_dof(dof: usize, _num_nodes: usize, _dim: usize) -> usize {
        dof - 1
    }

    fn expanded_dof(reduced: usize, _num_nodes: usize, _dim: usize) -> usize {
        reduced + 1
    }
}

/// Coupled piezoelectric: `dim` displacement dofs per node (block `[0,
/// num_nodes*dim)`) followed by one potential dof per node (block
/// `[num_nodes*dim, num_nodes*(dim+1))`). Fixes the origin node's
/// displacement dofs and its potential dof — the latter offset by
/// `num_nodes*dim` into the potential block.
#[derive(Debug, Clone, Copy)]
pub struct PiezoDofs;

impl PhysicsDofs for PiezoDofs {
    fn num_node_dofs(dim: usize) -> usize {
        dim + 1
    }

    fn num_fixed_dofs(dim: usize) -> usize {
        dim + 1
    }

    fn dofs(element_nodes: &[usize], num_nodes: usize, dim: usize) -> Vec<usize> {
        let mut out = ElasticDofs::dofs(element_nodes, num_nodes, dim);
        out.extend(element_nodes.iter().map(|&n| num_nodes * dim + n));
        out
    }

    fn is_fixed_dof(dof: usize, num_nodes: usize, dim: usize) -> bool {
        dof < dim || dof == num_nodes * dim
    }

    fn reduced_dof(dof: usize, num_nodes: usize, dim: usize) -> usize {
        let phi_origin = num_nodes * dim;
        if dof < phi_origin {
            dof - dim
        } else {
            dof - dim - 1
        }
    }

    fn expanded_dof(reduced: usize, num_nodes: usize, dim: usize) -> usize {
        let num_u_reduced = num_nodes * dim - dim;
        if reduced < num_u_reduced {
            reduced + dim
        } else {
            reduced + dim + 1
        }
    }

    /// Displacement components (`component < dim`) live in the node-major
    /// block `[0, num_nodes*dim)`; the potential (`component == dim`) lives
    /// in the per-node block `[num_nodes*dim, num_nodes*(dim+1))`, indexed
    /// by node directly rather than interleaved with displacement.
    fn node_component(
        vec: &nalgebra::DVector<f64>,
        node: usize,
        component: usize,
        num_nodes: usize,
        dim: usize,
    ) -> f64 {
        if component < dim {
            vec[node * dim + component]
        } else {
            vec[num_nodes * dim + node]
        }
    }
}
