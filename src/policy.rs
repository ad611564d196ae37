//! Physics policy objects: macroscopic loading construction and
//! homogenized-tensor splitting, per physics (§4.5, §8 "Policy-specific
//! result extraction").
//!
//! Each policy is a zero-sized strategy type, the same "type carries only
//! associated items" shape as [`crate::elements::ReferenceElement`] and
//! [`crate::traits_physics::PhysicsDofs`] — generalizing `fea-solver`'s
//! `AnalysisType`/`AnalysisOptions` split from one enum consumed by a single
//! solve routine into one trait per physics, since elastic/transport/piezo
//! carry distinct result and tensor shapes an enum match would blur.

use std::marker::PhantomData;

use nalgebra::DMatrix;

use crate::elements::material::{ElasticMaterial, PiezoelectricMaterial, TransportMaterial};
use crate::elements::{voigt_size, ReferenceElement};
use crate::error::CellResult;
use crate::kernels::{elastic_kernel, piezo_kernel, transport_kernel};
use crate::traits_physics::{ElasticDofs, PhysicsDofs, PiezoDofs, TransportDofs};

/// The homogenized tensor(s), already split into their user-facing shapes.
#[derive(Debug, Clone)]
pub enum Tensors {
    Elastic(DMatrix<f64>),
    Transport(DMatrix<f64>),
    Piezo {
        c_bar: DMatrix<f64>,
        eps_bar: DMatrix<f64>,
        d_bar: DMatrix<f64>,
    },
}

/// Marker for the scalar-transport gradient sign convention (§4.3):
/// negative for electric-like fields, positive for mass/flow/thermal-like.
pub trait GradientSign {
    const SIGN: f64;
}

#[derive(Debug, Clone, Copy)]
pub struct Negative;
impl GradientSign for Negative {
    const SIGN: f64 = -1.0;
}

#[derive(Debug, Clone, Copy)]
pub struct Positive;
impl GradientSign for Positive {
    const SIGN: f64 = 1.0;
}

/// Per-physics glue: which dof strategy and kernel to use, how to build the
/// macroscopic loading field, and how to split the Hill-Mandel result back
/// into the physics's tensors.
pub trait PhysicsPolicy<E: ReferenceElement> {
    type Dofs: PhysicsDofs;
    type Material;

    /// Whether this physics's reduced operator is symmetric indefinite
    /// rather than symmetric positive semidefinite (§4.5). PCG is only
    /// valid for the latter; indefinite operators (piezoelectric's negative
    /// `-K_φφ` block) are solved with BiCGStab instead.
    const INDEFINITE: bool = false;

    /// `NumMacroFields`, i.e. the number of independent macroscopic loading
    /// directions (columns of `X̄`).
    fn num_macro_fields(dim: usize) -> usize;

    /// `(Kₑ, Fₑ)` at unit density for one element.
    fn element_kernel(
        nodes: &DMatrix<f64>,
        material: &Self::Material,
    ) -> CellResult<(DMatrix<f64>, DMatrix<f64>)>;

    /// Macroscopic field `X̄`, size `num_nodes * Dofs::num_node_dofs(dim) x
    /// NumMacroFields`, indexed by *standard* node.
    fn macro_field(dim: usize, node_coords: &[Vec<f64>]) -> DMatrix<f64>;

    /// Splits the `NumMacroFields x NumMacroFields` homogenized operator
    /// into the physics's user-facing tensor(s).
    fn split_tensor(m_bar: DMatrix<f64>, dim: usize) -> Tensors;
}

fn fill_elastic_macro_field(dim: usize, node_coords: &[Vec<f64>]) -> DMatrix<f64> {
    let num_nodes = node_coords.len();
    let voigt = voigt_size(dim);
    let mut x = DMatrix::zeros(num_nodes * dim, voigt);
    for (i, coord) in node_coords.iter().enumerate() {
        if dim == 2 {
            let (px, py) = (coord[0], coord[1]);
            x[(2 * i, 0)] = px;
            x[(2 * i + 1, 1)] = py;
            x[(2 * i, 2)] = py / 2.0;
            x[(2 * i + 1, 2)] = px / 2.0;
        } else {
            let (px, py, pz) = (coord[0], coord[1], coord[2]);
            x[(3 * i, 0)] = px;
            x[(3 * i + 1, 1)] = py;
            x[(3 * i + 2, 2)] = pz;
            // shear columns: eps12, eps13, eps23, half-symmetric entries.
            x[(3 * i, 3)] = py / 2.0;
            x[(3 * i + 1, 3)] = px / 2.0;
            x[(3 * i, 4)] = pz / 2.0;
            x[(3 * i + 2, 4)] = px / 2.0;
            x[(3 * i + 1, 5)] = pz / 2.0;
            x[(3 * i + 2, 5)] = py / 2.0;
        }
    }
    x
}

fn fill_transport_macro_field(dim: usize, node_coords: &[Vec<f64>], sign: f64) -> DMatrix<f64> {
    let num_nodes = node_coords.len();
    let mut x = DMatrix::zeros(num_nodes, dim);
    for (i, coord) in node_coords.iter().enumerate() {
        for d in 0..dim {
            x[(i, d)] = sign * coord[d];
        }
    }
    x
}

/// Linear elasticity: `M̄ = C̄` directly.
pub struct ElasticPolicy<E>(PhantomData<E>);

impl<E: ReferenceElement> PhysicsPolicy<E> for ElasticPolicy<E> {
    type Dofs = ElasticDofs;
    type Material = ElasticMaterial;

    fn num_macro_fields(dim: usize) -> usize {
        voigt_size(dim)
    }

    fn element_kernel(
        nodes: &DMatrix<f64>,
        material: &Self::Material,
    ) -> CellResult<(DMatrix<f64>, DMatrix<f64>)> {
        elastic_kernel::<E>(nodes, material)
    }

    fn macro_field(dim: usize, node_coords: &[Vec<f64>]) -> DMatrix<f64> {
        fill_elastic_macro_field(dim, node_coords)
    }

    fn split_tensor(m_bar: DMatrix<f64>, _dim: usize) -> Tensors {
        Tensors::Elastic(m_bar)
    }
}

/// Scalar transport: `M̄ = K̄` directly. `S` fixes the gradient sign
/// convention at the type level (§4.3).
pub struct TransportPolicy<E, S>(PhantomData<(E, S)>);

impl<E: ReferenceElement, S: GradientSign> PhysicsPolicy<E> for TransportPolicy<E, S> {
    type Dofs = TransportDofs;
    type Material = TransportMaterial;

    fn num_macro_fields(dim: usize) -> usize {
        dim
    }

    fn element_kernel(
        nodes: &DMatrix<f64>,
        material: &Self::Material,
    ) -> CellResult<(DMatrix<f64>, DMatrix<f64>)> {
        transport_kernel::<E>(nodes, material, S::SIGN)
    }

    fn macro_field(dim: usize, node_coords: &[Vec<f64>]) -> DMatrix<f64> {
        fill_transport_macro_field(dim, node_coords, S::SIGN)
    }

    fn split_tensor(m_bar: DMatrix<f64>, _dim: usize) -> Tensors {
        Tensors::Transport(m_bar)
    }
}

/// Coupled piezoelectric: block-diagonal macroscopic field, block-split
/// result `c̄ = M̄[:V,:V]`, `ε̄ = −M̄[V:,V:]`, `d̄ = −M̄[V:,:V]`.
pub struct PiezoPolicy<E>(PhantomData<E>);

impl<E: ReferenceElement> PhysicsPolicy<E> for PiezoPolicy<E> {
    type Dofs = PiezoDofs;
    type Material = PiezoelectricMaterial;

    const INDEFINITE: bool = true;

    fn num_macro_fields(dim: usize) -> usize {
        voigt_size(dim) + dim
    }

    fn element_kernel(
        nodes: &DMatrix<f64>,
        material: &Self::Material,
    ) -> CellResult<(DMatrix<f64>, DMatrix<f64>)> {
        piezo_kernel::<E>(nodes, material)
    }

    fn macro_field(dim: usize, node_coords: &[Vec<f64>]) -> DMatrix<f64> {
        const ELECTRIC_SIGN: f64 = -1.0;
        let num_nodes = node_coords.len();
        let voigt = voigt_size(dim);
        let u_rows = num_nodes * dim;
        let mut x = DMatrix::zeros(u_rows + num_nodes, voigt + dim);

        let elastic_block = fill_elastic_macro_field(dim, node_coords);
        x.view_mut((0, 0), (u_rows, voigt)).copy_from(&elastic_block);

        let transport_block = fill_transport_macro_field(dim, node_coords, ELECTRIC_SIGN);
        x.view_mut((u_rows, voigt), (num_nodes, dim))
            .copy_from(&transport_block);
        x
    }

    fn split_tensor(m_bar: DMatrix<f64>, dim: usize) -> Tensors {
        let v = voigt_size(dim);
        let c_bar = m_bar.view((0, 0), (v, v)).into_owned();
        let eps_bar = -m_bar.view((v, v), (dim, dim)).into_owned();
        let d_bar = -m_bar.view((v, 0), (dim, v)).into_owned();
        Tensors::Piezo {
            c_bar,
            eps_bar,
            d_bar,
        }
    }
}
