//! Constitutive material models: linear elastic, linear scalar transport,
//! and linear piezoelectric coupling.
//!
//! Mirrors `fea-solver`'s `Material` (constructor + `Default` idiom) but
//! generalizes from a single isotropic `(E, nu, rho)` triple to full Voigt
//! and transport tensors, since homogenization needs the general PD
//! constitutive tensor, not just isotropic convenience constructors.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{CellError, CellResult};

/// `VoigtSize` for a given spatial dimension (`spec.md` §3).
pub fn voigt_size(dim: usize) -> usize {
    match dim {
        2 => 3,
        3 => 6,
        _ => unreachable!("dim must be 2 or 3"),
    }
}

fn check_symmetric_pd(name: &str, m: &DMatrix<f64>) -> CellResult<()> {
    if !m.is_square() {
        return Err(CellError::InvalidArgument(format!(
            "{name} must be square, got {}x{}",
            m.nrows(),
            m.ncols()
        )));
    }
    let n = m.nrows();
    for i in 0..n {
        for j in 0..n {
            if (m[(i, j)] - m[(j, i)]).abs() > 1e-8 * (1.0 + m[(i, j)].abs()) {
                return Err(CellError::InvalidArgument(format!(
                    "{name} must be symmetric, found {name}[{i},{j}]={} != {name}[{j},{i}]={}",
                    m[(i, j)],
                    m[(j, i)]
                )));
            }
        }
    }
    if m.clone().cholesky().is_none() {
        return Err(CellError::InvalidArgument(format!(
            "{name} must be positive definite"
        )));
    }
    Ok(())
}

/// Linear elastic constitutive data: a `VoigtSize x VoigtSize` symmetric
/// positive-definite stiffness matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticMaterial {
    pub dim: usize,
    #[serde(with = "matrix_serde")]
    pub c: DMatrix<f64>,
}

impl ElasticMaterial {
    pub fn new(dim: usize, c: DMatrix<f64>) -> CellResult<Self> {
        if dim != 2 && dim != 3 {
            return Err(CellError::InvalidArgument(format!(
                "spatial dimension must be 2 or 3, got {dim}"
            )));
        }
        let expected = voigt_size(dim);
        if c.nrows() != expected || c.ncols() != expected {
            return Err(CellError::InvalidArgument(format!(
                "elastic stiffness must be {expected}x{expected} for dim={dim}, got {}x{}",
                c.nrows(),
                c.ncols()
            )));
        }
        check_symmetric_pd("elastic stiffness C", &c)?;
        Ok(Self { dim, c })
    }

    /// Isotropic elastic material from Young's modulus and Poisson ratio.
    /// 2D uses the plane-stress reduction; 3D uses the full isotropic tensor.
    pub fn isotropic(dim: usize, young: f64, poisson: f64) -> CellResult<Self> {
        if young <= 0.0 {
            return Err(CellError::InvalidArgument(format!(
                "Young's modulus must be positive, got {young}"
            )));
        }
        if !(-1.0..0.5).contains(&poisson) {
            return Err(CellError::InvalidArgument(format!(
                "Poisson ratio must be in (-1, 0.5), got {poisson}"
            )));
        }
        let c = match dim {
            2 => {
                let factor = young / (1.0 - poisson * poisson);
                DMatrix::from_row_slice(
                    3,
                    3,
                    &[
                        factor,
                        factor * poisson,
                        0.0,
                        factor * poisson,
                        factor,
                        0.0,
                        0.0,
                        0.0,
                        factor * (1.0 - poisson) / 2.0,
                    ],
                )
            }
            3 => {
                let lambda = young * poisson / ((1.0 + poisson) * (1.0 - 2.0 * poisson));
                let mu = young / (2.0 * (1.0 + poisson));
                let mut c = DMatrix::zeros(6, 6);
                for i in 0..3 {
                    for j in 0..3 {
                        c[(i, j)] = lambda;
                    }
                    c[(i, i)] += 2.0 * mu;
                }
                for i in 3..6 {
                    c[(i, i)] = mu;
                }
                c
            }
            _ => {
                return Err(CellError::InvalidArgument(format!(
                    "spatial dimension must be 2 or 3, got {dim}"
                )))
            }
        };
        Self::new(dim, c)
    }
}

/// Linear scalar transport constitutive data: a `D x D` symmetric
/// positive-definite conductivity/permittivity/diffusivity tensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportMaterial {
    pub dim: usize,
    #[serde(with = "matrix_serde")]
    pub k: DMatrix<f64>,
}

impl TransportMaterial {
    pub fn new(dim: usize, k: DMatrix<f64>) -> CellResult<Self> {
        if k.nrows() != dim || k.ncols() != dim {
            return Err(CellError::InvalidArgument(format!(
                "transport tensor must be {dim}x{dim}, got {}x{}",
                k.nrows(),
                k.ncols()
            )));
        }
        check_symmetric_pd("transport tensor K", &k)?;
        Ok(Self { dim, k })
    }

    /// Isotropic transport material: `K = k * I`.
    pub fn isotropic(dim: usize, k: f64) -> CellResult<Self> {
        if k <= 0.0 {
            return Err(CellError::InvalidArgument(format!(
                "transport constant must be positive, got {k}"
            )));
        }
        Self::new(dim, DMatrix::identity(dim, dim) * k)
    }
}

/// Linear piezoelectric coupling of an elastic and a transport
/// (permittivity) material through a `D x VoigtSize` coupling tensor `d`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiezoelectricMaterial {
    pub elastic: ElasticMaterial,
    pub permittivity: TransportMaterial,
    #[serde(with = "matrix_serde")]
    pub d: DMatrix<f64>,
}

impl PiezoelectricMaterial {
    pub fn new(
        elastic: ElasticMaterial,
        permittivity: TransportMaterial,
        d: DMatrix<f64>,
    ) -> CellResult<Self> {
        let dim = elastic.dim;
        if permittivity.dim != dim {
            return Err(CellError::InvalidArgument(format!(
                "elastic dim {dim} does not match permittivity dim {}",
                permittivity.dim
            )));
        }
        let voigt = voigt_size(dim);
        if d.nrows() != dim || d.ncols() != voigt {
            return Err(CellError::InvalidArgument(format!(
                "coupling tensor d must be {dim}x{voigt}, got {}x{}",
                d.nrows(),
                d.ncols()
            )));
        }

        // Thermodynamic stability: C - d^T K^-1 d must be positive definite.
        let k_inv = permittivity
            .k
            .clone()
            .try_inverse()
            .ok_or_else(|| CellError::InvalidArgument("permittivity tensor is singular".into()))?;
        let schur = &elastic.c - d.transpose() * &k_inv * &d;
        check_symmetric_pd("Schur complement C - d^T K^-1 d", &schur).map_err(|_| {
            CellError::InvalidArgument(
                "piezoelectric material fails thermodynamic stability: C - d^T K^-1 d is not positive definite"
                    .into(),
            )
        })?;

        Ok(Self {
            elastic,
            permittivity,
            d,
        })
    }
}

/// Constitutive model selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Material {
    LinearElastic(ElasticMaterial),
    LinearTransport(TransportMaterial),
    LinearPiezoelectric(PiezoelectricMaterial),
}

impl Material {
    pub fn dim(&self) -> usize {
        match self {
            Material::LinearElastic(m) => m.dim,
            Material::LinearTransport(m) => m.dim,
            Material::LinearPiezoelectric(m) => m.elastic.dim,
        }
    }
}

mod matrix_serde {
    use nalgebra::DMatrix;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Shape {
        nrows: usize,
        ncols: usize,
        data: Vec<f64>,
    }

    pub fn serialize<S: Serializer>(m: &DMatrix<f64>, s: S) -> Result<S::Ok, S::Error> {
        let shape = Shape {
            nrows: m.nrows(),
            ncols: m.ncols(),
            data: m.iter().copied().collect(),
        };
        shape.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DMatrix<f64>, D::Error> {
        let shape = Shape::deserialize(d)?;
        Ok(DMatrix::from_vec(shape.nrows, shape.ncols, shape.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isotropic_elastic_2d_is_symmetric_pd() {
        let m = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
        assert_eq!(m.c.nrows(), 3);
    }

    #[test]
    fn isotropic_elastic_3d_is_symmetric_pd() {
        let m = ElasticMaterial::isotropic(3, 1.0, 0.3).unwrap();
        assert_eq!(m.c.nrows(), 6);
    }

    #[test]
    fn negative_young_modulus_rejected() {
        assert!(ElasticMaterial::isotropic(2, -1.0, 0.3).is_err());
    }

    #[test]
    fn non_pd_elastic_matrix_rejected() {
        let c = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 0.0, 2.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(ElasticMaterial::new(2, c).is_err());
    }

    #[test]
    fn isotropic_transport_constant_must_be_positive() {
        assert!(TransportMaterial::isotropic(2, 0.0).is_err());
        assert!(TransportMaterial::isotropic(2, 2.1).is_ok());
    }

    #[test]
    fn piezoelectric_schur_complement_validated() {
        let elastic = ElasticMaterial::isotropic(2, 1.0, 0.3).unwrap();
        let transport = TransportMaterial::isotropic(2, 2.1).unwrap();
        let d = DMatrix::zeros(2, 3);
        // Zero coupling always satisfies the Schur complement check.
        assert!(PiezoelectricMaterial::new(elastic, transport, d).is_ok());
    }
}
