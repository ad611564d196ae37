//! The regular structured grid: per-element densities, node coordinates,
//! and standard/periodic connectivity (§3, §4.2).
//!
//! Mirrors `fea-solver`'s `model.rs` container idiom (validated constructor,
//! `HashMap`-free dense storage since the grid is fully regular, accessors
//! returning `CellResult` on out-of-range indices) generalized from a named
//! node/member graph to an implicit structured tiling.

mod connectivity;

use std::path::Path;

use nalgebra::DMatrix;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::elements::ReferenceElement;
use crate::error::{CellError, CellResult};
use crate::NUMERICAL_ZERO;

/// A regular tiling of `NUM_NODES`-node elements of kind `E` over a
/// rectangular 2D or 3D domain, carrying one density value per element.
#[derive(Debug, Clone)]
pub struct Grid<E: ReferenceElement> {
    resolution: Vec<usize>,
    size: Vec<f64>,
    density: Vec<f64>,
    node_coords: Vec<Vec<f64>>,
    _marker: std::marker::PhantomData<E>,
}

/// Grid operations that do not depend on the concrete element type
/// parameter, so that [`crate::operator`], [`crate::policy`] and
/// [`crate::solver`] can be written against grid topology alone.
pub trait PeriodicGrid {
    fn dim(&self) -> usize;
    fn resolution(&self) -> &[usize];
    fn size(&self) -> &[f64];
    fn num_elements(&self) -> usize;
    fn num_nodes(&self) -> usize;
    fn num_periodic_nodes(&self) -> usize;
    fn density(&self, elem_idx: usize) -> CellResult<f64>;
    fn element(&self, elem_idx: usize) -> CellResult<Vec<usize>>;
    fn periodic_element(&self, elem_idx: usize) -> CellResult<Vec<usize>>;
    fn node(&self, node_idx: usize) -> CellResult<Vec<f64>>;
    fn element_nodes(&self, elem_idx: usize) -> CellResult<DMatrix<f64>>;
    fn measure(&self) -> CellResult<f64>;
}

impl<E: ReferenceElement> Grid<E> {
    /// Builds a grid of the given `resolution` and physical `size`, with all
    /// densities initialized to 1.0 (fully solid).
    pub fn new(resolution: Vec<usize>, size: Vec<f64>) -> CellResult<Self> {
        let dim = E::DIM;
        if resolution.len() != dim || size.len() != dim {
            return Err(CellError::InvalidArgument(format!(
                "resolution/size must have length {dim} for this element kind, got {}/{}",
                resolution.len(),
                size.len()
            )));
        }
        if resolution.iter().any(|&n| n == 0) {
            return Err(CellError::InvalidArgument(
                "resolution entries must be positive".into(),
            ));
        }
        if size.iter().any(|&s| !(s > 0.0)) {
            return Err(CellError::InvalidArgument(
                "size entries must be positive".into(),
            ));
        }

        let num_elements = connectivity::num_elements(&resolution);
        let num_nodes = connectivity::num_standard_nodes(E::KIND, &resolution);
        let node_coords = connectivity::standard_node_coords(E::KIND, &resolution, &size);
        debug_assert_eq!(node_coords.len(), num_nodes);

        log::debug!(
            "grid constructed: kind={:?} resolution={:?} size={:?} num_elements={num_elements}",
            E::KIND,
            resolution,
            size,
        );

        Ok(Self {
            resolution,
            size,
            density: vec![1.0; num_elements],
            node_coords,
            _marker: std::marker::PhantomData,
        })
    }

    fn check_elem_idx(&self, i: usize) -> CellResult<()> {
        let bound = self.density.len();
        if i >= bound {
            return Err(CellError::OutOfRange { index: i, bound });
        }
        Ok(())
    }

    fn check_node_idx(&self, i: usize) -> CellResult<()> {
        let bound = self.node_coords.len();
        if i >= bound {
            return Err(CellError::OutOfRange { index: i, bound });
        }
        Ok(())
    }

    /// Clamps into `[NUMERICAL_ZERO, 1.0]`, rejecting values outside `[0, 1]`.
    fn validate_density(rho: f64) -> CellResult<f64> {
        if !(0.0..=1.0).contains(&rho) {
            return Err(CellError::InvalidArgument(format!(
                "density must be in [0, 1], got {rho}"
            )));
        }
        Ok(rho.max(NUMERICAL_ZERO))
    }

    pub fn set_density(&mut self, i: usize, rho: f64) -> CellResult<()> {
        self.check_elem_idx(i)?;
        self.density[i] = Self::validate_density(rho)?;
        log::debug!("set_density: element {i} -> {}", self.density[i]);
        Ok(())
    }

    pub fn set_densities_from_sequence(&mut self, values: &[f64]) -> CellResult<()> {
        if values.len() != self.density.len() {
            return Err(CellError::InvalidArgument(format!(
                "expected {} densities, got {}",
                self.density.len(),
                values.len()
            )));
        }
        let clamped: Vec<f64> = values
            .iter()
            .map(|&v| Self::validate_density(v))
            .collect::<CellResult<_>>()?;
        self.density = clamped;
        log::debug!("set_densities_from_sequence: {} elements", self.density.len());
        Ok(())
    }

    pub fn set_densities_from_constant(&mut self, rho: f64) -> CellResult<()> {
        let clamped = Self::validate_density(rho)?;
        self.density.iter_mut().for_each(|d| *d = clamped);
        log::debug!("set_densities_from_constant: rho={clamped}");
        Ok(())
    }

    pub fn set_densities_from_zeros(&mut self) {
        self.density.iter_mut().for_each(|d| *d = NUMERICAL_ZERO);
        log::debug!("set_densities_from_zeros: {} elements", self.density.len());
    }

    pub fn set_densities_from_ones(&mut self) {
        self.density.iter_mut().for_each(|d| *d = 1.0);
        log::debug!("set_densities_from_ones: {} elements", self.density.len());
    }

    /// Seeded uniform-random densities in `(0, 1)`, via `StdRng` so the
    /// resulting sequence is reproducible across platforms.
    pub fn set_densities_from_rng(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Uniform::new(NUMERICAL_ZERO, 1.0);
        for d in self.density.iter_mut() {
            *d = dist.sample(&mut rng);
        }
        log::debug!("set_densities_from_rng: seed={seed} {} elements", self.density.len());
    }

    /// Sets element densities to `integral(f over the element) / measure(element)`,
    /// computed by quadrature on the reference element through each element's
    /// own nodes. Fails if any sampled value of `f` falls outside `[0, 1]`.
    pub fn set_densities_from_function(
        &mut self,
        mut f: impl FnMut(&[f64]) -> f64,
    ) -> CellResult<()> {
        let mut out = Vec::with_capacity(self.density.len());
        for i in 0..self.density.len() {
            let nodes = self.element_nodes_raw(i)?;
            let rule = E::quadrature_rule();
            let mut integral = 0.0;
            let mut elem_measure = 0.0;
            for (xi, w) in rule.points.iter().zip(&rule.weights) {
                let n = E::shape_functions(xi);
                let grad_n = E::grad_shape_functions(xi);
                let j = crate::elements::jacobian(&grad_n, &nodes);
                let det = j.determinant();
                crate::elements::check_jacobian(det)?;
                let x: Vec<f64> = (0..E::DIM)
                    .map(|d| (0..E::NUM_NODES).map(|k| n[k] * nodes[(k, d)]).sum())
                    .collect();
                let value = f(&x);
                if !(0.0..=1.0).contains(&value) {
                    return Err(CellError::InvalidArgument(format!(
                        "density function sampled {value} outside [0, 1] at element {i}"
                    )));
                }
                integral += value * det.abs() * w;
                elem_measure += det.abs() * w;
            }
            out.push(integral / elem_measure);
        }
        self.set_densities_from_sequence(&out)
    }

    /// Reads a rectangular numeric grid (row count `ny`, column count `nx`,
    /// origin at the bottom-left) from a CSV file (2D grids only; see the
    /// Open Question resolution in `SPEC_FULL.md` §Open Question 1).
    pub fn set_densities_from_csv(&mut self, path: impl AsRef<Path>) -> CellResult<()> {
        if E::DIM != 2 {
            return Err(CellError::InvalidArgument(
                "CSV density loading is only defined for 2D grids".into(),
            ));
        }
        let path = path.as_ref();
        log::debug!("set_densities_from_csv: path={}", path.display());
        let (nx, ny) = (self.resolution[0], self.resolution[1]);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| match e.into_kind() {
                csv::ErrorKind::Io(io_err) => CellError::IoError(io_err),
                other => CellError::ParseError(other.to_string()),
            })?;

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(ny);
        for record in reader.records() {
            let record = record.map_err(|e| CellError::ParseError(e.to_string()))?;
            let row: Vec<f64> = record
                .iter()
                .map(|cell| {
                    cell.trim()
                        .parse::<f64>()
                        .map_err(|_| CellError::ParseError(format!("non-numeric cell '{cell}'")))
                })
                .collect::<CellResult<_>>()?;
            rows.push(row);
        }

        if rows.len() != ny {
            return Err(CellError::InvalidArgument(format!(
                "CSV has {} rows, expected ny={ny}",
                rows.len()
            )));
        }
        for (r, row) in rows.iter().enumerate() {
            if row.len() != nx {
                return Err(CellError::InvalidArgument(format!(
                    "CSV row {r} has {} columns, expected nx={nx}",
                    row.len()
                )));
            }
        }

        // CSV row 0 is the top row visually but the origin is bottom-left,
        // so file row `r` corresponds to grid row `ny - 1 - r`.
        let mut values = vec![0.0; nx * ny];
        for (r, row) in rows.iter().enumerate() {
            let ey = ny - 1 - r;
            for (ex, &v) in row.iter().enumerate() {
                values[ey * nx + ex] = v;
            }
        }
        self.set_densities_from_sequence(&values)
    }

    /// Circularly shifts the density array by `shift` elements along each
    /// axis, equivalent to relabeling the lattice origin.
    pub fn translate(&mut self, shift: &[i64]) -> CellResult<()> {
        if shift.len() != self.resolution.len() {
            return Err(CellError::InvalidArgument(format!(
                "shift must have length {}, got {}",
                self.resolution.len(),
                shift.len()
            )));
        }
        let res = self.resolution.clone();
        let mut shifted = vec![0.0; self.density.len()];
        for (old_idx, &rho) in self.density.iter().enumerate() {
            let coords = connectivity::element_coords(&res, old_idx);
            let mut new_coords = Vec::with_capacity(coords.len());
            for (axis, &c) in coords.iter().enumerate() {
                let n = res[axis] as i64;
                let shifted_c = (c as i64 + shift[axis]).rem_euclid(n);
                new_coords.push(shifted_c as usize);
            }
            let new_idx = match new_coords.len() {
                2 => new_coords[1] * res[0] + new_coords[0],
                3 => new_coords[2] * res[0] * res[1] + new_coords[1] * res[0] + new_coords[0],
                _ => unreachable!(),
            };
            shifted[new_idx] = rho;
        }
        self.density = shifted;
        log::debug!("translate: shift={shift:?}");
        Ok(())
    }

    fn element_nodes_raw(&self, i: usize) -> CellResult<DMatrix<f64>> {
        self.check_elem_idx(i)?;
        let local = connectivity::element_standard_nodes(E::KIND, &self.resolution, i);
        let dim = E::DIM;
        Ok(DMatrix::from_fn(local.len(), dim, |r, c| {
            self.node_coords[local[r]][c]
        }))
    }
}

impl<E: ReferenceElement> PeriodicGrid for Grid<E> {
    fn dim(&self) -> usize {
        E::DIM
    }

    fn resolution(&self) -> &[usize] {
        &self.resolution
    }

    fn size(&self) -> &[f64] {
        &self.size
    }

    fn num_elements(&self) -> usize {
        self.density.len()
    }

    fn num_nodes(&self) -> usize {
        self.node_coords.len()
    }

    fn num_periodic_nodes(&self) -> usize {
        connectivity::num_periodic_nodes(E::KIND, &self.resolution)
    }

    fn density(&self, elem_idx: usize) -> CellResult<f64> {
        self.check_elem_idx(elem_idx)?;
        Ok(self.density[elem_idx])
    }

    fn element(&self, elem_idx: usize) -> CellResult<Vec<usize>> {
        self.check_elem_idx(elem_idx)?;
        Ok(connectivity::element_standard_nodes(
            E::KIND,
            &self.resolution,
            elem_idx,
        ))
    }

    fn periodic_element(&self, elem_idx: usize) -> CellResult<Vec<usize>> {
        self.check_elem_idx(elem_idx)?;
        Ok(connectivity::element_periodic_nodes(
            E::KIND,
            &self.resolution,
            elem_idx,
        ))
    }

    fn node(&self, node_idx: usize) -> CellResult<Vec<f64>> {
        self.check_node_idx(node_idx)?;
        Ok(self.node_coords[node_idx].clone())
    }

    fn element_nodes(&self, elem_idx: usize) -> CellResult<DMatrix<f64>> {
        self.element_nodes_raw(elem_idx)
    }

    fn measure(&self) -> CellResult<f64> {
        let nodes = self.element_nodes_raw(0)?;
        let elem_measure = crate::elements::measure::<E>(&nodes)?;
        Ok(elem_measure * self.num_elements() as f64)
    }
}
