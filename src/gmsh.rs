//! Gmsh 2.2 ASCII mesh/result writer (spec §6 "Mesh-format output").
//!
//! Peripheral to the core homogenization engine — used only by downstream
//! visualization, never by [`crate::solver`] or [`crate::operator`]. Writes
//! node blocks (1-based tags, 3D coordinates with `z=0` for 2D grids),
//! element blocks (the element-type integers from spec §6: `Quad4=3`,
//! `Quad8=16`, `Hex8=5`, `Hex20=17`), an optional per-element `$ElementData`
//! density block, and optional per-node `$NodeData` scalar/vector field
//! blocks (2-vectors are padded with a trailing zero, since Gmsh node data
//! is always written as 3-component vectors).
//!
//! Grounded on the element-type-identifier table and node-ordering
//! conventions in `other_examples/602ed25d_w1th0utnam3-mshio__src-mshfile.rs.rs`
//! (the only pack evidence of MSH field layout); written directly against
//! `std::io::Write` since `fea-solver` itself has no dedicated mesh-writer
//! crate and hand-rolls its own output format in its demo/server binaries.

use std::io::{self, Write};

use nalgebra::DMatrix;

use crate::elements::ReferenceElement;
use crate::error::CellResult;
use crate::grid::PeriodicGrid;

/// Writes the `$MeshFormat`/`$Nodes`/`$Elements` blocks for `grid` (standard
/// node view) to `w`.
pub fn write_mesh<E: ReferenceElement>(w: &mut impl Write, grid: &dyn PeriodicGrid) -> CellResult<()> {
    writeln!(w, "$MeshFormat")?;
    writeln!(w, "2.2 0 8")?;
    writeln!(w, "$EndMeshFormat")?;

    let num_nodes = grid.num_nodes();
    writeln!(w, "$Nodes")?;
    writeln!(w, "{num_nodes}")?;
    for i in 0..num_nodes {
        let coord = grid.node(i)?;
        let (x, y, z) = (
            coord[0],
            coord.get(1).copied().unwrap_or(0.0),
            coord.get(2).copied().unwrap_or(0.0),
        );
        writeln!(w, "{} {x} {y} {z}", i + 1)?;
    }
    writeln!(w, "$EndNodes")?;

    let num_elements = grid.num_elements();
    let gmsh_type = E::KIND.gmsh_type();
    writeln!(w, "$Elements")?;
    writeln!(w, "{num_elements}")?;
    for i in 0..num_elements {
        let nodes = grid.element(i)?;
        write!(w, "{} {gmsh_type} 0", i + 1)?;
        for n in nodes {
            write!(w, " {}", n + 1)?;
        }
        writeln!(w)?;
    }
    writeln!(w, "$EndElements")?;
    Ok(())
}

/// Writes a per-element `$ElementData` block (e.g. the grid's densities).
pub fn write_element_data(
    w: &mut impl Write,
    name: &str,
    values: &[f64],
    time: f64,
    time_step: usize,
) -> io::Result<()> {
    writeln!(w, "$ElementData")?;
    writeln!(w, "1")?;
    writeln!(w, "\"{name}\"")?;
    writeln!(w, "1")?;
    writeln!(w, "{time}")?;
    writeln!(w, "3")?;
    writeln!(w, "{time_step}")?;
    writeln!(w, "1")?;
    writeln!(w, "{}", values.len())?;
    for (i, v) in values.iter().enumerate() {
        writeln!(w, "{} {v}", i + 1)?;
    }
    writeln!(w, "$EndElementData")?;
    Ok(())
}

/// Writes a per-node `$NodeData` block for a scalar field (`field` is
/// `num_nodes x 1`) or a 2/3-vector field (`field` is `num_nodes x 2` or
/// `num_nodes x 3`); 2-vectors are padded with a trailing zero since Gmsh
/// node data is always written as 3-component vectors.
pub fn write_node_data(
    w: &mut impl Write,
    name: &str,
    field: &DMatrix<f64>,
    time: f64,
    time_step: usize,
) -> io::Result<()> {
    let components = field.ncols();
    if !(1..=3).contains(&components) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("node data field must have 1-3 components, got {components}"),
        ));
    }
    writeln!(w, "$NodeData")?;
    writeln!(w, "1")?;
    writeln!(w, "\"{name}\"")?;
    writeln!(w, "1")?;
    writeln!(w, "{time}")?;
    writeln!(w, "3")?;
    writeln!(w, "{time_step}")?;
    writeln!(w, "{}", if components == 1 { 1 } else { 3 })?;
    writeln!(w, "{}", field.nrows())?;
    for i in 0..field.nrows() {
        write!(w, "{}", i + 1)?;
        if components == 1 {
            write!(w, " {}", field[(i, 0)])?;
        } else {
            for c in 0..3 {
                let v = if c < components { field[(i, c)] } else { 0.0 };
                write!(w, " {v}")?;
            }
        }
        writeln!(w)?;
    }
    writeln!(w, "$EndNodeData")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Quad4;
    use crate::grid::{Grid, PeriodicGrid};

    #[test]
    fn writes_expected_element_type_and_node_count() {
        let grid = Grid::<Quad4>::new(vec![1, 1], vec![1.0, 1.0]).unwrap();
        let mut buf = Vec::new();
        write_mesh::<Quad4>(&mut buf, &grid).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("$Nodes"));
        assert!(text.contains("4\n1 0 0 0"));
        assert!(text.contains("1 3 0 1 2 4 3"));
    }

    #[test]
    fn element_data_round_trips_density_count() {
        let grid = Grid::<Quad4>::new(vec![2, 2], vec![1.0, 1.0]).unwrap();
        let densities: Vec<f64> = (0..grid.num_elements()).map(|i| 0.5 + i as f64 * 0.1).collect();
        let mut buf = Vec::new();
        write_element_data(&mut buf, "density", &densities, 0.0, 0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"density\""));
        assert!(text.contains(&densities.len().to_string()));
    }

    #[test]
    fn node_data_pads_2vectors_with_trailing_zero() {
        let field = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let mut buf = Vec::new();
        write_node_data(&mut buf, "displacement", &field, 0.0, 0).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("1 1 2 0"));
        assert!(text.contains("2 3 4 0"));
    }
}
