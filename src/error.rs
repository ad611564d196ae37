//! Error types for the periodic-cell homogenization core

use thiserror::Error;

/// Main error type for homogenization operations
#[derive(Error, Debug)]
pub enum CellError {
    /// Constructor-time violations: bad resolution/size, invalid material
    /// parameters, density out of range, unrecognized file extension, etc.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Indexing a node or element beyond the grid.
    #[error("index {index} out of range (valid range is 0..{bound})")]
    OutOfRange { index: usize, bound: usize },

    /// A density/mesh file could not be opened or read.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV (or other) file content was non-numeric or malformed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// det(J) == 0 in a kernel quadrature loop.
    #[error("degenerate element: determinant of Jacobian is {0} (expected nonzero)")]
    DegenerateElement(f64),

    /// det(J) < 0 in a kernel quadrature loop.
    #[error("inverted element: determinant of Jacobian is {0} (expected positive)")]
    InvertedElement(f64),

    /// CG/PCG reached `max_iterations` without satisfying `tolerance`.
    #[error(
        "solver did not converge after {iterations} iterations (relative residual {residual:e}, tolerance {tolerance:e})"
    )]
    SolverFailure {
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },

    /// CG/PCG reported an internal numerical breakdown (e.g. p^T A p <= 0).
    #[error("numerical issue in iterative solver: {0}")]
    NumericalIssue(String),
}

/// Result type for homogenization operations
pub type CellResult<T> = Result<T, CellError>;
