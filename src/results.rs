//! Solver configuration and homogenization result types (§3 "SolverOptions",
//! §6 "Config to the core", §8 "Policy-specific result extraction").

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Bitmask over which nodal field snapshots a solve retains.
///
/// The source this spec was distilled from overloads `operator&` to compute
/// bitwise OR (only `wants` testing inequality to `None` hid the bug); this
/// implementation uses true bitwise AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSave(u8);

impl FieldSave {
    pub const NONE: FieldSave = FieldSave(0);
    pub const TOTAL: FieldSave = FieldSave(1 << 0);
    pub const MACRO: FieldSave = FieldSave(1 << 1);
    pub const MICRO: FieldSave = FieldSave(1 << 2);
    pub const ALL: FieldSave = FieldSave(Self::TOTAL.0 | Self::MACRO.0 | Self::MICRO.0);

    /// Whether `bit` is set.
    pub fn wants(self, bit: FieldSave) -> bool {
        (self & bit) != FieldSave::NONE
    }
}

impl Default for FieldSave {
    fn default() -> Self {
        FieldSave::NONE
    }
}

impl std::ops::BitOr for FieldSave {
    type Output = FieldSave;
    fn bitor(self, rhs: Self) -> Self::Output {
        FieldSave(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for FieldSave {
    type Output = FieldSave;
    fn bitand(self, rhs: Self) -> Self::Output {
        FieldSave(self.0 & rhs.0)
    }
}

/// Solver configuration: CG iteration cap, convergence tolerance, and which
/// nodal field snapshots to retain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub fields: FieldSave,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            fields: FieldSave::NONE,
        }
    }
}

impl SolverOptions {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_fields(mut self, fields: FieldSave) -> Self {
        self.fields = fields;
        self
    }
}

/// Per-loading-column nodal field snapshots, retained according to
/// `SolverOptions::fields`. Each matrix is `num_nodes x NUM_NODE_DOFS`,
/// standard-node indexed; one entry per macroscopic loading direction.
#[derive(Debug, Clone, Default)]
pub struct NodalFields {
    pub total: Option<Vec<DMatrix<f64>>>,
    pub macro_field: Option<Vec<DMatrix<f64>>>,
    pub micro_field: Option<Vec<DMatrix<f64>>>,
}

/// Homogenization result: the physics-specific tensor(s) plus whichever
/// nodal field snapshots `SolverOptions::fields` asked for.
#[derive(Debug, Clone)]
pub struct HomogenizationResult {
    pub tensors: crate::policy::Tensors,
    pub fields: NodalFields,
}

impl HomogenizationResult {
    /// `C̄` for an elastic result. Panics if this result is not elastic —
    /// callers match the solver's own physics, so the variant is never in
    /// doubt.
    pub fn c_bar(&self) -> &DMatrix<f64> {
        match &self.tensors {
            crate::policy::Tensors::Elastic(c) => c,
            crate::policy::Tensors::Piezo { c_bar, .. } => c_bar,
            crate::policy::Tensors::Transport(_) => {
                panic!("c_bar() called on a transport homogenization result")
            }
        }
    }

    /// `K̄` for a transport result.
    pub fn k_bar(&self) -> &DMatrix<f64> {
        match &self.tensors {
            crate::policy::Tensors::Transport(k) => k,
            other => panic!("k_bar() called on a {other:?} homogenization result"),
        }
    }

    /// `(ε̄, d̄)` for a piezoelectric result.
    pub fn piezo_tensors(&self) -> (&DMatrix<f64>, &DMatrix<f64>) {
        match &self.tensors {
            crate::policy::Tensors::Piezo { eps_bar, d_bar, .. } => (eps_bar, d_bar),
            other => panic!("piezo_tensors() called on a {other:?} homogenization result"),
        }
    }
}
