use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of `f32` lanes in one host accumulation batch (one AVX2 register).
pub const FLOATS_PER_BATCH: usize = 8;

/// Smallest vector the lane reduction accepts: two full batches.
pub const MIN_LANE_VECTOR_LEN: usize = 2 * FLOATS_PER_BATCH;

/// Encoded operand meaning "substitute the running signal value here".
pub const VARIABLE_SENTINEL: f32 = 11.0;

/// Values per expression node: operator, left operand, right operand.
pub const TREE_NODE_SIZE: usize = 3;

/// Correlation value used before any candidate has been accepted.
/// It lies outside `[-1, 1]`, so any finite correlation is closer to the baseline.
pub const CORRELATION_NOT_FOUND: f32 = 2.0;

pub const ACC_SAMPLE_FREQ: usize = 32;
pub const HR_SAMPLE_FREQ: usize = 1;
pub const ACC_MAX_VALUE: f32 = 127.0;
pub const HR_MAX_VALUE: f32 = 255.0;

/// Accelerometer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        f.write_str(name)
    }
}

/// Preprocessed signals of one subject, aligned and padded to a power of two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSignals {
    pub subject_id: usize,
    pub acc: [Vec<f32>; 3],
    pub hr: Vec<f32>,
}

impl SubjectSignals {
    pub fn axis(&self, axis: Axis) -> &[f32] {
        &self.acc[axis.index()]
    }
}

/// Result of one search for the log/report collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisResult {
    pub subject_id: usize,
    pub axis: Axis,
    pub device: String,
    pub initial_correlation: f32,
    pub best_correlation: Option<f32>,
    pub formula: Option<String>,
    pub tree: Vec<f32>,
    pub plot_path: Option<String>,
}
