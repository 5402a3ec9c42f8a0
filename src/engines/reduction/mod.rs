pub mod host;

pub use host::{lane_sum, sequential_sum, HostReduction};

use crate::error::Result;

/// Sums a numeric vector on whichever compute resource the implementor owns.
///
/// Implementations validate their own length preconditions and report
/// `EmptyInput` / `InvalidSize` instead of returning a partial sum.
pub trait VectorReducer {
    fn reduce(&self, values: &[f32]) -> Result<f32>;

    /// Arithmetic mean computed through `reduce`.
    fn mean(&self, values: &[f32]) -> Result<f32> {
        let sum = self.reduce(values)?;
        Ok(sum / values.len() as f32)
    }
}

impl<R: VectorReducer + ?Sized> VectorReducer for &R {
    fn reduce(&self, values: &[f32]) -> Result<f32> {
        (**self).reduce(values)
    }
}
