use super::VectorReducer;
use crate::error::{CorrelationError, Result};
use crate::types::{FLOATS_PER_BATCH, MIN_LANE_VECTOR_LEN};
use serde::{Deserialize, Serialize};

/// Host-side reduction strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostReduction {
    /// Eight interleaved accumulators, one per vector lane.
    #[default]
    Lanes,
    /// Plain left fold without padding requirements.
    Sequential,
}

impl VectorReducer for HostReduction {
    fn reduce(&self, values: &[f32]) -> Result<f32> {
        match self {
            HostReduction::Lanes => lane_sum(values),
            HostReduction::Sequential => sequential_sum(values),
        }
    }
}

/// Sum `values` with `FLOATS_PER_BATCH` independent accumulators.
///
/// Element `i` lands in accumulator `i % 8`; the partial sums are added once at
/// the end. The vector must be padded to a multiple of the batch width and hold
/// at least two batches.
pub fn lane_sum(values: &[f32]) -> Result<f32> {
    if values.is_empty() {
        return Err(CorrelationError::EmptyInput);
    }

    if values.len() < MIN_LANE_VECTOR_LEN {
        return Err(CorrelationError::invalid_size(
            values.len(),
            format!("lane reduction needs at least {} values", MIN_LANE_VECTOR_LEN),
        ));
    }

    let padding = values.len() % FLOATS_PER_BATCH;
    if padding > 0 {
        return Err(CorrelationError::invalid_size(
            values.len(),
            format!("not padded to the batch width (remainder {})", padding),
        ));
    }

    let mut lanes = [0.0f32; FLOATS_PER_BATCH];
    for batch in values.chunks_exact(FLOATS_PER_BATCH) {
        for (lane, value) in lanes.iter_mut().zip(batch) {
            *lane += *value;
        }
    }

    Ok(lanes.iter().sum())
}

pub fn sequential_sum(values: &[f32]) -> Result<f32> {
    if values.is_empty() {
        return Err(CorrelationError::EmptyInput);
    }
    Ok(values.iter().fold(0.0f32, |acc, v| acc + v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_sum_matches_fold() {
        let values: Vec<f32> = (1..=32).map(|v| v as f32).collect();
        assert_eq!(lane_sum(&values).unwrap(), 528.0);
    }

    #[test]
    fn test_lane_sum_rejects_empty() {
        assert!(matches!(lane_sum(&[]), Err(CorrelationError::EmptyInput)));
    }

    #[test]
    fn test_lane_sum_rejects_unpadded() {
        let values = vec![1.0f32; 7];
        assert!(matches!(
            lane_sum(&values),
            Err(CorrelationError::InvalidSize { len: 7, .. })
        ));

        let values = vec![1.0f32; 20];
        assert!(matches!(
            lane_sum(&values),
            Err(CorrelationError::InvalidSize { len: 20, .. })
        ));
    }

    #[test]
    fn test_lane_sum_requires_two_batches() {
        let values = vec![1.0f32; 8];
        assert!(matches!(
            lane_sum(&values),
            Err(CorrelationError::InvalidSize { len: 8, .. })
        ));
    }

    #[test]
    fn test_sequential_sum_any_length() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let sum = HostReduction::Sequential.reduce(&values).unwrap();
        assert_eq!(sum, 36.0);
        assert_eq!(HostReduction::Sequential.mean(&values).unwrap(), 4.5);
    }
}
