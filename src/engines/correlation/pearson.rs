use crate::engines::reduction::VectorReducer;
use crate::error::{CorrelationError, Result};
use serde::{Deserialize, Serialize};

/// Target-signal statistics that stay fixed for a whole run.
///
/// `deviations[i] = target[i] - mean(target)`, and `deviation_sqrt` is the
/// square root of the summed squared deviations (the target half of the
/// Pearson denominator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetProfile {
    pub deviations: Vec<f32>,
    pub deviation_sqrt: f32,
}

impl TargetProfile {
    pub fn from_target<R: VectorReducer>(target: &[f32], reducer: &R) -> Result<Self> {
        let mean = reducer.mean(target)?;

        let deviations: Vec<f32> = target.iter().map(|v| v - mean).collect();
        let squared: Vec<f32> = deviations.iter().map(|d| d * d).collect();
        let deviation_sqrt = reducer.reduce(&squared)?.sqrt();

        Ok(Self {
            deviations,
            deviation_sqrt,
        })
    }

    /// Build a profile from deviations that were already mean-centered upstream.
    pub fn from_deviations(deviations: Vec<f32>, deviation_sqrt: f32) -> Self {
        Self {
            deviations,
            deviation_sqrt,
        }
    }

    pub fn len(&self) -> usize {
        self.deviations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deviations.is_empty()
    }
}

/// Pearson correlation of `candidate` against a precomputed target profile.
pub fn pearson_correlation<R: VectorReducer>(
    reducer: &R,
    candidate: &[f32],
    target: &TargetProfile,
) -> Result<f32> {
    if candidate.is_empty() || target.is_empty() {
        return Err(CorrelationError::EmptyInput);
    }
    if candidate.len() != target.len() {
        return Err(CorrelationError::SizeMismatch {
            left: candidate.len(),
            right: target.len(),
        });
    }

    let avg = reducer.mean(candidate)?;

    let (nominator_terms, deviation_squares): (Vec<f32>, Vec<f32>) = candidate
        .iter()
        .zip(&target.deviations)
        .map(|(value, target_dev)| {
            let dev = value - avg;
            (dev * target_dev, dev * dev)
        })
        .unzip();

    let nominator = reducer.reduce(&nominator_terms)?;
    let deviation_sum = reducer.reduce(&deviation_squares)?;

    Ok(nominator / (deviation_sum.sqrt() * target.deviation_sqrt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::reduction::HostReduction;

    #[test]
    fn test_worked_example() {
        let target = TargetProfile::from_deviations(vec![-1.0, 0.0, 1.0], 2.0f32.sqrt());
        let r = pearson_correlation(&HostReduction::Sequential, &[2.0, 4.0, 6.0], &target)
            .unwrap();
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_profile_from_target() {
        let profile =
            TargetProfile::from_target(&[1.0, 2.0, 3.0], &HostReduction::Sequential).unwrap();
        assert_eq!(profile.deviations, vec![-1.0, 0.0, 1.0]);
        assert!((profile.deviation_sqrt - 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_mismatch() {
        let target = TargetProfile::from_deviations(vec![-1.0, 0.0, 1.0], 2.0f32.sqrt());
        let err = pearson_correlation(&HostReduction::Sequential, &[1.0, 2.0], &target);
        assert!(matches!(
            err,
            Err(CorrelationError::SizeMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn test_lane_path_propagates_invalid_size() {
        let target = TargetProfile::from_deviations(vec![-1.0, 0.0, 1.0], 2.0f32.sqrt());
        let err = pearson_correlation(&HostReduction::Lanes, &[2.0, 4.0, 6.0], &target);
        assert!(matches!(err, Err(CorrelationError::InvalidSize { .. })));
    }
}
