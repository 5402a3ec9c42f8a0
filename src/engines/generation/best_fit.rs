use super::individual::Individual;
use crate::types::CORRELATION_NOT_FOUND;
use serde::Serialize;

/// Best individual found by a search, with the signal it generates.
#[derive(Debug, Clone, Serialize)]
pub struct BestFit {
    pub individual: Individual,
    pub generated: Vec<f32>,
    pub correlation: f32,
    pub generation: usize,
}

/// Keeps the best correlation seen so far, measured as distance from the
/// initial (raw input) correlation.
#[derive(Debug, Clone)]
pub struct BestFitTracker {
    initial: f32,
    best: f32,
    found_in: Option<usize>,
    improvements: usize,
    distance_history: Vec<f32>,
}

impl BestFitTracker {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            best: CORRELATION_NOT_FOUND,
            found_in: None,
            improvements: 0,
            distance_history: Vec::new(),
        }
    }

    /// Best correlation accepted so far, `None` while nothing was found.
    pub fn best(&self) -> Option<f32> {
        self.found_in.map(|_| self.best)
    }

    pub fn found_in(&self) -> Option<usize> {
        self.found_in
    }

    pub fn improvements(&self) -> usize {
        self.improvements
    }

    pub fn best_distance(&self) -> f32 {
        (self.initial - self.best).abs()
    }

    /// Non-finite correlations never improve.
    pub fn is_improvement(&self, correlation: f32) -> bool {
        correlation.is_finite() && (self.initial - correlation).abs() < self.best_distance()
    }

    pub fn accept(&mut self, correlation: f32, generation: usize) {
        self.best = correlation;
        self.found_in = Some(generation);
        self.improvements += 1;
    }

    /// Record the best distance at the end of a generation.
    pub fn close_generation(&mut self) {
        self.distance_history.push(self.best_distance());
    }

    pub fn distance_history(&self) -> &[f32] {
        &self.distance_history
    }

    pub fn into_distance_history(self) -> Vec<f32> {
        self.distance_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improvement_is_strict() {
        let mut tracker = BestFitTracker::new(0.2);
        assert!(tracker.best().is_none());
        assert!(tracker.is_improvement(0.5));

        tracker.accept(0.5, 0);
        assert_eq!(tracker.best(), Some(0.5));
        assert!(!tracker.is_improvement(0.5));
        assert!(!tracker.is_improvement(-0.1));
        assert!(tracker.is_improvement(0.45));
    }

    #[test]
    fn test_non_finite_never_improves() {
        let tracker = BestFitTracker::new(0.2);
        assert!(!tracker.is_improvement(f32::NAN));
        assert!(!tracker.is_improvement(f32::INFINITY));
    }

    #[test]
    fn test_distance_history_per_generation() {
        let mut tracker = BestFitTracker::new(0.0);
        tracker.close_generation();
        tracker.accept(0.5, 1);
        tracker.close_generation();
        assert_eq!(tracker.distance_history(), &[2.0, 0.5]);
    }
}
