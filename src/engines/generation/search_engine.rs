use crate::config::SearchConfig;
use crate::engines::accelerator::{AcceleratorContext, BufferHandle, BufferRole};
use crate::engines::correlation::{pearson_correlation, TargetProfile};
use crate::engines::generation::{
    best_fit::{BestFit, BestFitTracker},
    frontier::MutationFrontier,
    individual::Individual,
    population::Population,
    progress::ProgressCallback,
};
use crate::error::{CorrelationError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

/// Result of the search budget.
#[derive(Debug, Clone, Serialize)]
pub enum SearchOutcome {
    Found(BestFit),
    /// No candidate produced a finite, improving correlation.
    Degenerate,
}

impl SearchOutcome {
    pub fn best_fit(&self) -> Option<&BestFit> {
        match self {
            SearchOutcome::Found(best) => Some(best),
            SearchOutcome::Degenerate => None,
        }
    }

    pub fn into_best_fit(self) -> Result<BestFit> {
        match self {
            SearchOutcome::Found(best) => Ok(best),
            SearchOutcome::Degenerate => Err(CorrelationError::DegenerateResult),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SearchStats {
    pub evaluations: usize,
    pub faults: usize,
    pub improvements: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub initial_correlation: f32,
    pub outcome: SearchOutcome,
    pub stats: SearchStats,
    /// Best distance from the initial correlation after each generation.
    pub distance_history: Vec<f32>,
}

/// Device buffers of one run, one per role.
struct SearchBuffers {
    input: BufferHandle,
    target: BufferHandle,
    pool: BufferHandle,
    generated: BufferHandle,
    working: BufferHandle,
    scratch: BufferHandle,
    best_fit: BufferHandle,
    best_values: BufferHandle,
}

impl SearchBuffers {
    fn all(&self) -> [BufferHandle; 8] {
        [
            self.input,
            self.target,
            self.pool,
            self.generated,
            self.working,
            self.scratch,
            self.best_fit,
            self.best_values,
        ]
    }
}

/// Genetic search for an expression of the input that tracks the target.
pub struct GeneticSearch<'a> {
    config: SearchConfig,
    context: &'a AcceleratorContext,
    rng: StdRng,
}

impl<'a> GeneticSearch<'a> {
    pub fn new(config: SearchConfig, context: &'a AcceleratorContext) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            context,
            rng,
        }
    }

    /// Run the full budget of generations against `target`.
    ///
    /// Both vectors must have the same power-of-two length.
    pub fn run<C: ProgressCallback>(
        &mut self,
        input: &[f32],
        target: &[f32],
        callback: &mut C,
    ) -> Result<SearchResult> {
        if input.is_empty() || target.is_empty() {
            return Err(CorrelationError::EmptyInput);
        }
        if input.len() != target.len() {
            return Err(CorrelationError::SizeMismatch {
                left: input.len(),
                right: target.len(),
            });
        }
        if !input.len().is_power_of_two() {
            return Err(CorrelationError::invalid_size(
                input.len(),
                "search vectors must be padded to a power of two",
            ));
        }

        let reducer = self.config.baseline_reduction;
        let profile = TargetProfile::from_target(target, &reducer)?;
        let initial = pearson_correlation(&reducer, input, &profile)?;
        log::debug!(
            "Initial correlation {:.6} over {} samples on {}",
            initial,
            input.len(),
            self.context.device_name()
        );

        let population = Population::initialize(
            self.config.population_size,
            self.config.individual_size,
            self.config.operand_max,
            &mut self.rng,
        )?;

        let buffers = self.allocate_buffers(input, &profile, population.as_slice().len())?;
        let result = self.search(population, &buffers, &profile, initial, callback);

        for handle in buffers.all() {
            self.context.release_logged(handle);
        }

        result
    }

    fn allocate_buffers(
        &self,
        input: &[f32],
        profile: &TargetProfile,
        pool_len: usize,
    ) -> Result<SearchBuffers> {
        let n = input.len();
        let mut handles: Vec<BufferHandle> = Vec::with_capacity(8);

        let result = (|| -> Result<SearchBuffers> {
            let mut take = |handle: Result<BufferHandle>| -> Result<BufferHandle> {
                let handle = handle?;
                handles.push(handle);
                Ok(handle)
            };

            Ok(SearchBuffers {
                input: take(self.context.upload(BufferRole::Input, input))?,
                target: take(self.context.upload(BufferRole::TargetDeviations, &profile.deviations))?,
                pool: take(self.context.allocate(BufferRole::GenerationPool, pool_len))?,
                generated: take(self.context.allocate(BufferRole::GeneratedValues, n))?,
                working: take(self.context.allocate(BufferRole::Working, n))?,
                scratch: take(self.context.allocate(BufferRole::Scratch, n))?,
                best_fit: take(self.context.allocate(BufferRole::BestFit, self.config.individual_size))?,
                best_values: take(self.context.allocate(BufferRole::BestFitValues, n))?,
            })
        })();

        if result.is_err() {
            for handle in handles {
                self.context.release_logged(handle);
            }
        }
        result
    }

    fn search<C: ProgressCallback>(
        &mut self,
        mut population: Population,
        buffers: &SearchBuffers,
        profile: &TargetProfile,
        initial: f32,
        callback: &mut C,
    ) -> Result<SearchResult> {
        let individual_size = population.individual_size();
        let mut frontier = MutationFrontier::new(individual_size);
        let mut tracker = BestFitTracker::new(initial);
        let mut stats = SearchStats::default();

        for generation in 0..self.config.generations {
            callback.on_generation_start(generation);
            let mut improved = false;

            for index in 0..population.len() {
                population.mutate_individual(
                    index,
                    frontier.index(),
                    self.config.operand_max,
                    &mut self.rng,
                );

                let correlation = match self.score(&population, index, buffers, profile) {
                    Ok(correlation) => correlation,
                    Err(e) => {
                        log::warn!(
                            "Skipping candidate {} of generation {}: {}",
                            index,
                            generation + 1,
                            e
                        );
                        stats.faults += 1;
                        continue;
                    }
                };
                stats.evaluations += 1;
                callback.on_candidate_evaluated(generation, index, correlation);

                if !tracker.is_improvement(correlation) {
                    continue;
                }

                if let Err(e) = self.keep_best(index, individual_size, buffers) {
                    log::warn!("Could not store best fit of generation {}: {}", generation + 1, e);
                    stats.faults += 1;
                    continue;
                }
                tracker.accept(correlation, generation);
                improved = true;
                callback.on_improvement(generation, correlation);
            }

            frontier.adapt(improved);
            tracker.close_generation();
            callback.on_generation_complete(generation, tracker.best(), frontier.index());
        }
        stats.improvements = tracker.improvements();

        let outcome = match (tracker.best(), tracker.found_in()) {
            (Some(correlation), Some(generation)) => {
                let individual = Individual::from_genes(self.context.read_buffer(buffers.best_fit)?)?;
                let generated = self.context.read_buffer(buffers.best_values)?;
                SearchOutcome::Found(BestFit {
                    individual,
                    generated,
                    correlation,
                    generation,
                })
            }
            _ => SearchOutcome::Degenerate,
        };

        Ok(SearchResult {
            initial_correlation: initial,
            outcome,
            stats,
            distance_history: tracker.into_distance_history(),
        })
    }

    /// Upload individual `index`, generate its signal and correlate it with the target.
    fn score(
        &self,
        population: &Population,
        index: usize,
        buffers: &SearchBuffers,
        profile: &TargetProfile,
    ) -> Result<f32> {
        let size = population.individual_size();

        self.context.fill_buffer(buffers.generated, 0.0)?;
        self.context
            .write_buffer(buffers.pool, index * size, population.individual(index))?;
        self.context
            .evaluate_expression(buffers.pool, index, size, buffers.input, buffers.generated)?;
        self.context.compute_pearsons_correlation(
            buffers.generated,
            buffers.target,
            profile.deviation_sqrt,
            buffers.working,
            buffers.scratch,
        )
    }

    fn keep_best(&self, index: usize, size: usize, buffers: &SearchBuffers) -> Result<()> {
        self.context
            .copy_buffer(buffers.pool, index * size, buffers.best_fit, 0, size)?;
        self.context.copy_buffer(
            buffers.generated,
            0,
            buffers.best_values,
            0,
            buffers.generated.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::progress::SilentProgress;
    use crate::engines::reduction::HostReduction;

    fn small_config(seed: u64) -> SearchConfig {
        SearchConfig {
            population_size: 10,
            generations: 5,
            seed: Some(seed),
            baseline_reduction: HostReduction::Sequential,
            ..SearchConfig::default()
        }
    }

    fn signals(len: usize) -> (Vec<f32>, Vec<f32>) {
        let input: Vec<f32> = (0..len).map(|i| ((i as f32) * 0.37).sin().abs() * 0.3).collect();
        let target: Vec<f32> = input.iter().enumerate().map(|(i, v)| v * 0.5 + 0.01 * (i % 5) as f32).collect();
        (input, target)
    }

    #[test]
    fn test_search_finds_and_releases_buffers() {
        let context = AcceleratorContext::software().unwrap();
        let (input, target) = signals(32);

        let mut search = GeneticSearch::new(small_config(11), &context);
        let result = search.run(&input, &target, &mut SilentProgress).unwrap();

        assert_eq!(context.live_buffers().unwrap(), 0);
        assert_eq!(result.distance_history.len(), 5);
        assert_eq!(result.stats.evaluations + result.stats.faults, 50);

        let best = result.outcome.into_best_fit().unwrap();
        assert_eq!(best.generated.len(), 32);
        assert_eq!(best.individual.genes().len(), 30);
        assert!(best.correlation.is_finite());
    }

    #[test]
    fn test_search_finds_for_any_seed() {
        let context = AcceleratorContext::software().unwrap();
        let (input, target) = signals(64);

        for seed in 0..8 {
            let mut search = GeneticSearch::new(small_config(seed), &context);
            let result = search.run(&input, &target, &mut SilentProgress).unwrap();

            assert_eq!(result.stats.faults, 0, "seed {}", seed);
            assert!(result.stats.improvements > 0, "seed {}", seed);
            let best = result.outcome.into_best_fit().unwrap();
            assert!(best.correlation.is_finite(), "seed {}", seed);
        }
        assert_eq!(context.live_buffers().unwrap(), 0);
    }

    #[test]
    fn test_search_rejects_bad_vectors() {
        let context = AcceleratorContext::software().unwrap();
        let mut search = GeneticSearch::new(small_config(1), &context);

        assert!(matches!(
            search.run(&[], &[], &mut SilentProgress),
            Err(CorrelationError::EmptyInput)
        ));
        assert!(matches!(
            search.run(&[1.0; 16], &[1.0; 8], &mut SilentProgress),
            Err(CorrelationError::SizeMismatch { left: 16, right: 8 })
        ));
        assert!(matches!(
            search.run(&[1.0; 24], &[1.0; 24], &mut SilentProgress),
            Err(CorrelationError::InvalidSize { len: 24, .. })
        ));
    }

    #[test]
    fn test_degenerate_outcome_demands_best_fit() {
        let outcome = SearchOutcome::Degenerate;
        assert!(outcome.best_fit().is_none());
        assert!(matches!(outcome.into_best_fit(), Err(CorrelationError::DegenerateResult)));
    }
}
