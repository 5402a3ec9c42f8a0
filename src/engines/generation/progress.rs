/// Hooks invoked by the search driver as it works through its budget.
pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_generation_complete(&mut self, generation: usize, best: Option<f32>, frontier: usize);
    fn on_candidate_evaluated(&mut self, _generation: usize, _index: usize, _correlation: f32) {}
    fn on_improvement(&mut self, _generation: usize, _correlation: f32) {}
}

/// Logs progress every `interval` generations.
pub struct ConsoleProgressCallback {
    label: String,
    generations: usize,
    interval: usize,
}

impl ConsoleProgressCallback {
    pub fn new(label: impl Into<String>, generations: usize, interval: usize) -> Self {
        Self {
            label: label.into(),
            generations,
            interval: interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::trace!("[{}] generation {} starting", self.label, generation + 1);
    }

    fn on_generation_complete(&mut self, generation: usize, best: Option<f32>, frontier: usize) {
        let done = generation + 1;
        if done % self.interval == 0 || done == self.generations {
            match best {
                Some(best) => log::info!(
                    "[{}] Finished [{}/{}] iterations, best correlation {:.6}, frontier {}",
                    self.label,
                    done,
                    self.generations,
                    best,
                    frontier
                ),
                None => log::info!(
                    "[{}] Finished [{}/{}] iterations, no correlation found yet",
                    self.label,
                    done,
                    self.generations
                ),
            }
        }
    }

    fn on_improvement(&mut self, generation: usize, correlation: f32) {
        log::info!(
            "[{}] Found correlation: {:.6} in {}. iteration",
            self.label,
            correlation,
            generation + 1
        );
    }
}

/// Discards every notification.
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_generation_start(&mut self, _generation: usize) {}
    fn on_generation_complete(&mut self, _generation: usize, _best: Option<f32>, _frontier: usize) {}
}
