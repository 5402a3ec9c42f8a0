use crate::config::AppConfig;
use crate::data::{discover_subjects, preprocess_subject};
use crate::engines::accelerator::{AcceleratorContext, ComputeDevice, SoftwareDevice};
use crate::engines::generation::{
    ConsoleProgressCallback, GeneticSearch, ProgressCallback, SearchOutcome,
};
use crate::error::Result;
use crate::output::{plot_file_name, write_plot, RunReport};
use crate::types::{Axis, AxisResult, SubjectSignals};
use std::sync::Arc;

/// Drives the search over every discovered subject and axis.
pub struct CorrelationRunner {
    config: AppConfig,
    context: AcceleratorContext,
}

impl CorrelationRunner {
    /// Runner on the software device configured in `config.search`.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let device: Arc<dyn ComputeDevice> = match config.search.device_threads {
            Some(threads) => Arc::new(SoftwareDevice::with_threads(threads)?),
            None => Arc::new(SoftwareDevice::new()),
        };
        Self::with_device(config, device)
    }

    pub fn with_device(config: AppConfig, device: Arc<dyn ComputeDevice>) -> Result<Self> {
        let context = AcceleratorContext::new(device)?;
        log::info!("Chosen device: {}", context.device_name());
        Ok(Self { config, context })
    }

    pub fn context(&self) -> &AcceleratorContext {
        &self.context
    }

    /// Process every subject found under the resource folder.
    ///
    /// A subject that fails preprocessing is recorded and skipped.
    pub fn run_all(&self) -> Result<RunReport> {
        let preprocessing = &self.config.preprocessing;
        log::info!("Period size: {}", preprocessing.period_size);
        log::info!("Validating resource files...");
        let subjects = discover_subjects(&preprocessing.resource_dir, preprocessing.subject_count)?;

        let mut report = RunReport::new(preprocessing.period_size, self.context.device_name());
        report.subjects_found = subjects.len();

        log::info!("Beginning data preprocessing...");
        for files in &subjects {
            let signals = match preprocess_subject(files, preprocessing) {
                Ok(signals) => signals,
                Err(e) => {
                    log::error!("Could not preprocess subject {:03}: {}", files.id, e);
                    report.subjects_failed.push(files.id);
                    continue;
                }
            };

            for axis in Axis::ALL {
                match self.run_axis(&signals, axis) {
                    Ok(result) => report.results.push(result),
                    Err(e) => log::error!(
                        "Search failed for subject {:03}, axis {}: {}",
                        signals.subject_id,
                        axis,
                        e
                    ),
                }
            }
        }

        if self.config.output.write_report {
            let path = self.config.output.out_dir.join("report.json");
            match report.write(&path) {
                Ok(()) => log::info!("Report written to {}", path.display()),
                Err(e) => log::warn!("Could not write report {}: {}", path.display(), e),
            }
        }

        Ok(report)
    }

    /// Search one axis of one subject with console progress.
    pub fn run_axis(&self, signals: &SubjectSignals, axis: Axis) -> Result<AxisResult> {
        let mut progress = ConsoleProgressCallback::new(
            format!("subject {:03} axis {}", signals.subject_id, axis),
            self.config.search.generations,
            self.config.search.progress_interval,
        );
        self.run_axis_with(signals, axis, &mut progress)
    }

    pub fn run_axis_with<C: ProgressCallback>(
        &self,
        signals: &SubjectSignals,
        axis: Axis,
        progress: &mut C,
    ) -> Result<AxisResult> {
        let mut search_config = self.config.search.clone();
        // Distinct but reproducible stream per subject and axis
        search_config.seed = search_config
            .seed
            .map(|seed| seed.wrapping_add((signals.subject_id * Axis::ALL.len() + axis.index()) as u64));

        log::info!(
            "Starting correlation formula generation for subject {:03}, axis {} on {}",
            signals.subject_id,
            axis,
            self.context.device_name()
        );
        let mut search = GeneticSearch::new(search_config, &self.context);
        let result = search.run(signals.axis(axis), &signals.hr, progress)?;
        log::info!(
            "Initial correlation (axis {}) is {:.6}",
            axis,
            result.initial_correlation
        );

        let mut axis_result = AxisResult {
            subject_id: signals.subject_id,
            axis,
            device: self.context.device_name().to_string(),
            initial_correlation: result.initial_correlation,
            best_correlation: None,
            formula: None,
            tree: Vec::new(),
            plot_path: None,
        };

        match &result.outcome {
            SearchOutcome::Found(best) => {
                let formula = best.individual.formula();
                log::info!(
                    "Best correlation {:.6} (generation {}): {}",
                    best.correlation,
                    best.generation + 1,
                    formula
                );
                axis_result.plot_path = self.export_plot(signals, axis, &best.generated, &formula);
                axis_result.best_correlation = Some(best.correlation);
                axis_result.tree = best.individual.genes().to_vec();
                axis_result.formula = Some(formula);
            }
            SearchOutcome::Degenerate => log::warn!(
                "No improving expression found for subject {:03}, axis {} ({} faults)",
                signals.subject_id,
                axis,
                result.stats.faults
            ),
        }

        Ok(axis_result)
    }

    fn export_plot(
        &self,
        signals: &SubjectSignals,
        axis: Axis,
        generated: &[f32],
        formula: &str,
    ) -> Option<String> {
        let output = &self.config.output;
        if !output.write_plots {
            return None;
        }

        let path = output.out_dir.join(plot_file_name(
            signals.subject_id,
            axis,
            self.context.device_name(),
        ));
        log::info!("Exporting results into {}", path.display());
        match write_plot(&path, generated, &signals.hr, formula, output) {
            Ok(()) => Some(path.to_string_lossy().into_owned()),
            Err(e) => {
                log::warn!("Plot {} will not be created: {}", path.display(), e);
                None
            }
        }
    }
}
