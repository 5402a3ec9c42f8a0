use super::kernels;
use crate::error::{CorrelationError, Result};
use std::collections::HashSet;

/// Kernel entry points exposed by the accelerator program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    FillBuffer,
    CopyBuffer,
    ParallelPrefixSum,
    CorrelationTerms,
    GenerateValues,
    Crossover,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 6] = [
        EntryPoint::FillBuffer,
        EntryPoint::CopyBuffer,
        EntryPoint::ParallelPrefixSum,
        EntryPoint::CorrelationTerms,
        EntryPoint::GenerateValues,
        EntryPoint::Crossover,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntryPoint::FillBuffer => "fill_buffer",
            EntryPoint::CopyBuffer => "copy_buffer",
            EntryPoint::ParallelPrefixSum => "parallel_prefix_sum",
            EntryPoint::CorrelationTerms => "calculate_correlation_acc_values",
            EntryPoint::GenerateValues => "generate_hr_values",
            EntryPoint::Crossover => "perform_crossover",
        }
    }
}

/// A built program: the set of entry points the device can launch.
#[derive(Debug, Clone)]
pub struct Program {
    entry_points: HashSet<EntryPoint>,
}

impl Program {
    pub fn new(entry_points: impl IntoIterator<Item = EntryPoint>) -> Self {
        Self {
            entry_points: entry_points.into_iter().collect(),
        }
    }

    pub fn contains(&self, entry: EntryPoint) -> bool {
        self.entry_points.contains(&entry)
    }

    pub fn require(&self, entry: EntryPoint) -> Result<()> {
        if self.contains(entry) {
            Ok(())
        } else {
            Err(CorrelationError::fault(format!(
                "kernel {} missing from program",
                entry.name()
            )))
        }
    }
}

/// One kernel launch with its arguments bound.
pub enum KernelLaunch<'a> {
    Fill {
        buffer: &'a mut [f32],
        value: f32,
    },
    Copy {
        from: &'a [f32],
        to: &'a mut [f32],
    },
    PrefixSumStep {
        vector: &'a mut [f32],
        block: usize,
    },
    CorrelationTerms {
        nominator: &'a mut [f32],
        deviation_squares: &'a mut [f32],
        target_deviations: &'a [f32],
        mean: f32,
    },
    GenerateValues {
        individual: &'a [f32],
        input: &'a [f32],
        output: &'a mut [f32],
    },
    Crossover {
        generation: &'a mut [f32],
        crossover_point: usize,
        individual_size: usize,
    },
}

impl KernelLaunch<'_> {
    pub fn entry_point(&self) -> EntryPoint {
        match self {
            KernelLaunch::Fill { .. } => EntryPoint::FillBuffer,
            KernelLaunch::Copy { .. } => EntryPoint::CopyBuffer,
            KernelLaunch::PrefixSumStep { .. } => EntryPoint::ParallelPrefixSum,
            KernelLaunch::CorrelationTerms { .. } => EntryPoint::CorrelationTerms,
            KernelLaunch::GenerateValues { .. } => EntryPoint::GenerateValues,
            KernelLaunch::Crossover { .. } => EntryPoint::Crossover,
        }
    }
}

/// A parallel compute device.
pub trait ComputeDevice: Send + Sync {
    fn name(&self) -> &str;

    /// Build the kernel program for this device.
    fn build_program(&self) -> Result<Program>;

    /// Run every work item of `launch`; returns only after all of them finished.
    fn launch(&self, launch: KernelLaunch<'_>) -> Result<()>;
}

/// Device that runs kernels on host threads, one rayon task per work item.
pub struct SoftwareDevice {
    name: String,
    pool: Option<rayon::ThreadPool>,
}

impl SoftwareDevice {
    /// Device backed by the global rayon pool.
    pub fn new() -> Self {
        Self {
            name: "software".to_string(),
            pool: None,
        }
    }

    /// Device with its own pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("hrcorr-device-{}", i))
            .build()
            .map_err(|e| CorrelationError::fault(format!("could not start device pool: {}", e)))?;

        Ok(Self {
            name: format!("software ({} threads)", threads),
            pool: Some(pool),
        })
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeDevice for SoftwareDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_program(&self) -> Result<Program> {
        Ok(Program::new(EntryPoint::ALL))
    }

    fn launch(&self, launch: KernelLaunch<'_>) -> Result<()> {
        match &self.pool {
            Some(pool) => pool.install(|| kernels::execute(launch)),
            None => kernels::execute(launch),
        }
    }
}
