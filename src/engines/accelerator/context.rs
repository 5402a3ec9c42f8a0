use super::buffer::{BufferArena, BufferHandle, BufferRole};
use super::device::{ComputeDevice, KernelLaunch, Program, SoftwareDevice};
use crate::engines::reduction::VectorReducer;
use crate::error::{CorrelationError, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// Device binding, built program and buffer arena shared by every evaluation of a run.
///
/// All launches are synchronous: a method returns only after the device
/// finished the work, so any buffer it wrote can be read right away.
pub struct AcceleratorContext {
    device: Arc<dyn ComputeDevice>,
    program: Program,
    arena: Mutex<BufferArena>,
}

/// Host read view of a device buffer. The buffer stays locked until the view
/// is released (or dropped).
pub struct MappedView<'a> {
    context: &'a AcceleratorContext,
    handle: BufferHandle,
    values: Vec<f32>,
}

impl MappedView<'_> {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn last(&self) -> Option<f32> {
        self.values.last().copied()
    }

    pub fn release(self) {}
}

impl Drop for MappedView<'_> {
    fn drop(&mut self) {
        if let Ok(mut arena) = self.context.arena.lock() {
            arena.unmap(self.handle);
        }
    }
}

impl AcceleratorContext {
    pub fn new(device: Arc<dyn ComputeDevice>) -> Result<Self> {
        let program = device.build_program()?;
        log::debug!("Program built for device {}", device.name());

        Ok(Self {
            device,
            program,
            arena: Mutex::new(BufferArena::new()),
        })
    }

    /// Context on the host software device.
    pub fn software() -> Result<Self> {
        Self::new(Arc::new(SoftwareDevice::new()))
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    pub fn live_buffers(&self) -> Result<usize> {
        Ok(self.arena()?.live_buffers())
    }

    fn arena(&self) -> Result<MutexGuard<'_, BufferArena>> {
        self.arena
            .lock()
            .map_err(|_| CorrelationError::fault("buffer arena lock poisoned"))
    }

    fn launch(&self, launch: KernelLaunch<'_>) -> Result<()> {
        self.program.require(launch.entry_point())?;
        self.device.launch(launch)
    }

    pub fn allocate(&self, role: BufferRole, len: usize) -> Result<BufferHandle> {
        self.arena()?.allocate(role, len)
    }

    pub fn upload(&self, role: BufferRole, values: &[f32]) -> Result<BufferHandle> {
        let handle = self.allocate(role, values.len())?;
        if let Err(e) = self.write_buffer(handle, 0, values) {
            self.release_logged(handle);
            return Err(e);
        }
        Ok(handle)
    }

    pub fn release(&self, handle: BufferHandle) -> Result<()> {
        self.arena()?.release(handle)
    }

    /// Release `handle`, logging instead of returning a failure. For cleanup paths.
    pub fn release_logged(&self, handle: BufferHandle) {
        if let Err(e) = self.release(handle) {
            log::warn!("Could not release {:?} buffer: {}", handle.role(), e);
        }
    }

    /// Host to device transfer into `handle` starting at `offset`.
    pub fn write_buffer(&self, handle: BufferHandle, offset: usize, values: &[f32]) -> Result<()> {
        self.arena()?.with_buffers([handle], |buffers| {
            let [buffer] = buffers;
            let end = offset + values.len();
            if end > buffer.len() {
                return Err(out_of_range(handle, end));
            }
            buffer[offset..end].copy_from_slice(values);
            Ok(())
        })
    }

    /// Blocking device to host read.
    pub fn read_buffer(&self, handle: BufferHandle) -> Result<Vec<f32>> {
        self.arena()?.read(handle)
    }

    pub fn map_read(&self, handle: BufferHandle) -> Result<MappedView<'_>> {
        let values = self.arena()?.map(handle)?;
        Ok(MappedView {
            context: self,
            handle,
            values,
        })
    }

    pub fn fill_buffer(&self, handle: BufferHandle, value: f32) -> Result<()> {
        self.arena()?.with_buffers([handle], |buffers| {
            let [buffer] = buffers;
            self.launch(KernelLaunch::Fill { buffer, value })
        })
    }

    pub fn copy_buffer(
        &self,
        from: BufferHandle,
        from_offset: usize,
        to: BufferHandle,
        to_offset: usize,
        len: usize,
    ) -> Result<()> {
        self.arena()?.with_buffers([from, to], |buffers| {
            let [source, destination] = buffers;
            if from_offset + len > source.len() {
                return Err(out_of_range(from, from_offset + len));
            }
            if to_offset + len > destination.len() {
                return Err(out_of_range(to, to_offset + len));
            }
            self.launch(KernelLaunch::Copy {
                from: &source[from_offset..from_offset + len],
                to: &mut destination[to_offset..to_offset + len],
            })
        })
    }

    /// Tree-reduce `handle` in place and map it for reading.
    ///
    /// The buffer is overwritten with partial sums; the total is the LAST
    /// element of the returned view.
    pub fn sum_vector(&self, handle: BufferHandle) -> Result<MappedView<'_>> {
        check_tree_size(handle.len())?;

        self.arena()?.with_buffers([handle], |buffers| {
            let [vector] = buffers;
            let steps = vector.len().trailing_zeros();
            for step in 0..steps {
                let block = 1usize << (step + 1);
                self.launch(KernelLaunch::PrefixSumStep {
                    vector: vector.as_mut_slice(),
                    block,
                })?;
            }
            Ok(())
        })?;

        self.map_read(handle)
    }

    fn sum_last(&self, handle: BufferHandle) -> Result<f32> {
        let view = self.sum_vector(handle)?;
        let sum = view.last().ok_or(CorrelationError::EmptyInput)?;
        view.release();
        Ok(sum)
    }

    /// Pearson correlation of `candidate` against the target deviations, on the device.
    ///
    /// `working` and `scratch` must match the candidate length; both are
    /// overwritten. The candidate buffer itself is left untouched.
    pub fn compute_pearsons_correlation(
        &self,
        candidate: BufferHandle,
        target_deviations: BufferHandle,
        target_deviation_sqrt: f32,
        working: BufferHandle,
        scratch: BufferHandle,
    ) -> Result<f32> {
        let len = candidate.len();
        check_tree_size(len)?;
        for other in [target_deviations, working, scratch] {
            if other.len() != len {
                return Err(CorrelationError::SizeMismatch {
                    left: len,
                    right: other.len(),
                });
            }
        }

        self.copy_buffer(candidate, 0, working, 0, len)?;
        let mean = self.sum_last(working)? / len as f32;

        self.copy_buffer(candidate, 0, working, 0, len)?;
        self.fill_buffer(scratch, 0.0)?;

        self.arena()?
            .with_buffers([working, scratch, target_deviations], |buffers| {
                let [nominator, deviation_squares, target] = buffers;
                self.launch(KernelLaunch::CorrelationTerms {
                    nominator,
                    deviation_squares,
                    target_deviations: target,
                    mean,
                })
            })?;

        let nominator = self.sum_last(working)?;
        let deviation_sum = self.sum_last(scratch)?;

        Ok(nominator / (deviation_sum.sqrt() * target_deviation_sqrt))
    }

    /// Materialize the signal of individual `index` from the generation pool.
    pub fn evaluate_expression(
        &self,
        generation: BufferHandle,
        index: usize,
        individual_size: usize,
        input: BufferHandle,
        output: BufferHandle,
    ) -> Result<()> {
        if input.len() != output.len() {
            return Err(CorrelationError::SizeMismatch {
                left: input.len(),
                right: output.len(),
            });
        }

        let start = index * individual_size;
        let end = start + individual_size;
        if end > generation.len() {
            return Err(out_of_range(generation, end));
        }

        self.arena()?.with_buffers([generation, input, output], |buffers| {
            let [genes, input, output] = buffers;
            self.launch(KernelLaunch::GenerateValues {
                individual: &genes[start..end],
                input,
                output,
            })
        })
    }

    /// Evaluate a single individual against `input` using temporary buffers.
    pub fn generate_values(&self, individual: &[f32], input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Err(CorrelationError::EmptyInput);
        }

        let mut handles = Vec::with_capacity(3);
        let result = (|| -> Result<Vec<f32>> {
            let genes = self.upload(BufferRole::GenerationPool, individual)?;
            handles.push(genes);
            let input_buffer = self.upload(BufferRole::Input, input)?;
            handles.push(input_buffer);
            let output = self.allocate(BufferRole::GeneratedValues, input.len())?;
            handles.push(output);

            self.fill_buffer(output, 0.0)?;
            self.evaluate_expression(genes, 0, individual.len(), input_buffer, output)?;
            self.read_buffer(output)
        })();

        for handle in handles {
            self.release_logged(handle);
        }
        result
    }

    /// Swap the tails of each adjacent pair of individuals in the generation pool.
    pub fn perform_crossover(
        &self,
        generation: BufferHandle,
        crossover_point: usize,
        individual_size: usize,
    ) -> Result<()> {
        self.arena()?.with_buffers([generation], |buffers| {
            let [genes] = buffers;
            self.launch(KernelLaunch::Crossover {
                generation: genes,
                crossover_point,
                individual_size,
            })
        })
    }}

impl VectorReducer for AcceleratorContext {
    fn reduce(&self, values: &[f32]) -> Result<f32> {
        check_tree_size(values.len())?;

        let handle = self.upload(BufferRole::Working, values)?;
        let result = self.sum_last(handle);
        self.release_logged(handle);
        result
    }
}

fn check_tree_size(len: usize) -> Result<()> {
    if len == 0 {
        return Err(CorrelationError::EmptyInput);
    }
    if !len.is_power_of_two() {
        return Err(CorrelationError::invalid_size(
            len,
            "tree reduction needs a power-of-two length",
        ));
    }
    Ok(())
}

fn out_of_range(handle: BufferHandle, end: usize) -> CorrelationError {
    CorrelationError::fault(format!(
        "range end {} outside {:?} buffer of {}",
        end,
        handle.role(),
        handle.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::correlation::{pearson_correlation, TargetProfile};
    use crate::engines::reduction::HostReduction;

    #[test]
    fn test_cleanup_release_tolerates_stale_handle() {
        let context = AcceleratorContext::software().unwrap();
        let handle = context.upload(BufferRole::Working, &[1.0; 8]).unwrap();
        context.release(handle).unwrap();

        context.release_logged(handle);
        assert!(context.release(handle).is_err());
        assert_eq!(context.live_buffers().unwrap(), 0);
    }

    #[test]
    fn test_reduce_sums_power_of_two() {
        let context = AcceleratorContext::software().unwrap();
        let values: Vec<f32> = (1..=8).map(|v| v as f32).collect();
        assert_eq!(context.reduce(&values).unwrap(), 36.0);
        assert_eq!(context.live_buffers().unwrap(), 0);
    }

    #[test]
    fn test_reduce_rejects_non_power_of_two() {
        let context = AcceleratorContext::software().unwrap();
        assert!(matches!(
            context.reduce(&[1.0; 24]),
            Err(CorrelationError::InvalidSize { len: 24, .. })
        ));
        assert!(matches!(context.reduce(&[]), Err(CorrelationError::EmptyInput)));
    }

    #[test]
    fn test_sum_vector_view_locks_buffer() {
        let context = AcceleratorContext::software().unwrap();
        let handle = context.upload(BufferRole::Working, &[1.0; 16]).unwrap();

        let view = context.sum_vector(handle).unwrap();
        assert_eq!(view.last(), Some(16.0));
        assert!(context.fill_buffer(handle, 0.0).is_err());

        view.release();
        assert!(context.fill_buffer(handle, 0.0).is_ok());
    }

    #[test]
    fn test_copy_rejects_aliasing() {
        let context = AcceleratorContext::software().unwrap();
        let handle = context.upload(BufferRole::Working, &[1.0; 8]).unwrap();
        let result = context.copy_buffer(handle, 0, handle, 4, 4);
        assert!(matches!(result, Err(CorrelationError::AcceleratorFault(_))));
    }

    #[test]
    fn test_device_correlation_matches_host() {
        let context = AcceleratorContext::software().unwrap();
        let target: Vec<f32> = (0..64).map(|i| ((i as f32) * 0.3).sin()).collect();
        let candidate: Vec<f32> = (0..64).map(|i| ((i as f32) * 0.3).sin() * 2.0 + 0.1 * (i % 3) as f32).collect();

        let profile = TargetProfile::from_target(&target, &HostReduction::Lanes).unwrap();
        let host = pearson_correlation(&HostReduction::Lanes, &candidate, &profile).unwrap();

        let candidate_buffer = context.upload(BufferRole::GeneratedValues, &candidate).unwrap();
        let target_buffer = context.upload(BufferRole::TargetDeviations, &profile.deviations).unwrap();
        let working = context.allocate(BufferRole::Working, 64).unwrap();
        let scratch = context.allocate(BufferRole::Scratch, 64).unwrap();

        let device = context
            .compute_pearsons_correlation(
                candidate_buffer,
                target_buffer,
                profile.deviation_sqrt,
                working,
                scratch,
            )
            .unwrap();

        assert!((host - device).abs() < 1e-4, "host {} device {}", host, device);
        assert_eq!(context.read_buffer(candidate_buffer).unwrap(), candidate);
    }

    #[test]
    fn test_crossover_on_generation_pool() {
        let context = AcceleratorContext::software().unwrap();
        let pool = context
            .upload(BufferRole::GenerationPool, &[1.0, 1.0, 2.0, 2.0])
            .unwrap();
        context.perform_crossover(pool, 1, 2).unwrap();
        assert_eq!(context.read_buffer(pool).unwrap(), vec![1.0, 2.0, 2.0, 1.0]);
    }
}
