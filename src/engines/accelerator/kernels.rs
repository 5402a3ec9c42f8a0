//! Kernel bodies of the accelerator program.
//!
//! Each function is one kernel: the work-item decomposition is expressed with
//! rayon parallel iterators, one item per output element (or per block, for
//! the reduction and crossover kernels).

use super::device::KernelLaunch;
use crate::error::{CorrelationError, Result};
use crate::types::{TREE_NODE_SIZE, VARIABLE_SENTINEL};
use rayon::prelude::*;

pub const OP_ADD: f32 = 1.0;
pub const OP_SUB: f32 = 2.0;
pub const OP_MUL: f32 = 3.0;
pub const OP_DIV: f32 = 4.0;

/// Run one launch to completion.
pub fn execute(launch: KernelLaunch<'_>) -> Result<()> {
    match launch {
        KernelLaunch::Fill { buffer, value } => {
            fill_buffer(buffer, value);
            Ok(())
        }
        KernelLaunch::Copy { from, to } => copy_buffer(from, to),
        KernelLaunch::PrefixSumStep { vector, block } => parallel_prefix_sum(vector, block),
        KernelLaunch::CorrelationTerms {
            nominator,
            deviation_squares,
            target_deviations,
            mean,
        } => calculate_correlation_acc_values(nominator, deviation_squares, target_deviations, mean),
        KernelLaunch::GenerateValues {
            individual,
            input,
            output,
        } => generate_hr_values(individual, input, output),
        KernelLaunch::Crossover {
            generation,
            crossover_point,
            individual_size,
        } => perform_crossover(generation, crossover_point, individual_size),
    }
}

pub fn fill_buffer(buffer: &mut [f32], value: f32) {
    buffer.par_iter_mut().for_each(|slot| *slot = value);
}

pub fn copy_buffer(from: &[f32], to: &mut [f32]) -> Result<()> {
    if from.len() != to.len() {
        return Err(CorrelationError::fault(format!(
            "copy range mismatch ({} -> {})",
            from.len(),
            to.len()
        )));
    }
    to.par_iter_mut()
        .zip(from.par_iter())
        .for_each(|(dst, src)| *dst = *src);
    Ok(())
}

/// One step of the in-place upward sweep.
///
/// The vector is split into blocks of `block` elements; each work item adds
/// the last element of its block's first half into the block's last element.
/// Running the step for `block = 2, 4, ..., N` leaves the total in `vector[N - 1]`.
pub fn parallel_prefix_sum(vector: &mut [f32], block: usize) -> Result<()> {
    if block < 2 || !block.is_power_of_two() || vector.len() % block != 0 {
        return Err(CorrelationError::fault(format!(
            "prefix sum step {} does not tile a vector of {}",
            block,
            vector.len()
        )));
    }
    let half = block / 2;
    vector
        .par_chunks_exact_mut(block)
        .for_each(|chunk| chunk[block - 1] += chunk[half - 1]);
    Ok(())
}

/// `nominator` holds the candidate values on entry and the Pearson nominator
/// terms on exit; `deviation_squares` receives the squared candidate deviations.
pub fn calculate_correlation_acc_values(
    nominator: &mut [f32],
    deviation_squares: &mut [f32],
    target_deviations: &[f32],
    mean: f32,
) -> Result<()> {
    if nominator.len() != deviation_squares.len() || nominator.len() != target_deviations.len() {
        return Err(CorrelationError::fault(format!(
            "correlation buffers differ in size ({}, {}, {})",
            nominator.len(),
            deviation_squares.len(),
            target_deviations.len()
        )));
    }
    nominator
        .par_iter_mut()
        .zip(deviation_squares.par_iter_mut())
        .zip(target_deviations.par_iter())
        .for_each(|((value, square), target_dev)| {
            let dev = *value - mean;
            *value = dev * target_dev;
            *square = dev * dev;
        });
    Ok(())
}

pub fn generate_hr_values(individual: &[f32], input: &[f32], output: &mut [f32]) -> Result<()> {
    if input.len() != output.len() {
        return Err(CorrelationError::fault(format!(
            "generated values buffer holds {} values, input has {}",
            output.len(),
            input.len()
        )));
    }
    output
        .par_iter_mut()
        .zip(input.par_iter())
        .for_each(|(out, x)| *out = evaluate_sample(individual, *x));
    Ok(())
}

/// Value of one `(op, a, b)` triple: `a op b` with the sample `x` standing in
/// for the variable sentinel. Unknown operators yield the left operand.
pub fn evaluate_node(node: &[f32], x: f32) -> f32 {
    let lhs = if node[1] == VARIABLE_SENTINEL { x } else { node[1] };
    let rhs = node[2];
    match node[0] {
        op if op == OP_ADD => lhs + rhs,
        op if op == OP_SUB => lhs - rhs,
        op if op == OP_MUL => lhs * rhs,
        op if op == OP_DIV => lhs / rhs,
        _ => lhs,
    }
}

/// Evaluate one encoded individual for a single input sample.
///
/// The result is the mean of every triple's value, accumulated incrementally
/// from `x` so that a tree of identity terms reproduces `x` exactly. Division
/// follows IEEE semantics, so non-finite terms poison the mean.
pub fn evaluate_sample(individual: &[f32], x: f32) -> f32 {
    individual
        .chunks_exact(TREE_NODE_SIZE)
        .enumerate()
        .fold(x, |mean, (k, node)| {
            mean + (evaluate_node(node, x) - mean) / (k + 1) as f32
        })
}

/// Swap the tails (from `crossover_point`) of every adjacent pair of individuals.
pub fn perform_crossover(
    generation: &mut [f32],
    crossover_point: usize,
    individual_size: usize,
) -> Result<()> {
    if individual_size == 0 || crossover_point > individual_size {
        return Err(CorrelationError::fault(format!(
            "crossover point {} outside individual of {}",
            crossover_point, individual_size
        )));
    }
    generation
        .par_chunks_exact_mut(2 * individual_size)
        .for_each(|pair| {
            let (first, second) = pair.split_at_mut(individual_size);
            first[crossover_point..].swap_with_slice(&mut second[crossover_point..]);
        });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_sum_leaves_total_last() {
        let mut values: Vec<f32> = (1..=8).map(|v| v as f32).collect();
        for step in 0..3 {
            parallel_prefix_sum(&mut values, 1 << (step + 1)).unwrap();
        }
        assert_eq!(values[7], 36.0);
        // Partial sums of the left halves stay behind in place
        assert_eq!(values[3], 10.0);
        assert_eq!(values[1], 3.0);
    }

    #[test]
    fn test_prefix_sum_rejects_untiled_block() {
        let mut values = vec![1.0f32; 6];
        assert!(parallel_prefix_sum(&mut values, 4).is_err());
    }

    #[test]
    fn test_evaluate_sample_chain() {
        // ((x + 0.5) + (x * 2)) / 2
        let genes = [OP_ADD, VARIABLE_SENTINEL, 0.5, OP_MUL, VARIABLE_SENTINEL, 2.0];
        assert_eq!(evaluate_sample(&genes, 1.0), 1.75);

        // A literal term shifts the mean but keeps the earlier terms
        let genes = [OP_ADD, VARIABLE_SENTINEL, 0.5, OP_SUB, 3.0, 1.0];
        assert_eq!(evaluate_sample(&genes, 1.0), 1.75);
        assert_eq!(evaluate_sample(&genes, 3.0), 2.75);

        // Identity terms reproduce the input exactly
        let genes = [OP_ADD, VARIABLE_SENTINEL, 0.0].repeat(10);
        for x in [0.1f32, 0.337, -4.2, 1e-3] {
            assert_eq!(evaluate_sample(&genes, x), x);
        }
    }

    #[test]
    fn test_division_by_zero_propagates() {
        let genes = [OP_DIV, VARIABLE_SENTINEL, 0.0];
        assert!(evaluate_sample(&genes, 1.0).is_infinite());
        assert!(evaluate_sample(&genes, 0.0).is_nan());
    }

    #[test]
    fn test_crossover_swaps_pairs() {
        let mut generation = vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 4.0];
        perform_crossover(&mut generation, 1, 3).unwrap();
        assert_eq!(
            generation,
            vec![1.0, 2.0, 2.0, 2.0, 1.0, 1.0, 3.0, 4.0, 4.0, 4.0, 3.0, 3.0]
        );
    }
}
