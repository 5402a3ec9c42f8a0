use super::individual::{Individual, Node, Operand, Operator};
use super::operators::{mutate_from, seed_root};
use crate::error::{CorrelationError, Result};
use crate::types::TREE_NODE_SIZE;
use rand::Rng;

/// All individuals of one generation, stored back to back.
#[derive(Debug, Clone)]
pub struct Population {
    genes: Vec<f32>,
    individual_size: usize,
    size: usize,
}

impl Population {
    /// Seeded roots with alternating ADD/SUB, every other node `x + 0`.
    pub fn initialize<R: Rng>(
        size: usize,
        individual_size: usize,
        operand_max: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if size == 0 {
            return Err(CorrelationError::EmptyInput);
        }
        if individual_size == 0 || individual_size % TREE_NODE_SIZE != 0 {
            return Err(CorrelationError::invalid_size(
                individual_size,
                "individual size must be a positive multiple of the node size",
            ));
        }

        let filler = Node::new(Operator::Add, Operand::Variable, 0.0).encode();
        let mut genes = Vec::with_capacity(size * individual_size);
        for _ in 0..size * individual_size / TREE_NODE_SIZE {
            genes.extend_from_slice(&filler);
        }

        let mut population = Self {
            genes,
            individual_size,
            size,
        };
        for index in 0..size {
            seed_root(population.individual_mut(index), index, operand_max, rng);
        }
        Ok(population)
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn individual_size(&self) -> usize {
        self.individual_size
    }

    pub fn individual(&self, index: usize) -> &[f32] {
        let start = index * self.individual_size;
        &self.genes[start..start + self.individual_size]
    }

    pub fn individual_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.individual_size;
        &mut self.genes[start..start + self.individual_size]
    }

    /// Re-randomize individual `index` from the frontier onward.
    pub fn mutate_individual<R: Rng>(
        &mut self,
        index: usize,
        frontier: usize,
        operand_max: f32,
        rng: &mut R,
    ) {
        mutate_from(self.individual_mut(index), frontier, operand_max, rng);
    }

    pub fn to_individual(&self, index: usize) -> Result<Individual> {
        Individual::from_genes(self.individual(index).to_vec())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.genes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::accelerator::kernels::{OP_ADD, OP_SUB};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_initialize_population_layout() {
        let mut rng = StdRng::seed_from_u64(3);
        let population = Population::initialize(4, 9, 0.5, &mut rng).unwrap();

        assert_eq!(population.len(), 4);
        assert_eq!(population.as_slice().len(), 36);
        assert_eq!(population.individual(0)[0], OP_ADD);
        assert_eq!(population.individual(1)[0], OP_SUB);
        assert_eq!(population.individual(2)[0], OP_ADD);

        // Non-root nodes start as identity nodes
        let individual = population.to_individual(3).unwrap();
        let root = 1.0 - population.individual(3)[2];
        assert!((individual.evaluate(1.0) - (root + 2.0) / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_mutated_candidates_follow_the_input() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut population = Population::initialize(100, 30, 0.5, &mut rng).unwrap();
        let input: Vec<f32> = (0..64).map(|i| ((i as f32) * 0.3).sin() * 0.4 + 0.5).collect();

        let mut usable = 0;
        for index in 0..population.len() {
            population.mutate_individual(index, 3, 0.5, &mut rng);
            let individual = population.to_individual(index).unwrap();
            let values: Vec<f32> = input.iter().map(|x| individual.evaluate(*x)).collect();

            let finite = values.iter().all(|v| v.is_finite());
            let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
            let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            if finite && max > min {
                usable += 1;
            }
        }

        // Frozen roots keep every candidate a function of x
        assert!(usable >= 90, "only {} of 100 candidates vary with the input", usable);
    }

    #[test]
    fn test_initialize_rejects_bad_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(Population::initialize(0, 30, 0.5, &mut rng).is_err());
        assert!(Population::initialize(10, 10, 0.5, &mut rng).is_err());
    }
}
