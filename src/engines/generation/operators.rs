use crate::engines::accelerator::kernels::{OP_ADD, OP_DIV, OP_SUB};
use crate::types::{TREE_NODE_SIZE, VARIABLE_SENTINEL};
use rand::Rng;

/// Random operator code in `1..=4`
pub fn random_operator<R: Rng>(rng: &mut R) -> f32 {
    rng.gen_range(OP_ADD as u32..=OP_DIV as u32) as f32
}

/// Random literal in `[0, operand_max)`
pub fn random_operand<R: Rng>(operand_max: f32, rng: &mut R) -> f32 {
    rng.gen_range(0.0..operand_max)
}

/// Re-randomize one encoded node: fresh operator, coin flip between the
/// variable and a literal on the left, literal on the right.
pub fn randomize_node<R: Rng>(node: &mut [f32], operand_max: f32, rng: &mut R) {
    node[0] = random_operator(rng);
    node[1] = if rng.gen_bool(0.5) {
        VARIABLE_SENTINEL
    } else {
        random_operand(operand_max, rng)
    };
    node[2] = random_operand(operand_max, rng);
}

/// Seed the root node of the individual at population `index`:
/// `x + c` for even indices and `x - c` for odd ones.
pub fn seed_root<R: Rng>(individual: &mut [f32], index: usize, operand_max: f32, rng: &mut R) {
    individual[0] = if index % 2 == 0 { OP_ADD } else { OP_SUB };
    individual[1] = VARIABLE_SENTINEL;
    individual[2] = random_operand(operand_max, rng);
}

/// Re-randomize every node starting at `frontier`; earlier nodes stay frozen.
pub fn mutate_from<R: Rng>(individual: &mut [f32], frontier: usize, operand_max: f32, rng: &mut R) {
    if frontier >= individual.len() {
        return;
    }
    for node in individual[frontier..].chunks_exact_mut(TREE_NODE_SIZE) {
        randomize_node(node, operand_max, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mutate_from_keeps_frozen_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut individual = vec![OP_ADD, VARIABLE_SENTINEL, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        mutate_from(&mut individual, 3, 0.5, &mut rng);

        assert_eq!(&individual[..3], &[OP_ADD, VARIABLE_SENTINEL, 0.1]);
        for node in individual[3..].chunks_exact(3) {
            assert!((1.0..=4.0).contains(&node[0]));
            assert!(node[1] == VARIABLE_SENTINEL || (0.0..0.5).contains(&node[1]));
            assert!((0.0..0.5).contains(&node[2]));
        }
    }

    #[test]
    fn test_seed_root_alternates_operator() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut even = vec![0.0; 3];
        let mut odd = vec![0.0; 3];
        seed_root(&mut even, 0, 0.5, &mut rng);
        seed_root(&mut odd, 1, 0.5, &mut rng);

        assert_eq!(even[0], OP_ADD);
        assert_eq!(odd[0], OP_SUB);
        assert_eq!(even[1], VARIABLE_SENTINEL);
        assert!(even[2] >= 0.0 && even[2] < 0.5);
    }
}
