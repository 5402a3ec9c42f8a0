use crate::types::TREE_NODE_SIZE;

/// Index (in values, always a multiple of the node size) of the first node
/// that is re-randomized each generation. Nodes before it are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationFrontier {
    index: usize,
    individual_size: usize,
}

impl MutationFrontier {
    /// Starts one node past the root.
    pub fn new(individual_size: usize) -> Self {
        Self {
            index: TREE_NODE_SIZE,
            individual_size,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Move one node toward the tail after an improving generation, one node
    /// toward the root otherwise. The root is never unfrozen and the frontier
    /// never reaches the last value of the individual.
    pub fn adapt(&mut self, improved: bool) {
        if improved {
            let next = self.index + TREE_NODE_SIZE;
            if next < self.individual_size.saturating_sub(1) {
                self.index = next;
            }
        } else if self.index > TREE_NODE_SIZE {
            self.index -= TREE_NODE_SIZE;
        }
    }
}
