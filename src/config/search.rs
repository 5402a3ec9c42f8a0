use super::traits::ConfigSection;
use crate::engines::reduction::HostReduction;
use crate::error::{CorrelationError, Result};
use crate::types::TREE_NODE_SIZE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Values per individual; a multiple of the node size.
    pub individual_size: usize,
    /// Exclusive upper bound of random literals.
    pub operand_max: f32,
    /// Host reduction used for the initial correlation.
    pub baseline_reduction: HostReduction,
    pub seed: Option<u64>,
    /// Worker threads of the software device; `None` shares the global pool.
    pub device_threads: Option<usize>,
    /// Generations between progress log lines.
    pub progress_interval: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 100,
            individual_size: 30,
            operand_max: 0.5,
            baseline_reduction: HostReduction::Lanes,
            seed: None,
            device_threads: None,
            progress_interval: 10,
        }
    }
}

impl ConfigSection for SearchConfig {
    fn section_name() -> &'static str {
        "search"
    }

    fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(CorrelationError::Configuration(
                "Population size must be at least 1".to_string(),
            ));
        }
        if self.generations == 0 {
            return Err(CorrelationError::Configuration(
                "At least one generation is required".to_string(),
            ));
        }
        if self.individual_size < TREE_NODE_SIZE || self.individual_size % TREE_NODE_SIZE != 0 {
            return Err(CorrelationError::Configuration(format!(
                "Individual size must be a positive multiple of {}",
                TREE_NODE_SIZE
            )));
        }
        if !(self.operand_max > 0.0 && self.operand_max.is_finite()) {
            return Err(CorrelationError::Configuration(
                "Operand bound must be a positive finite number".to_string(),
            ));
        }
        if self.device_threads == Some(0) {
            return Err(CorrelationError::Configuration(
                "Device thread count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
