use super::traits::ConfigSection;
use crate::error::{CorrelationError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest accepted normalization period, in seconds.
pub const MAX_PERIOD_SIZE: usize = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub resource_dir: PathBuf,
    pub subject_count: usize,
    /// Seconds of signal folded into one normalized sample.
    pub period_size: usize,
    pub datetime_format: String,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("resources"),
            subject_count: 16,
            period_size: 1,
            datetime_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl PreprocessingConfig {
    /// Apply a period given on the command line, falling back to 1 when out of range.
    pub fn apply_period_arg(&mut self, arg: &str) {
        match arg.trim().parse::<usize>() {
            Ok(period) if (1..=MAX_PERIOD_SIZE).contains(&period) => self.period_size = period,
            Ok(period) => {
                log::warn!(
                    "Period size {} outside 1..={}, falling back to 1",
                    period,
                    MAX_PERIOD_SIZE
                );
                self.period_size = 1;
            }
            Err(_) => {
                log::warn!("Could not parse period size {:?}, falling back to 1", arg);
                self.period_size = 1;
            }
        }
    }
}

impl ConfigSection for PreprocessingConfig {
    fn section_name() -> &'static str {
        "preprocessing"
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_PERIOD_SIZE).contains(&self.period_size) {
            return Err(CorrelationError::Configuration(format!(
                "Period size must be between 1 and {}",
                MAX_PERIOD_SIZE
            )));
        }
        if self.subject_count == 0 || self.subject_count > 999 {
            return Err(CorrelationError::Configuration(
                "Subject count must be between 1 and 999".to_string(),
            ));
        }
        if self.datetime_format.is_empty() {
            return Err(CorrelationError::Configuration(
                "Datetime format must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
