use super::traits::ConfigSection;
use crate::error::{CorrelationError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    pub write_plots: bool,
    /// Plot every n-th sample.
    pub downscale: usize,
    pub plot_height: usize,
    pub write_report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            write_plots: true,
            downscale: 10,
            plot_height: 2000,
            write_report: true,
        }
    }
}

impl ConfigSection for OutputConfig {
    fn section_name() -> &'static str {
        "output"
    }

    fn validate(&self) -> Result<()> {
        if self.downscale == 0 {
            return Err(CorrelationError::Configuration(
                "Plot downscale must be at least 1".to_string(),
            ));
        }
        if self.plot_height < 100 {
            return Err(CorrelationError::Configuration(
                "Plot height must be at least 100".to_string(),
            ));
        }
        Ok(())
    }
}
