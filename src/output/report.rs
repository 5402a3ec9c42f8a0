use crate::error::Result;
use crate::types::AxisResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Summary of a whole run, written as JSON next to the plots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: String,
    pub period_size: usize,
    pub device: String,
    pub subjects_found: usize,
    pub subjects_failed: Vec<usize>,
    pub results: Vec<AxisResult>,
}

impl RunReport {
    pub fn new(period_size: usize, device: impl Into<String>) -> Self {
        Self {
            started_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            period_size,
            device: device.into(),
            subjects_found: 0,
            subjects_failed: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Axis results where an improving expression was found.
    pub fn found(&self) -> impl Iterator<Item = &AxisResult> {
        self.results.iter().filter(|r| r.best_correlation.is_some())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
