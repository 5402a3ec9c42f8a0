use crate::error::{CorrelationError, Result};
use polars::prelude::*;
use std::path::Path;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file (with header line) into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| CorrelationError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Fail unless the frame has at least `min` columns; `layout` names the expected ones.
    pub fn require_columns(df: &DataFrame, min: usize, layout: &str) -> Result<()> {
        if df.width() < min {
            return Err(CorrelationError::DataLoading(format!(
                "Expected columns {}, found {}",
                layout,
                df.width()
            )));
        }
        if df.height() == 0 {
            return Err(CorrelationError::DataLoading("File has no data rows".to_string()));
        }
        Ok(())
    }

    /// Column at `index` as `f32` values; nulls are rejected.
    pub fn float_column(df: &DataFrame, index: usize) -> Result<Vec<f32>> {
        let column = df.select_at_idx(index).ok_or_else(|| {
            CorrelationError::DataLoading(format!("Missing column {}", index))
        })?;
        let values = column.cast(&DataType::Float32)?;
        let name = values.name().to_string();

        values
            .f32()?
            .into_iter()
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| {
                CorrelationError::DataLoading(format!("Column {} holds unparsable values", name))
            })
    }

    /// First cell of the column at `index`, as text.
    pub fn first_text(df: &DataFrame, index: usize) -> Result<String> {
        let column = df.select_at_idx(index).ok_or_else(|| {
            CorrelationError::DataLoading(format!("Missing column {}", index))
        })?;
        let text = column.cast(&DataType::String)?;
        text.str()?
            .get(0)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| CorrelationError::DataLoading("First timestamp is empty".to_string()))
    }
}
