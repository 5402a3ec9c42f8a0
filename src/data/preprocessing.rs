//! Turns raw ACC/HR recordings into the aligned, normalized, power-of-two
//! padded vectors the search works on.

use super::connectors::CsvConnector;
use super::subjects::SubjectFiles;
use crate::config::PreprocessingConfig;
use crate::error::{CorrelationError, Result};
use crate::types::{
    SubjectSignals, ACC_MAX_VALUE, ACC_SAMPLE_FREQ, HR_MAX_VALUE, HR_SAMPLE_FREQ,
    MIN_LANE_VECTOR_LEN,
};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::path::Path;

/// Raw accelerometer recording: first timestamp and one column per axis.
#[derive(Debug, Clone)]
pub struct AccRecording {
    pub start: NaiveDateTime,
    pub axes: [Vec<f32>; 3],
}

/// Raw heart-rate recording.
#[derive(Debug, Clone)]
pub struct HrRecording {
    pub start: NaiveDateTime,
    pub values: Vec<f32>,
}

pub fn parse_timestamp(text: &str, format: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, format).map_err(|e| {
        CorrelationError::DataLoading(format!("Could not parse timestamp {:?}: {}", text, e))
    })
}

/// `datetime,acc_x,acc_y,acc_z`
pub fn read_acc(path: &Path, datetime_format: &str) -> Result<AccRecording> {
    log::info!("Beginning parsing file {}", path.display());
    let df = CsvConnector::load(path)?;
    CsvConnector::require_columns(&df, 4, "datetime,acc_x,acc_y,acc_z")?;

    let start = parse_timestamp(&CsvConnector::first_text(&df, 0)?, datetime_format)?;
    let axes = [
        CsvConnector::float_column(&df, 1)?,
        CsvConnector::float_column(&df, 2)?,
        CsvConnector::float_column(&df, 3)?,
    ];
    log::info!("Parsed {} lines from {}", df.height(), path.display());

    Ok(AccRecording { start, axes })
}

/// `datetime,hr`
pub fn read_hr(path: &Path, datetime_format: &str) -> Result<HrRecording> {
    log::info!("Beginning parsing file {}", path.display());
    let df = CsvConnector::load(path)?;
    CsvConnector::require_columns(&df, 2, "datetime,hr")?;

    let start = parse_timestamp(&CsvConnector::first_text(&df, 0)?, datetime_format)?;
    let values = CsvConnector::float_column(&df, 1)?;
    log::info!("Parsed {} lines from {}", df.height(), path.display());

    Ok(HrRecording { start, values })
}

/// Seconds the ACC recording starts after the HR recording (negative when it
/// starts first), rounded away from zero to a whole number of periods.
pub fn timestamp_lead(acc_start: NaiveDateTime, hr_start: NaiveDateTime, period_size: usize) -> i64 {
    let diff = (acc_start - hr_start).num_seconds();
    let period = period_size.max(1) as i64;
    let magnitude = diff.abs();
    let rounded = match magnitude % period {
        0 => magnitude,
        remainder => magnitude + period - remainder,
    };
    rounded * diff.signum()
}

/// Rows to drop from the front of each stream so both start at the same second.
/// The stream that started earlier is the one that skips.
pub fn rows_to_skip(lead_seconds: i64) -> (usize, usize) {
    let seconds = lead_seconds.unsigned_abs() as usize;
    if lead_seconds > 0 {
        (0, seconds * HR_SAMPLE_FREQ)
    } else {
        (seconds * ACC_SAMPLE_FREQ, 0)
    }
}

/// Sum every window of `ACC_SAMPLE_FREQ * period` samples (the last one may be
/// partial) and scale by `window * ACC_MAX_VALUE`.
pub fn normalize_acc(values: &[f32], period_size: usize) -> Vec<f32> {
    let window = ACC_SAMPLE_FREQ * period_size.max(1);
    let scale = window as f32 * ACC_MAX_VALUE;
    values
        .par_chunks(window)
        .map(|chunk| chunk.iter().sum::<f32>() / scale)
        .collect()
}

/// Sum every full window of `period` samples and scale by `period * HR_MAX_VALUE`.
pub fn normalize_hr(values: &[f32], period_size: usize) -> Vec<f32> {
    let window = HR_SAMPLE_FREQ * period_size.max(1);
    let scale = window as f32 * HR_MAX_VALUE;
    values
        .par_chunks_exact(window)
        .map(|chunk| chunk.iter().sum::<f32>() / scale)
        .collect()
}

/// Extend `vector` to `target_len` with values linearly interpolated across
/// the original samples. Returns the number of appended values.
pub fn interpolate_linear(vector: &mut Vec<f32>, target_len: usize) -> Result<usize> {
    let old_len = vector.len();
    if old_len == 0 {
        return Err(CorrelationError::EmptyInput);
    }
    if target_len <= old_len {
        return Ok(0);
    }

    let padding = target_len - old_len;
    let last = old_len - 1;
    vector.reserve_exact(padding);
    for i in 0..padding {
        let t = if padding > 1 {
            i as f32 / (padding - 1) as f32
        } else {
            0.0
        };
        let position = t * last as f32;
        let index = (position as usize).min(last);
        let next = (index + 1).min(last);
        let fraction = position - index as f32;
        let value = vector[index] + fraction * (vector[next] - vector[index]);
        vector.push(value);
    }

    Ok(padding)
}

/// Common padded length for vectors of the given lengths.
pub fn padded_len(lengths: impl IntoIterator<Item = usize>) -> usize {
    lengths
        .into_iter()
        .fold(MIN_LANE_VECTOR_LEN, usize::max)
        .next_power_of_two()
}

/// Read, synchronize, normalize and align one subject.
pub fn preprocess_subject(files: &SubjectFiles, config: &PreprocessingConfig) -> Result<SubjectSignals> {
    let acc = read_acc(&files.acc_path, &config.datetime_format)?;
    let hr = read_hr(&files.hr_path, &config.datetime_format)?;
    align_recordings(files.id, acc, hr, config.period_size)
}

/// Synchronize, normalize and pad already-loaded recordings.
pub fn align_recordings(
    subject_id: usize,
    acc: AccRecording,
    hr: HrRecording,
    period_size: usize,
) -> Result<SubjectSignals> {
    let lead = timestamp_lead(acc.start, hr.start, period_size);
    log::info!("Timestamp difference calculated: {}", lead);

    let (acc_skip, hr_skip) = rows_to_skip(lead);
    if acc_skip > 0 {
        log::info!("ACC measurements are ahead by {} lines, skipping", acc_skip);
    }
    if hr_skip > 0 {
        log::info!("HR measurements are ahead by {} lines, skipping", hr_skip);
    }

    let mut axes = acc.axes.map(|axis| normalize_acc(axis.get(acc_skip..).unwrap_or(&[]), period_size));
    let mut hr_values = normalize_hr(hr.values.get(hr_skip..).unwrap_or(&[]), period_size);

    if axes.iter().any(Vec::is_empty) || hr_values.is_empty() {
        return Err(CorrelationError::DataLoading(format!(
            "Subject {:03} has no overlapping samples",
            subject_id
        )));
    }

    let target_len = padded_len(axes.iter().map(Vec::len).chain([hr_values.len()]));
    for axis in axes.iter_mut() {
        interpolate_linear(axis, target_len)?;
    }
    interpolate_linear(&mut hr_values, target_len)?;
    log::debug!("Subject {:03} padded to {} samples", subject_id, target_len);

    Ok(SubjectSignals {
        subject_id,
        acc: axes,
        hr: hr_values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> NaiveDateTime {
        parse_timestamp(text, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_timestamp_lead_rounds_to_period() {
        let hr = at("2023-05-01 10:00:00");
        assert_eq!(timestamp_lead(at("2023-05-01 10:00:07"), hr, 1), 7);
        assert_eq!(timestamp_lead(at("2023-05-01 10:00:07"), hr, 5), 10);
        assert_eq!(timestamp_lead(at("2023-05-01 09:59:53"), hr, 5), -10);
        assert_eq!(timestamp_lead(hr, hr, 5), 0);
    }

    #[test]
    fn test_earlier_stream_skips() {
        assert_eq!(rows_to_skip(3), (0, 3));
        assert_eq!(rows_to_skip(-2), (64, 0));
        assert_eq!(rows_to_skip(0), (0, 0));
    }

    #[test]
    fn test_normalize_windows() {
        let acc = vec![127.0; 80];
        let normalized = normalize_acc(&acc, 1);
        // Two full windows and one partial window of 16 samples
        assert_eq!(normalized, vec![1.0, 1.0, 0.5]);

        let hr = vec![255.0, 0.0, 255.0, 255.0, 100.0];
        assert_eq!(normalize_hr(&hr, 2), vec![0.5, 1.0]);
    }

    #[test]
    fn test_interpolation_pads_to_power_of_two() {
        let mut values = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let target = padded_len([values.len(), 20]);
        assert_eq!(target, 32);

        let added = interpolate_linear(&mut values, target).unwrap();
        assert_eq!(added, 27);
        assert_eq!(values.len(), 32);
        assert_eq!(values[5], 0.0);
        assert_eq!(values[31], 4.0);
        assert!(values[5..].windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_interpolation_single_padding_and_empty() {
        let mut values = vec![2.0, 3.0, 5.0];
        assert_eq!(interpolate_linear(&mut values, 4).unwrap(), 1);
        assert_eq!(values, vec![2.0, 3.0, 5.0, 2.0]);

        let mut empty: Vec<f32> = Vec::new();
        assert!(matches!(interpolate_linear(&mut empty, 16), Err(CorrelationError::EmptyInput)));
    }

    #[test]
    fn test_align_recordings() {
        let acc = AccRecording {
            start: at("2023-05-01 10:00:00"),
            axes: [vec![127.0; 32 * 22], vec![-127.0; 32 * 22], vec![0.0; 32 * 22]],
        };
        let hr = HrRecording {
            start: at("2023-05-01 10:00:02"),
            values: vec![255.0; 20],
        };

        let signals = align_recordings(3, acc, hr, 1).unwrap();
        assert_eq!(signals.subject_id, 3);
        assert_eq!(signals.hr.len(), 32);
        assert!(signals.acc.iter().all(|axis| axis.len() == 32));
        assert_eq!(signals.acc[0][0], 1.0);
        assert_eq!(signals.acc[1][0], -1.0);
        assert_eq!(signals.hr[0], 1.0);
    }
}
