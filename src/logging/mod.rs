//! Process-wide logger: `env_logger` records go to stderr and, optionally,
//! to a timestamped file under the configured log directory.

use crate::config::LoggingConfig;
use crate::error::{CorrelationError, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type SharedFile = Arc<Mutex<Option<BufWriter<File>>>>;

/// Writes every record to stderr and to the log file, if one is open.
struct TeeWriter {
    file: SharedFile,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                file.write_all(buf)?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                file.flush()?;
            }
        }
        Ok(())
    }
}

/// Keeps the log file open; flushes it when dropped.
pub struct LogGuard {
    file: SharedFile,
    path: Option<PathBuf>,
}

impl LogGuard {
    pub fn log_file(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        log::logger().flush();
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// `log_<day>-<month>_<year>_<hour>-<minute>-<second>.txt`
pub fn log_file_name(time: &chrono::DateTime<chrono::Local>) -> String {
    time.format("log_%-d-%-m_%Y_%-H-%-M-%-S.txt").to_string()
}

/// Install the global logger. Can succeed only once per process.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let level = config.level_filter()?;

    let (file, path) = if config.file_output {
        open_log_file(&config.log_dir)
    } else {
        (None, None)
    };
    let file: SharedFile = Arc::new(Mutex::new(file));

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(TeeWriter { file: file.clone() })))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}]: {}: {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| CorrelationError::Configuration(format!("Logger already installed: {}", e)))?;

    if let Some(path) = &path {
        log::debug!("Logging into {}", path.display());
    }

    Ok(LogGuard { file, path })
}

/// A missing log directory only disables file output.
fn open_log_file(dir: &Path) -> (Option<BufWriter<File>>, Option<PathBuf>) {
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("Log directory {} could not be created: {}", dir.display(), e);
        return (None, None);
    }

    let path = dir.join(log_file_name(&chrono::Local::now()));
    match fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => (Some(BufWriter::new(file)), Some(path)),
        Err(e) => {
            eprintln!("Log file {} could not be opened: {}", path.display(), e);
            (None, None)
        }
    }
}
