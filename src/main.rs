use anyhow::Context;
use hrcorr::config::ConfigManager;
use hrcorr::logging::init_logging;
use hrcorr::services::CorrelationRunner;
use std::path::PathBuf;

/// Usage: `hrcorr [period_size] [config.toml]`
fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let period_arg = args.next();
    let config_path = args.next().map(PathBuf::from);

    let manager = ConfigManager::new();
    manager
        .load(config_path.as_deref())
        .context("Failed to load configuration")?;
    let mut config = manager.get()?;

    let _log_guard = init_logging(&config.logging).context("Failed to initialize logging")?;
    log::info!("hrcorr {} - heart rate correlation finder", env!("CARGO_PKG_VERSION"));

    if let Some(arg) = period_arg {
        config.preprocessing.apply_period_arg(&arg);
    }

    let runner = CorrelationRunner::new(config).context("Failed to set up the device")?;
    let report = runner.run_all().context("Run failed")?;

    log::info!(
        "Finished: {} of {} axis searches found an expression, {} subject(s) failed",
        report.found().count(),
        report.results.len(),
        report.subjects_failed.len()
    );

    Ok(())
}
