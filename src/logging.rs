use crate::events::LogLevel;
use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Installs the fmt subscriber at debug level when `verbose` is set.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    init_with_level(LogLevel::Debug)
}

/// A subscriber already installed by the host application is left alone.
pub fn init_with_level(level: LogLevel) -> Result<()> {
    let _ = fmt()
        .with_max_level(tracing_level(level))
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}

fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Information => Level::INFO,
        LogLevel::Warning => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}
