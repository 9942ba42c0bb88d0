use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Information,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Information => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: OffsetDateTime,
    pub data: Option<BTreeMap<String, String>>,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = self.timestamp.format(&Rfc3339).map_err(|_| fmt::Error)?;
        write!(f, "{stamp} [{}] {}", self.level, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub path: String,
    pub message: String,
}

impl ProgressEvent {
    /// Completed fraction in `[0, 1]`; `0.0` for an empty batch.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f64 / self.total as f64
    }
}

/// Fan-out to any number of channel subscribers. Emission never blocks and
/// subscribers that dropped their receiver are pruned on the next emit.
pub struct Broadcast<T> {
    senders: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> Broadcast<T> {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded();
        self.senders.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: T) {
        let mut senders = self.senders.lock();
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().len()
    }
}

impl<T: Clone> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Log and progress streams of one service instance.
#[derive(Default)]
pub struct EventHub {
    logs: Broadcast<LogEvent>,
    progress: Broadcast<ProgressEvent>,
}

impl EventHub {
    pub fn subscribe_logs(&self) -> Receiver<LogEvent> {
        self.logs.subscribe()
    }

    pub fn subscribe_progress(&self) -> Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_with(level, message, None);
    }

    /// Writes to `tracing` at the matching level, then to subscribers.
    pub fn log_with(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<BTreeMap<String, String>>,
    ) {
        let message = message.into();
        match level {
            LogLevel::Trace => trace!("{message}"),
            LogLevel::Debug => debug!("{message}"),
            LogLevel::Information => info!("{message}"),
            LogLevel::Warning => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
        self.logs.emit(LogEvent {
            level,
            message,
            timestamp: OffsetDateTime::now_utc(),
            data,
        });
    }

    pub fn progress(&self, event: ProgressEvent) {
        self.progress.emit(event);
    }
}
