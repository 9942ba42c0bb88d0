use crate::error::{OcrError, Result};
use crate::events::{EventHub, LogLevel, ProgressEvent};
use crate::ocr::OcrResult;
use crate::settings::BatchSettings;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// `None` uses half the available cores, at least one.
    pub max_parallelism: Option<NonZeroUsize>,
    pub enable_smart_scheduling: bool,
    /// Files at or above this size in bytes are scheduled first.
    pub large_file_threshold: u64,
    pub cancellation: CancellationToken,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_settings(&BatchSettings::default())
    }
}

impl BatchOptions {
    pub fn from_settings(settings: &BatchSettings) -> Self {
        Self {
            max_parallelism: settings.max_parallelism,
            enable_smart_scheduling: settings.smart_scheduling,
            large_file_threshold: settings.large_file_threshold,
            cancellation: CancellationToken::new(),
        }
    }

    /// Zero selects the default.
    pub fn with_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = NonZeroUsize::new(max_parallelism);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn actual_parallelism(&self) -> usize {
        self.max_parallelism
            .map_or_else(|| (num_cpus::get() / 2).max(1), NonZeroUsize::get)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScheduledItem {
    pub index: usize,
    pub size: u64,
}

/// Large files by descending size, then small files by descending size.
/// Sizes that cannot be read count as zero.
pub(crate) fn order_by_size(paths: &[PathBuf], large_file_threshold: u64) -> Vec<ScheduledItem> {
    let sized: Vec<ScheduledItem> = paths
        .iter()
        .enumerate()
        .map(|(index, path)| ScheduledItem {
            index,
            size: fs::metadata(path).map(|meta| meta.len()).unwrap_or(0),
        })
        .collect();

    let (mut large, mut small): (Vec<_>, Vec<_>) = sized
        .into_iter()
        .partition(|item| item.size >= large_file_threshold);
    large.sort_by_key(|item| Reverse(item.size));
    small.sort_by_key(|item| Reverse(item.size));
    large.extend(small);
    large
}

/// Runs `recognize` over `paths` with bounded parallelism and returns the
/// results in input order.
///
/// Per-item errors become failed results. Cancellation is checked before
/// each item starts; items already running finish, then the whole call
/// returns `OcrError::Cancelled`.
pub async fn run_batch<F>(
    paths: &[PathBuf],
    options: &BatchOptions,
    events: Arc<EventHub>,
    recognize: F,
) -> Result<Vec<OcrResult>>
where
    F: Fn(&Path) -> Result<OcrResult> + Send + Sync + 'static,
{
    if paths.is_empty() {
        return Err(OcrError::invalid("image path list is empty"));
    }

    let total = paths.len();
    let parallelism = options.actual_parallelism();
    let started = Instant::now();
    events.log(
        LogLevel::Information,
        format!("starting batch of {total} images, parallelism {parallelism}"),
    );

    let schedule = if options.enable_smart_scheduling {
        events.log(
            LogLevel::Debug,
            format!(
                "smart scheduling enabled, large file threshold {}KB",
                options.large_file_threshold / 1024
            ),
        );
        let owned = paths.to_vec();
        let threshold = options.large_file_threshold;
        tokio::task::spawn_blocking(move || order_by_size(&owned, threshold))
            .await
            .map_err(|err| OcrError::Engine(format!("failed to schedule batch: {err}")))?
    } else {
        (0..total).map(|index| ScheduledItem { index, size: 0 }).collect()
    };

    let recognize = Arc::new(recognize);
    let completed = Arc::new(Mutex::new(0usize));

    let outcomes: Vec<(usize, Option<OcrResult>)> = stream::iter(schedule.into_iter().map(|item| {
        let path = paths[item.index].clone();
        let recognize = Arc::clone(&recognize);
        let events = Arc::clone(&events);
        let completed = Arc::clone(&completed);
        let cancellation = options.cancellation.clone();
        async move {
            if cancellation.is_cancelled() {
                return (item.index, None);
            }
            let display = path.display().to_string();
            events.log(
                LogLevel::Trace,
                format!("processing {display} ({}KB)", item.size / 1024),
            );

            let worker_path = path.clone();
            let outcome = tokio::task::spawn_blocking(move || recognize(&worker_path)).await;
            let result = match outcome {
                Ok(Ok(result)) => {
                    events.log(
                        LogLevel::Trace,
                        format!("finished {display} ({}ms)", result.elapsed_ms),
                    );
                    result
                }
                Ok(Err(err)) => item_failure(&events, &display, &err.to_string()),
                Err(err) => item_failure(&events, &display, &err.to_string()),
            };

            {
                let mut done = completed.lock();
                *done += 1;
                events.progress(ProgressEvent {
                    current: *done,
                    total,
                    path: display,
                    message: format!("processed {}/{}", *done, total),
                });
            }
            (item.index, Some(result))
        }
    }))
    .buffer_unordered(parallelism)
    .collect()
    .await;

    let processed = *completed.lock();
    if options.cancellation.is_cancelled() {
        events.log(
            LogLevel::Warning,
            format!("batch cancelled after {processed}/{total} images"),
        );
        return Err(OcrError::Cancelled);
    }

    let mut slots: Vec<Option<OcrResult>> = vec![None; total];
    for (index, result) in outcomes {
        slots[index] = result;
    }
    let results: Vec<OcrResult> = slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| OcrResult::failure("image was not processed", 0)))
        .collect();

    events.log(
        LogLevel::Information,
        format!(
            "batch finished, {processed} images in {}ms",
            started.elapsed().as_millis()
        ),
    );
    Ok(results)
}

fn item_failure(events: &EventHub, display: &str, message: &str) -> OcrResult {
    events.log(LogLevel::Error, format!("failed: {display} - {message}"));
    OcrResult::failure(format!("failed to process {display}: {message}"), 0)
}
