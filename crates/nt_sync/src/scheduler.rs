use chrono::{DateTime, Utc};
use nt_core::{normalize_all, ArticleSource, ArticleStorage, MergeReport, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::fetcher::fetch_until_cancelled;
use crate::logging::Logger;

/// What consumers see after every poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub polls: u64,
    pub last_report: Option<MergeReport>,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub article_count: usize,
}

/// Fetch, normalize and merge one batch. Used by the scheduler and by
/// one-shot callers.
pub async fn sync_once(source: &dyn ArticleSource, storage: &dyn ArticleStorage, count: usize) -> Result<MergeReport> {
    let records = source.fetch_batch(count).await?;
    storage.merge_batch(normalize_all(&records)).await
}

struct Running {
    cancel: CancellationToken,
    refresh: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// Owns the poll timer for one consuming context. `start` arms it once and
/// `stop` clears it once; dropping the scheduler also stops it.
pub struct PollScheduler {
    source: Arc<dyn ArticleSource>,
    storage: Arc<dyn ArticleStorage>,
    interval: Duration,
    batch_size: usize,
    logger: Logger,
    status: Arc<watch::Sender<SyncStatus>>,
    running: Option<Running>,
}

impl PollScheduler {
    pub fn new(
        source: Arc<dyn ArticleSource>,
        storage: Arc<dyn ArticleStorage>,
        interval: Duration,
        batch_size: usize,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            source,
            storage,
            interval: interval.max(Duration::from_millis(1)),
            batch_size,
            logger: Logger::new().with_prefix("sync"),
            status: Arc::new(status),
            running: None,
        }
    }

    pub fn from_config(source: Arc<dyn ArticleSource>, storage: Arc<dyn ArticleStorage>, config: &SyncConfig) -> Self {
        Self::new(source, storage, config.poll_interval, config.batch_size)
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Polls immediately, then every `interval`. Calling it while already
    /// running does nothing.
    pub fn start(&mut self) {
        if self.running.is_some() {
            self.logger.debug("already running");
            return;
        }

        let cancel = CancellationToken::new();
        let refresh = Arc::new(Notify::new());
        let task = PollTask {
            source: Arc::clone(&self.source),
            storage: Arc::clone(&self.storage),
            batch_size: self.batch_size,
            logger: self.logger.clone(),
            status: Arc::clone(&self.status),
            cancel: cancel.clone(),
        };
        let interval = self.interval;
        let wake = Arc::clone(&refresh);

        self.logger.info(&format!(
            "📰 polling {} every {}s ({} per batch)",
            self.source.name(),
            interval.as_secs(),
            self.batch_size
        ));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = task.cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }
                task.poll().await;
            }
        });

        self.running = Some(Running { cancel, refresh, handle });
    }

    /// Asks for an extra poll now without moving the timer.
    pub fn refresh_now(&self) {
        if let Some(running) = &self.running {
            running.refresh.notify_one();
        }
    }

    /// Cancels the timer and any in-flight fetch, then waits for the task to
    /// wind down. Once this returns the store is not touched again.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            if !e.is_cancelled() {
                self.logger.error(&format!("poll task ended abnormally: {}", e));
            }
        }
        self.logger.info("🛑 polling stopped");
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            running.handle.abort();
        }
    }
}

struct PollTask {
    source: Arc<dyn ArticleSource>,
    storage: Arc<dyn ArticleStorage>,
    batch_size: usize,
    logger: Logger,
    status: Arc<watch::Sender<SyncStatus>>,
    cancel: CancellationToken,
}

impl PollTask {
    async fn poll(&self) {
        let Some(result) = fetch_until_cancelled(self.source.as_ref(), self.batch_size, &self.cancel).await else {
            self.logger.debug("fetch abandoned");
            return;
        };

        let outcome = match result {
            Ok(records) => {
                let articles = normalize_all(&records);
                if self.cancel.is_cancelled() {
                    return;
                }
                self.storage.merge_batch(articles).await
            }
            Err(e) => Err(e),
        };

        if self.cancel.is_cancelled() {
            return;
        }

        match outcome {
            Ok(report) => {
                let article_count = self.storage.snapshot().await.len();
                self.logger.info(&format!(
                    "✨ {} new, {} updated, {} unchanged ({} kept)",
                    report.new, report.updated, report.unchanged, article_count
                ));
                self.status.send_modify(|status| {
                    status.polls += 1;
                    status.last_report = Some(report);
                    status.last_error = None;
                    status.last_success = Some(Utc::now());
                    status.article_count = article_count;
                });
            }
            Err(e) => {
                // Keep the last good state; the next tick retries.
                self.logger.warn(&format!("⚠️ poll failed: {}", e));
                self.status.send_modify(|status| {
                    status.polls += 1;
                    status.last_error = Some(e.to_string());
                });
            }
        }
    }
}
