//! Replication engine
//!
//! A run flushes the destination, enumerates every source key, and fans the
//! keys out to a fixed pool of workers that move each one with
//! `DUMP` / `PTTL` / `RESTORE`. Failures of individual keys are counted and
//! reported; only a failed flush or a failed enumeration aborts the run, and
//! both happen before any key is transferred.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rediscopy::replication::{Replicator, ReplicationOptions};
//! use rediscopy::store::MemoryStore;
//!
//! let source = Arc::new(MemoryStore::new());
//! let destination = Arc::new(MemoryStore::new());
//! source.insert("greeting", "hello", None);
//!
//! let report = Replicator::new(source, destination, ReplicationOptions::default())
//!     .run()
//!     .await?;
//! assert_eq!(report.attempted(), 1);
//! ```

pub mod pool;
pub mod progress;
pub mod report;
pub mod transfer;

pub use pool::WorkerPool;
pub use progress::{ProgressReporter, ProgressUpdate};
pub use report::{CopyReport, KeyFailure, OutcomeCounts, OutcomeTally};
pub use transfer::{transfer_key, OutcomeKind, TransferOptions, TransferOutcome};

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_SCAN_BATCH, DEFAULT_STATUS_INTERVAL, MATCH_ALL};
use crate::error::{CopyError, Result};
use crate::store::Store;

/// Engine settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationOptions {
    /// Number of transfer workers
    pub concurrency: NonZeroUsize,
    /// Published keys between progress lines, 0 disables them
    pub status_interval: u64,
    /// Glob selecting the source keys
    pub pattern: String,
    /// Enumeration batch hint
    pub scan_batch: usize,
    /// Per-key policy
    pub transfer: TransferOptions,
}

impl Default for ReplicationOptions {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            status_interval: DEFAULT_STATUS_INTERVAL,
            pattern: MATCH_ALL.to_string(),
            scan_batch: DEFAULT_SCAN_BATCH,
            transfer: TransferOptions::default(),
        }
    }
}

/// Cooperative stop signal for a run.
///
/// Once cancelled, no further keys are published and workers drop whatever
/// is still queued after finishing their current key.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request the run to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Coordinates a full copy from `source` to `destination`
pub struct Replicator {
    source: Arc<dyn Store>,
    destination: Arc<dyn Store>,
    options: ReplicationOptions,
    cancel: CancelHandle,
}

impl Replicator {
    /// Create a replicator
    pub fn new(
        source: Arc<dyn Store>,
        destination: Arc<dyn Store>,
        options: ReplicationOptions,
    ) -> Self {
        Self {
            source,
            destination,
            options,
            cancel: CancelHandle::default(),
        }
    }

    /// Handle that stops this replicator's runs
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run the copy to completion.
    pub async fn run(&self) -> Result<CopyReport> {
        let started = Instant::now();

        info!(destination = %self.destination.describe(), "flushing all keys on destination");
        self.destination
            .flush_all()
            .await
            .map_err(CopyError::DestinationClear)?;

        info!(
            source = %self.source.describe(),
            pattern = %self.options.pattern,
            "loading keys from source"
        );
        let keys = self
            .source
            .scan_keys(&self.options.pattern, self.options.scan_batch)
            .await
            .map_err(CopyError::Enumeration)?;
        let enumerated = keys.len() as u64;
        info!(
            count = enumerated,
            workers = self.options.concurrency.get(),
            "loaded keys, beginning copy"
        );

        let pool = WorkerPool::spawn(
            self.options.concurrency,
            Arc::clone(&self.source),
            Arc::clone(&self.destination),
            self.options.transfer,
            self.cancel.clone(),
        );
        let mut progress = ProgressReporter::new(self.options.status_interval, enumerated);
        let mut published = 0u64;

        for key in keys {
            if self.cancel.is_cancelled() {
                warn!(published, "copy cancelled, no further keys will be queued");
                break;
            }
            let update = progress.record(&key);
            if !pool.submit(key).await {
                if self.cancel.is_cancelled() {
                    warn!(published, "copy cancelled, no further keys will be queued");
                } else {
                    warn!(published, "all transfer workers exited early");
                }
                break;
            }
            published += 1;

            if let Some(update) = update {
                info!(
                    count = update.published,
                    total = update.total,
                    percent = update.percent(),
                    keys_per_sec = update.keys_per_second(),
                    last_key = %update.last_key,
                    "copy progress"
                );
            }
        }

        let tally = pool.finish().await;
        let report = CopyReport {
            enumerated,
            published,
            counts: tally.counts,
            failures: tally.failures,
            elapsed: started.elapsed(),
            cancelled: self.cancel.is_cancelled(),
        };

        info!(
            attempted = report.attempted(),
            copied = report.counts.copied,
            skipped_missing = report.counts.skipped_missing,
            failed_dump = report.counts.failed_dump,
            failed_restore = report.counts.failed_restore,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "copy complete"
        );

        Ok(report)
    }
}
