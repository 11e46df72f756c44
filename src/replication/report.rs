//! Outcome aggregation

use std::time::Duration;

use super::transfer::{OutcomeKind, TransferOutcome};
use crate::error::StoreError;
use crate::store::Key;

/// Count of each transfer outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// Keys restored on the destination
    pub copied: u64,
    /// Keys gone from the source at transfer time
    pub skipped_missing: u64,
    /// Keys whose dump failed
    pub failed_dump: u64,
    /// Keys whose restore failed
    pub failed_restore: u64,
    /// Copied keys restored without expiry because their TTL could not be read
    pub ttl_fallbacks: u64,
}

impl OutcomeCounts {
    /// Count one outcome
    pub fn record(&mut self, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Copied { ttl_defaulted, .. } => {
                self.copied += 1;
                if *ttl_defaulted {
                    self.ttl_fallbacks += 1;
                }
            }
            TransferOutcome::SkippedMissing => self.skipped_missing += 1,
            TransferOutcome::FailedDump(_) => self.failed_dump += 1,
            TransferOutcome::FailedRestore(_) => self.failed_restore += 1,
        }
    }

    /// Add another set of counts to this one
    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.copied += other.copied;
        self.skipped_missing += other.skipped_missing;
        self.failed_dump += other.failed_dump;
        self.failed_restore += other.failed_restore;
        self.ttl_fallbacks += other.ttl_fallbacks;
    }

    /// Keys a transfer was attempted for
    pub fn attempted(&self) -> u64 {
        self.copied + self.skipped_missing + self.failed_dump + self.failed_restore
    }

    /// Keys that failed to dump or restore
    pub fn failed(&self) -> u64 {
        self.failed_dump + self.failed_restore
    }
}

/// A key that could not be copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFailure {
    /// The key
    pub key: Key,
    /// Which step failed
    pub kind: OutcomeKind,
    /// Error reported by the store
    pub error: StoreError,
}

/// Outcomes collected by one worker, or by all of them once merged
#[derive(Debug, Clone, Default)]
pub struct OutcomeTally {
    /// Outcome counts
    pub counts: OutcomeCounts,
    /// Failed keys, in the order the owning worker saw them
    pub failures: Vec<KeyFailure>,
}

impl OutcomeTally {
    /// Record the outcome of `key`
    pub fn record(&mut self, key: Key, outcome: TransferOutcome) {
        self.counts.record(&outcome);
        let kind = outcome.kind();
        if let TransferOutcome::FailedDump(error) | TransferOutcome::FailedRestore(error) = outcome
        {
            self.failures.push(KeyFailure { key, kind, error });
        }
    }

    /// Fold another tally into this one
    pub fn merge(&mut self, other: OutcomeTally) {
        self.counts.merge(&other.counts);
        self.failures.extend(other.failures);
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct CopyReport {
    /// Keys returned by enumeration
    pub enumerated: u64,
    /// Keys handed to the worker pool
    pub published: u64,
    /// Outcome counts
    pub counts: OutcomeCounts,
    /// Every key that failed, with its error
    pub failures: Vec<KeyFailure>,
    /// Wall time of the run
    pub elapsed: Duration,
    /// The run was stopped before every key was published.
    ///
    /// Keys still queued when the stop was seen are published but never
    /// attempted, so [`CopyReport::attempted`] can be lower than `published`.
    pub cancelled: bool,
}

impl CopyReport {
    /// Keys a transfer was attempted for
    pub fn attempted(&self) -> u64 {
        self.counts.attempted()
    }

    /// Whether no key failed
    pub fn is_clean(&self) -> bool {
        self.counts.failed() == 0
    }

    /// Transfer throughput
    pub fn keys_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.attempted() as f64 / secs
    }
}
