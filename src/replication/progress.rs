//! Publish-side progress reporting
//!
//! Progress counts keys handed to the worker pool, not keys completed.

use std::time::{Duration, Instant};

use crate::store::Key;

/// A progress line to emit
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Keys published so far
    pub published: u64,
    /// Keys enumerated in total
    pub total: u64,
    /// Most recently published key
    pub last_key: Key,
    /// Time since publishing started
    pub elapsed: Duration,
}

impl ProgressUpdate {
    /// Published share of all enumerated keys
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.published as f64 / self.total as f64) * 100.0
    }

    /// Publish rate
    pub fn keys_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.published as f64 / secs
    }
}

/// Emits an update every `interval` published keys. An interval of 0 never emits.
#[derive(Debug)]
pub struct ProgressReporter {
    interval: u64,
    total: u64,
    published: u64,
    started: Instant,
}

impl ProgressReporter {
    /// Reporter for a run of `total` keys
    pub fn new(interval: u64, total: u64) -> Self {
        Self {
            interval,
            total,
            published: 0,
            started: Instant::now(),
        }
    }

    /// Count `key` as published, returning an update when the interval is reached.
    pub fn record(&mut self, key: &Key) -> Option<ProgressUpdate> {
        self.published += 1;
        if self.interval == 0 || self.published % self.interval != 0 {
            return None;
        }
        Some(ProgressUpdate {
            published: self.published,
            total: self.total,
            last_key: key.clone(),
            elapsed: self.started.elapsed(),
        })
    }
}
