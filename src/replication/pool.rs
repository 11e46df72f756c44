//! Fixed-size pool of transfer workers
//!
//! All workers pull keys from one bounded queue. The queue receiver sits
//! behind an async mutex that is held only while waiting for the next key,
//! never during a store call. Each worker keeps its own [`OutcomeTally`];
//! tallies are merged once every worker has exited.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::report::OutcomeTally;
use super::transfer::{transfer_key, TransferOptions};
use super::CancelHandle;
use crate::store::{Key, Store};

type SharedQueue = Arc<Mutex<mpsc::Receiver<Key>>>;

/// Running set of transfer workers
pub struct WorkerPool {
    sender: mpsc::Sender<Key>,
    workers: Vec<JoinHandle<OutcomeTally>>,
}

impl WorkerPool {
    /// Start `concurrency` workers copying from `source` to `destination`.
    pub fn spawn(
        concurrency: NonZeroUsize,
        source: Arc<dyn Store>,
        destination: Arc<dyn Store>,
        options: TransferOptions,
        cancel: CancelHandle,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(concurrency.get());
        let queue: SharedQueue = Arc::new(Mutex::new(receiver));

        let workers = (0..concurrency.get())
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&queue),
                    Arc::clone(&source),
                    Arc::clone(&destination),
                    options,
                    cancel.clone(),
                ))
            })
            .collect();

        Self { sender, workers }
    }

    /// Number of workers in the pool
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue `key` for transfer, waiting while the queue is full.
    ///
    /// Returns `false` if every worker has already exited.
    pub async fn submit(&self, key: Key) -> bool {
        self.sender.send(key).await.is_ok()
    }

    /// Close the queue and wait for every worker to drain it.
    pub async fn finish(self) -> OutcomeTally {
        drop(self.sender);

        let mut total = OutcomeTally::default();
        for (id, worker) in self.workers.into_iter().enumerate() {
            match worker.await {
                Ok(tally) => total.merge(tally),
                Err(e) => error!(worker = id, error = %e, "transfer worker terminated abnormally"),
            }
        }
        total
    }
}

async fn run_worker(
    id: usize,
    queue: SharedQueue,
    source: Arc<dyn Store>,
    destination: Arc<dyn Store>,
    options: TransferOptions,
    cancel: CancelHandle,
) -> OutcomeTally {
    let mut tally = OutcomeTally::default();

    loop {
        let next = queue.lock().await.recv().await;
        let Some(key) = next else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        let outcome = transfer_key(&key, source.as_ref(), destination.as_ref(), options).await;
        tally.record(key, outcome);
    }

    debug!(
        worker = id,
        attempted = tally.counts.attempted(),
        "transfer worker finished"
    );
    tally
}
