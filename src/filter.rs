use parking_lot::Mutex;
use std::collections::HashSet;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::{ConfigError, FilterError};
use crate::metrics::FILTER_LATENCY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPipeline {
    workers: NonZeroUsize,
}

impl FilterPipeline {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    pub fn with_workers(workers: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(workers)
            .map(Self::new)
            .ok_or(ConfigError::ZeroWorkers)
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Every record for which `predicate` holds, in no particular order. The
    /// predicate runs once per record.
    pub async fn filter<T, P>(&self, records: Vec<T>, predicate: P) -> Vec<T>
    where
        T: Send + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        if records.is_empty() {
            return Vec::new();
        }
        let started = Instant::now();

        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let mut workers = self
            .fan_out(records, move |record: T| {
                if predicate(&record) {
                    // receiver only goes away when the caller gave up
                    let _ = result_tx.send(record);
                }
            })
            .await;

        // closes once the last worker drops its sender
        let mut matches = Vec::new();
        while let Some(record) = result_rx.recv().await {
            matches.push(record);
        }
        join_workers(&mut workers).await;

        FILTER_LATENCY.observe(started.elapsed().as_secs_f64());
        matches
    }

    // on expiry the workers are aborted and nothing partial is returned
    pub async fn filter_within<T, P>(
        &self,
        records: Vec<T>,
        predicate: P,
        deadline: Duration,
    ) -> Result<Vec<T>, FilterError>
    where
        T: Send + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let started = Instant::now();
        match tokio::time::timeout(deadline, self.filter(records, predicate)).await {
            Ok(matches) => Ok(matches),
            Err(_) => {
                // filter never got to observe this run
                FILTER_LATENCY.observe(started.elapsed().as_secs_f64());
                tracing::warn!(?deadline, "filter deadline exceeded");
                Err(FilterError::DeadlineExceeded(deadline))
            }
        }
    }

    pub async fn distinct<T, K, F>(&self, records: Vec<T>, extract: F) -> Vec<K>
    where
        T: Send + 'static,
        K: Eq + Hash + Send + 'static,
        F: Fn(&T) -> Option<K> + Send + Sync + 'static,
    {
        if records.is_empty() {
            return Vec::new();
        }
        let started = Instant::now();

        let seen = Arc::new(Mutex::new(HashSet::new()));
        let accumulator = Arc::clone(&seen);
        let mut workers = self
            .fan_out(records, move |record: T| {
                if let Some(key) = extract(&record) {
                    accumulator.lock().insert(key);
                }
            })
            .await;
        join_workers(&mut workers).await;

        let unique = std::mem::take(&mut *seen.lock());
        FILTER_LATENCY.observe(started.elapsed().as_secs_f64());
        unique.into_iter().collect()
    }

    // spawns the workers, then feeds them every record and closes the queue
    async fn fan_out<T, F>(&self, records: Vec<T>, visit: F) -> JoinSet<()>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let (work_tx, work_rx) = mpsc::channel::<T>(records.len().max(1));
        let work_rx = Arc::new(tokio::sync::Mutex::new(work_rx));
        let visit = Arc::new(visit);

        let mut workers = JoinSet::new();
        for _ in 0..self.workers.get() {
            let work_rx = Arc::clone(&work_rx);
            let visit = Arc::clone(&visit);
            workers.spawn(async move {
                loop {
                    // the queue lock is held only while taking one record
                    let next = work_rx.lock().await.recv().await;
                    match next {
                        Some(record) => visit(record),
                        None => break,
                    }
                }
            });
        }

        // queue capacity covers the whole snapshot, so this never waits on workers
        for record in records {
            if work_tx.send(record).await.is_err() {
                break;
            }
        }
        workers
    }
}

async fn join_workers(workers: &mut JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }
}
