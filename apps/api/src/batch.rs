//! Bounded, cancellable batch execution for ingestion and matching.
//!
//! Items run on a fixed number of concurrent slots. Cancellation is checked
//! when an item is about to start, never mid-item, so an in-flight model call
//! always completes and its write lands whole. Progress is reported from the
//! single consumer loop, so the completion count only ever goes up.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;

#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Guard that cancels the batch when dropped, e.g. when the HTTP request
    /// driving it goes away. Call `disarm` once the batch has finished.
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop {
            flag: Some(self.clone()),
        }
    }
}

pub struct CancelOnDrop {
    flag: Option<CancellationFlag>,
}

impl CancelOnDrop {
    pub fn disarm(mut self) {
        self.flag = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(flag) = self.flag.take() {
            flag.cancel();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// Outputs of the items that ran, plus how many were never started because
/// the batch was cancelled.
#[derive(Debug)]
pub struct BatchRun<R> {
    pub outputs: Vec<R>,
    pub cancelled: usize,
}

/// Runs `work` over `items` with at most `workers` in flight.
pub async fn run_bounded<T, R, F, Fut>(
    label: &str,
    items: Vec<T>,
    workers: usize,
    cancel: &CancellationFlag,
    work: F,
    mut on_progress: impl FnMut(BatchProgress),
) -> BatchRun<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let work = &work;

    let mut results = stream::iter(items)
        .map(|item| async move {
            if cancel.is_cancelled() {
                None
            } else {
                Some(work(item).await)
            }
        })
        .buffer_unordered(workers.max(1));

    let mut outputs = Vec::with_capacity(total);
    let mut cancelled = 0;
    let mut completed = 0;

    while let Some(result) = results.next().await {
        completed += 1;
        match result {
            Some(output) => outputs.push(output),
            None => cancelled += 1,
        }
        on_progress(BatchProgress { completed, total });
    }

    if cancelled > 0 {
        info!("{label}: cancelled with {cancelled}/{total} items not started");
    }

    BatchRun { outputs, cancelled }
}

/// Progress callback that logs every completion.
pub fn log_progress(label: &'static str) -> impl FnMut(BatchProgress) {
    move |p| info!("{label}: {}/{} processed", p.completed, p.total)
}

/// Runs a batch on its own task and waits for it. If the waiting future is
/// dropped (the HTTP client went away), the batch is cancelled and stops
/// before its next item instead of being aborted mid-item.
pub async fn spawn_cancellable<T, F, Fut>(start: F) -> Result<T, AppError>
where
    F: FnOnce(CancellationFlag) -> Fut,
    Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    let flag = CancellationFlag::new();
    let guard = flag.cancel_on_drop();
    let result = tokio::spawn(start(flag))
        .await
        .map_err(|e| AppError::Internal(anyhow!("batch task failed: {e}")))?;
    guard.disarm();
    result
}
