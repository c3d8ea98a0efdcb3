use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::compare::cache::{self, DiffJob};
use crate::error::CompareError;

/// Compute a set of indexed diff jobs on a bounded worker pool.
///
/// Workers pull from a shared queue; each pixel scan runs on the blocking
/// thread pool. Results stream back over a channel tagged with the job's
/// source-set index, so callers can restore source order no matter when each
/// pair finishes. Dropping the receiver stops workers at the next pair
/// boundary; an in-flight scan always runs to completion, so no partially
/// written artifact is left behind.
pub async fn compute_all(
    jobs: Vec<(usize, DiffJob)>,
    parallel: usize,
) -> Vec<(usize, DiffJob, Result<f64, CompareError>)> {
    if jobs.is_empty() {
        return Vec::new();
    }

    let worker_count = jobs.len().min(parallel.max(1));
    debug!(jobs = jobs.len(), workers = worker_count, "starting diff run");

    let queue = Arc::new(Mutex::new(jobs));
    let (tx, mut rx) = mpsc::channel(worker_count * 2);

    let mut set = tokio::task::JoinSet::new();
    for _ in 0..worker_count {
        let queue = queue.clone();
        let tx = tx.clone();
        set.spawn(async move {
            loop {
                let Some((idx, job)) = queue.lock().await.pop() else {
                    break;
                };
                let scan = job.clone();
                let outcome =
                    match tokio::task::spawn_blocking(move || cache::run_job(&scan)).await {
                        Ok(result) => result,
                        Err(e) => Err(CompareError::Worker(e.to_string())),
                    };
                if tx.send((idx, job, outcome)).await.is_err() {
                    break; // receiver dropped, stop at the pair boundary
                }
            }
        });
    }
    drop(tx);

    let mut results = Vec::new();
    while let Some(item) = rx.recv().await {
        results.push(item);
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "diff worker panicked");
        }
    }

    results
}
