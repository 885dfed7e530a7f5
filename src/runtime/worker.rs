use crate::error::Result;
use chrono::Utc;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Outcome of one batch run. Failures are per-document; the workers never
/// stop because of a single bad document.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub started_at: String,
    pub finished_at: String,
}

/// Drain `paths` through `threads` worker threads pulling from a shared
/// queue. `make_worker` runs once per thread and returns that thread's job
/// closure, so digest/SAX state and sink handles stay thread-local.
///
/// A job error aborts only that document: it is logged with the path and
/// the worker moves on. Progress reporting is advisory.
pub fn run_batch<F, W>(paths: Vec<PathBuf>, threads: usize, make_worker: F) -> BatchReport
where
    F: Fn(usize) -> W + Send + Sync,
    W: FnMut(&Path) -> Result<()>,
{
    let started_at = Utc::now().to_rfc3339();
    let started = Instant::now();
    let total = paths.len();
    let queue = Mutex::new(VecDeque::from(paths));
    let completed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for worker_id in 0..threads.max(1) {
            let queue = &queue;
            let completed = &completed;
            let failed = &failed;
            let make_worker = &make_worker;
            scope.spawn(move || {
                let mut job = make_worker(worker_id);
                loop {
                    let path = {
                        let mut guard = match queue.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        guard.pop_front()
                    };
                    let Some(path) = path else { break };
                    match job(&path) {
                        Ok(()) => {
                            completed.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(err) => {
                            failed.fetch_add(1, Ordering::SeqCst);
                            tracing::error!("{} failed: {err}", path.display());
                        }
                    }
                    let done =
                        completed.load(Ordering::SeqCst) + failed.load(Ordering::SeqCst);
                    if done > 0 && total > done {
                        let eta =
                            started.elapsed().as_secs_f64() / done as f64 * (total - done) as f64;
                        tracing::info!("processed {done}/{total}, eta {eta:.0}s");
                    }
                }
            });
        }
    });

    let report = BatchReport {
        total,
        completed: completed.load(Ordering::SeqCst),
        failed: failed.load(Ordering::SeqCst),
        started_at,
        finished_at: Utc::now().to_rfc3339(),
    };
    tracing::info!(
        "batch done: {}/{} converted, {} failed",
        report.completed,
        report.total,
        report.failed
    );
    report
}
