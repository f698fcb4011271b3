//! Bounded worker pool for encode jobs

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::ports::{EncodeJob, EncodeOutcome, ExecutePort};

type EncodeReply = oneshot::Sender<Result<EncodeOutcome, DomainError>>;

/// Sizing for an [`EncodePool`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSettings {
    /// Encodes allowed to run at the same time
    pub workers: usize,
    /// Jobs allowed to wait for a free worker
    pub queue_capacity: usize,
    /// Upper bound on one encode's wall time
    pub timeout: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            queue_capacity: 32,
            timeout: None,
        }
    }
}

struct EncodeTask {
    job: EncodeJob,
    reply: EncodeReply,
}

/// Fixed set of workers draining a bounded job queue.
///
/// A job whose submitter goes away is cancelled: skipped if it is still
/// queued, or stopped mid-encode with its partial output removed.
pub struct EncodePool {
    sender: mpsc::Sender<EncodeTask>,
    settings: PoolSettings,
    workers: Vec<JoinHandle<()>>,
}

impl EncodePool {
    /// Spawn the workers. Must be called from within a tokio runtime.
    pub fn new(encoder: Arc<dyn ExecutePort>, settings: PoolSettings) -> Self {
        let settings = PoolSettings {
            workers: settings.workers.max(1),
            queue_capacity: settings.queue_capacity.max(1),
            timeout: settings.timeout,
        };
        let (sender, receiver) = mpsc::channel(settings.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..settings.workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&encoder),
                    Arc::clone(&receiver),
                    settings.timeout,
                ))
            })
            .collect();

        info!(
            workers = settings.workers,
            queue_capacity = settings.queue_capacity,
            timeout = ?settings.timeout,
            "Encode pool started"
        );

        Self {
            sender,
            settings,
            workers,
        }
    }

    pub fn settings(&self) -> PoolSettings {
        self.settings
    }

    /// Jobs currently waiting for a worker
    pub fn queued_jobs(&self) -> usize {
        self.settings.queue_capacity - self.sender.capacity()
    }

    /// Queue a job and wait for its result.
    ///
    /// Fails fast with `ServiceUnavailable` when the queue is full. Dropping
    /// the returned future cancels the job.
    pub async fn submit(&self, job: EncodeJob) -> Result<EncodeOutcome, DomainError> {
        let (reply, outcome) = oneshot::channel();
        let output = job.output.clone();

        self.sender
            .try_send(EncodeTask { job, reply })
            .map_err(|e| match e {
                TrySendError::Full(_) => {
                    warn!(
                        queue_capacity = self.settings.queue_capacity,
                        output = %output.display(),
                        "Encode queue full, rejecting job"
                    );
                    DomainError::ServiceUnavailable("Encode queue is full".to_string())
                }
                TrySendError::Closed(_) => {
                    DomainError::InternalError("Encode pool has shut down".to_string())
                }
            })?;

        debug!(output = %output.display(), queued = self.queued_jobs(), "Encode job queued");

        outcome.await.map_err(|_| {
            DomainError::InternalError("Encode worker stopped before replying".to_string())
        })?
    }
}

impl Drop for EncodePool {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    encoder: Arc<dyn ExecutePort>,
    receiver: Arc<Mutex<mpsc::Receiver<EncodeTask>>>,
    timeout: Option<Duration>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(EncodeTask { job, mut reply }) = next else {
            debug!(worker_id, "Encode queue closed, worker exiting");
            return;
        };

        if reply.is_closed() {
            debug!(worker_id, output = %job.output.display(), "Skipping abandoned job");
            continue;
        }

        debug!(worker_id, window = %job.window, output = %job.output.display(), "Encode started");

        // The encode future is dropped when this select finishes, which stops
        // the child process before its output is removed below
        let result = tokio::select! {
            result = bounded(encoder.encode(&job), timeout) => Some(result),
            _ = reply.closed() => None,
        };

        match result {
            Some(result) => {
                if reply.send(result).is_err() {
                    discard_partial(&job.output).await;
                }
            }
            None => {
                warn!(worker_id, output = %job.output.display(), "Client went away, encode cancelled");
                discard_partial(&job.output).await;
            }
        }
    }
}

async fn bounded<F>(encode: F, timeout: Option<Duration>) -> Result<EncodeOutcome, DomainError>
where
    F: Future<Output = Result<EncodeOutcome, DomainError>>,
{
    match timeout {
        None => encode.await,
        Some(limit) => match tokio::time::timeout(limit, encode).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = limit.as_secs_f64(), "Encode timed out");
                Err(DomainError::encoding(format!(
                    "encode exceeded {:.0}s timeout",
                    limit.as_secs_f64()
                )))
            }
        },
    }
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}
