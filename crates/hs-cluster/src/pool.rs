//! The provisioned worker pool and its dispatch protocol.
//!
//! [`ClusterHandle::provision`] spawns a fixed set of tokio worker tasks
//! pulling evaluation requests off a shared queue. Each submission yields a
//! [`JobTicket`] that resolves to the trial's objective (or its failure)
//! regardless of the order in which workers finish. Teardown is explicit,
//! idempotent, and guaranteed to run at most once.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use hs_types::errors::{ClusterProvisioningError, EvaluationError};
use hs_types::overrides::Override;

use crate::config::{ClusterBackend, ClusterConfig};

/// One evaluation to run on a worker.
#[derive(Debug, Clone)]
pub struct EvalRequest {
    pub trial_id: Uuid,
    pub trial_number: usize,
    /// The overrides describing the configuration, carried with their native
    /// typed values so nothing is lost to a stringify/re-parse cycle.
    pub overrides: Vec<Override>,
    pub budget: Option<f64>,
    pub seed: u64,
}

/// Executes one configuration and returns its objective value.
///
/// Implementations wrap the user's task function; they must be safe to call
/// concurrently from every worker.
#[async_trait]
pub trait TrialExecutor: Send + Sync {
    async fn execute(&self, request: &EvalRequest) -> Result<f64, EvaluationError>;
}

/// Attributed outcome of one evaluation.
#[derive(Debug)]
pub struct EvalReply {
    pub trial_id: Uuid,
    pub trial_number: usize,
    pub outcome: Result<f64, EvaluationError>,
    pub duration: std::time::Duration,
    /// Index of the worker that ran the trial; `None` when the worker
    /// disappeared before replying.
    pub worker_id: Option<usize>,
}

struct Job {
    request: EvalRequest,
    reply: oneshot::Sender<EvalReply>,
}

/// Future result of one submitted evaluation, tied to its trial id so the
/// caller can attribute results no matter which order workers finish in.
pub struct JobTicket {
    pub trial_id: Uuid,
    pub trial_number: usize,
    receiver: oneshot::Receiver<EvalReply>,
}

impl JobTicket {
    /// Wait for the worker's verdict. A dropped worker resolves to
    /// [`EvaluationError::WorkerGone`] rather than hanging.
    pub async fn wait(self) -> EvalReply {
        match self.receiver.await {
            Ok(reply) => reply,
            Err(_) => EvalReply {
                trial_id: self.trial_id,
                trial_number: self.trial_number,
                outcome: Err(EvaluationError::WorkerGone {
                    trial_number: self.trial_number,
                }),
                duration: std::time::Duration::ZERO,
                worker_id: None,
            },
        }
    }
}

/// Handle to a provisioned worker pool.
pub struct ClusterHandle {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
    teardown_count: usize,
}

impl ClusterHandle {
    /// Spawn `worker_count` workers executing trials through `executor`.
    ///
    /// Only the local backend can be provisioned in-process; a job-queue
    /// backend is refused with [`ClusterProvisioningError::UnsupportedBackend`].
    pub fn provision(
        config: &ClusterConfig,
        worker_count: usize,
        executor: Arc<dyn TrialExecutor>,
    ) -> Result<Self, ClusterProvisioningError> {
        if let ClusterBackend::JobQueue { .. } = config.backend {
            return Err(ClusterProvisioningError::UnsupportedBackend {
                backend: config.backend.name().to_string(),
            });
        }
        if worker_count == 0 {
            return Err(ClusterProvisioningError::NoWorkers);
        }

        let (sender, receiver) = mpsc::channel::<Job>(worker_count * 2);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..worker_count)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let executor = Arc::clone(&executor);
                tokio::spawn(async move {
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        let Some(job) = job else {
                            debug!(worker_id, "worker queue closed; exiting");
                            break;
                        };
                        debug!(
                            worker_id,
                            trial = job.request.trial_number,
                            "worker picked up trial"
                        );
                        let started = std::time::Instant::now();
                        let outcome = executor.execute(&job.request).await;
                        let reply = EvalReply {
                            trial_id: job.request.trial_id,
                            trial_number: job.request.trial_number,
                            outcome,
                            duration: started.elapsed(),
                            worker_id: Some(worker_id),
                        };
                        // The ticket may have been dropped; nothing to do then.
                        let _ = job.reply.send(reply);
                    }
                })
            })
            .collect();

        info!(worker_count, "provisioned local worker pool");
        Ok(Self {
            sender: Some(sender),
            workers,
            worker_count,
            teardown_count: 0,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// How many times teardown has actually run. Stays at most 1.
    pub fn teardown_count(&self) -> usize {
        self.teardown_count
    }

    /// Queue an evaluation. Fails once the pool has been shut down.
    pub async fn submit(
        &self,
        request: EvalRequest,
    ) -> Result<JobTicket, ClusterProvisioningError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or(ClusterProvisioningError::AlreadyShutdown)?;
        let (reply, receiver) = oneshot::channel();
        let trial_id = request.trial_id;
        let trial_number = request.trial_number;
        sender
            .send(Job { request, reply })
            .await
            .map_err(|_| ClusterProvisioningError::AlreadyShutdown)?;
        Ok(JobTicket {
            trial_id,
            trial_number,
            receiver,
        })
    }

    /// Tear the pool down: close the queue, let in-flight evaluations finish,
    /// and join every worker. Calling this again is a no-op.
    pub async fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            debug!("cluster already shut down; ignoring repeated teardown");
            return;
        }
        for worker in self.workers.drain(..) {
            if let Err(err) = worker.await {
                warn!(%err, "worker task did not join cleanly");
            }
        }
        self.teardown_count += 1;
        info!("cluster torn down");
    }
}

impl Drop for ClusterHandle {
    fn drop(&mut self) {
        if self.sender.take().is_some() {
            // Cannot join async tasks here; closing the queue lets workers
            // drain and exit on their own.
            warn!("cluster handle dropped without explicit shutdown");
            for worker in self.workers.drain(..) {
                worker.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    struct Doubler;

    #[async_trait]
    impl TrialExecutor for Doubler {
        async fn execute(&self, request: &EvalRequest) -> Result<f64, EvaluationError> {
            Ok(request.trial_number as f64 * 2.0)
        }
    }

    struct Flaky {
        calls: SyncMutex<usize>,
    }

    #[async_trait]
    impl TrialExecutor for Flaky {
        async fn execute(&self, request: &EvalRequest) -> Result<f64, EvaluationError> {
            let mut calls = self.calls.lock();
            *calls += 1;
            if request.trial_number % 2 == 1 {
                Err(EvaluationError::TaskFailed {
                    trial_number: request.trial_number,
                    message: "odd trials fail".to_string(),
                })
            } else {
                Ok(1.0)
            }
        }
    }

    fn request(n: usize) -> EvalRequest {
        EvalRequest {
            trial_id: Uuid::new_v4(),
            trial_number: n,
            overrides: vec![Override::new("x", n as i64)],
            budget: None,
            seed: 0,
        }
    }

    #[tokio::test]
    async fn results_attribute_to_their_trials() {
        let mut cluster =
            ClusterHandle::provision(&ClusterConfig::local(), 3, Arc::new(Doubler)).unwrap();

        let mut tickets = Vec::new();
        for n in 0..10 {
            tickets.push(cluster.submit(request(n)).await.unwrap());
        }
        for (n, ticket) in tickets.into_iter().enumerate() {
            assert_eq!(ticket.trial_number, n);
            let reply = ticket.wait().await;
            assert_eq!(reply.trial_number, n);
            assert_eq!(reply.outcome.unwrap(), n as f64 * 2.0);
            assert!(reply.worker_id.unwrap() < cluster.worker_count());
        }
        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn failures_resolve_without_poisoning_the_pool() {
        let executor = Arc::new(Flaky {
            calls: SyncMutex::new(0),
        });
        let shared: Arc<dyn TrialExecutor> = executor.clone();
        let mut cluster = ClusterHandle::provision(&ClusterConfig::local(), 2, shared).unwrap();

        let mut ok = 0;
        let mut failed = 0;
        let mut tickets = Vec::new();
        for n in 0..6 {
            tickets.push(cluster.submit(request(n)).await.unwrap());
        }
        for ticket in tickets {
            match ticket.wait().await.outcome {
                Ok(_) => ok += 1,
                Err(EvaluationError::TaskFailed { .. }) => failed += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 3);
        assert_eq!(failed, 3);
        assert_eq!(*executor.calls.lock(), 6);
        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn teardown_runs_exactly_once() {
        let mut cluster =
            ClusterHandle::provision(&ClusterConfig::local(), 2, Arc::new(Doubler)).unwrap();
        assert_eq!(cluster.teardown_count(), 0);

        cluster.shutdown().await;
        assert_eq!(cluster.teardown_count(), 1);

        // Repeated teardown is a no-op.
        cluster.shutdown().await;
        cluster.shutdown().await;
        assert_eq!(cluster.teardown_count(), 1);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let mut cluster =
            ClusterHandle::provision(&ClusterConfig::local(), 1, Arc::new(Doubler)).unwrap();
        cluster.shutdown().await;
        match cluster.submit(request(0)).await {
            Err(ClusterProvisioningError::AlreadyShutdown) => (),
            other => panic!("expected AlreadyShutdown, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn job_queue_backend_is_refused() {
        let config = ClusterConfig::local().with_backend(ClusterBackend::JobQueue {
            address: "queue://head:6379".to_string(),
            namespace: "sweeps".to_string(),
        });
        match ClusterHandle::provision(&config, 2, Arc::new(Doubler)) {
            Err(ClusterProvisioningError::UnsupportedBackend { backend }) => {
                assert_eq!(backend, "job_queue");
            }
            other => panic!("expected UnsupportedBackend, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn zero_workers_is_refused() {
        match ClusterHandle::provision(&ClusterConfig::local(), 0, Arc::new(Doubler)) {
            Err(ClusterProvisioningError::NoWorkers) => (),
            other => panic!("expected NoWorkers, got {:?}", other.map(|_| ())),
        }
    }
}
