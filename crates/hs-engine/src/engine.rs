//! The sweep lifecycle and optimization loop.

use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use hs_cluster::{ClusterConfig, ClusterHandle, EvalReply, EvalRequest, JobTicket};
use hs_optimizer::{
    build_optimizer, Optimizer, OptimizerKind, Proposal, RunHistory, Scenario, Trial,
    TrialOutcome, TrialRecord,
};
use hs_space::SearchSpaceSource;
use hs_types::errors::HsError;
use hs_types::overrides::Override;
use hs_types::HsResult;

use crate::launcher::{Launcher, LauncherExecutor};

/// Lifecycle of a sweep engine. Transitions are strictly ordered; calling
/// an operation out of order is an [`HsError::State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Uninitialized,
    Ready,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for SweepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-trial progress notifications, delivered on an optional channel.
#[derive(Debug, Clone)]
pub enum SweepEvent {
    TrialStarted {
        trial_number: usize,
        overrides: Vec<String>,
    },
    TrialFinished {
        trial_number: usize,
        objective: f64,
    },
    TrialFailed {
        trial_number: usize,
        error: String,
    },
    NewIncumbent {
        trial_number: usize,
        objective: f64,
    },
}

/// Everything the engine needs to run a sweep, bound at setup time.
pub struct EngineContext {
    pub launcher: Arc<dyn Launcher>,
    pub scenario: Scenario,
    pub cluster: ClusterConfig,
    pub optimizer: OptimizerKind,
    /// Sweep-level worker count; conflicts with a configured cluster count.
    pub worker_count: Option<usize>,
    pub events: Option<Sender<SweepEvent>>,
}

impl EngineContext {
    pub fn new(launcher: Arc<dyn Launcher>, scenario: Scenario) -> Self {
        Self {
            launcher,
            scenario,
            cluster: ClusterConfig::local(),
            optimizer: OptimizerKind::default(),
            worker_count: None,
            events: None,
        }
    }

    pub fn with_cluster(mut self, cluster: ClusterConfig) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_optimizer(mut self, kind: OptimizerKind) -> Self {
        self.optimizer = kind;
        self
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn with_events(mut self, sender: Sender<SweepEvent>) -> Self {
        self.events = Some(sender);
        self
    }
}

/// Outcome of a finished sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    /// Best configuration as `param=value` strings in declaration order.
    pub best_overrides: Vec<String>,
    pub incumbent_value: Option<f64>,
    pub trials_finished: usize,
    pub trials_failed: usize,
}

/// Drives a full hyperparameter sweep: resolve the search space, provision
/// the worker pool, run the propose/observe loop, persist the run history,
/// and always tear the pool down on the way out.
pub struct SweepEngine {
    source: SearchSpaceSource,
    state: SweepState,
    context: Option<EngineContext>,
    cluster_teardowns: usize,
}

impl SweepEngine {
    pub fn new(source: impl Into<SearchSpaceSource>) -> Self {
        Self {
            source: source.into(),
            state: SweepState::Uninitialized,
            context: None,
            cluster_teardowns: 0,
        }
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    /// How many worker pools this engine has released. Every sweep that
    /// reaches provisioning adds exactly one, whatever its outcome.
    pub fn cluster_teardowns(&self) -> usize {
        self.cluster_teardowns
    }

    /// Bind the launcher, scenario, and cluster without starting anything.
    pub fn setup(&mut self, context: EngineContext) -> HsResult<()> {
        if self.state != SweepState::Uninitialized {
            return Err(HsError::State(format!(
                "setup called in state '{}', expected 'uninitialized'",
                self.state
            )));
        }
        context.scenario.validate()?;
        self.context = Some(context);
        self.state = SweepState::Ready;
        Ok(())
    }

    /// Run the sweep to completion.
    ///
    /// `initial_overrides` are fixed `key=value` settings passed to every
    /// launch underneath the swept parameters. The cluster is released on
    /// every exit path, including mid-loop failures.
    pub async fn sweep(&mut self, initial_overrides: Vec<Override>) -> HsResult<SweepResult> {
        if self.state != SweepState::Ready {
            return Err(HsError::State(format!(
                "sweep called in state '{}', expected 'ready'",
                self.state
            )));
        }
        self.state = SweepState::Running;

        // Every fallible step runs in execute() so any failure, from space
        // resolution through the loop itself, lands in the same verdict.
        match self.execute(initial_overrides).await {
            Ok(result) => {
                self.state = SweepState::Completed;
                info!(
                    finished = result.trials_finished,
                    failed = result.trials_failed,
                    incumbent = ?result.incumbent_value,
                    "sweep completed"
                );
                Ok(result)
            }
            Err(err) => {
                self.state = SweepState::Failed;
                error!(%err, "sweep failed");
                Err(err)
            }
        }
    }

    async fn execute(&mut self, initial_overrides: Vec<Override>) -> HsResult<SweepResult> {
        let (launcher, scenario, cluster_config, optimizer_kind, requested_workers, events) = {
            let context = self
                .context
                .as_ref()
                .ok_or_else(|| HsError::State("sweep engine lost its context".to_string()))?;
            (
                Arc::clone(&context.launcher),
                context.scenario.clone(),
                context.cluster.clone(),
                context.optimizer,
                context.worker_count,
                context.events.clone(),
            )
        };

        let space = self.source.resolve(Some(scenario.seed))?;
        let worker_count = cluster_config.resolve_worker_count(requested_workers)?;

        let executor = Arc::new(LauncherExecutor::new(
            launcher,
            initial_overrides,
            scenario.budget_variable.clone(),
        ));
        let mut cluster = ClusterHandle::provision(&cluster_config, worker_count, executor)?;
        info!(
            run = %scenario.name,
            n_trials = scenario.n_trials,
            worker_count,
            optimizer = ?optimizer_kind,
            "starting sweep"
        );

        let mut optimizer = build_optimizer(optimizer_kind, space, &scenario);

        let outcome = run_loop(
            &mut cluster,
            optimizer.as_mut(),
            &scenario,
            events.as_ref(),
        )
        .await;

        // Teardown happens before the result is inspected so no exit path
        // can leak the pool.
        cluster.shutdown().await;
        self.cluster_teardowns += cluster.teardown_count();

        outcome
    }
}

/// The propose/submit/observe loop, up to `worker_count` evaluations
/// outstanding at once. Kept apart from [`SweepEngine::execute`] so teardown
/// wraps it unconditionally.
async fn run_loop(
    cluster: &mut ClusterHandle,
    optimizer: &mut dyn Optimizer,
    scenario: &Scenario,
    events: Option<&Sender<SweepEvent>>,
) -> HsResult<SweepResult> {
    let started = Instant::now();
    let worker_count = cluster.worker_count();
    let mut history = RunHistory::new(scenario.name.clone(), scenario.seed);
    let mut pending: HashMap<Uuid, (Proposal, Trial)> = HashMap::new();
    let mut in_flight: JoinSet<EvalReply> = JoinSet::new();
    let mut proposed = 0usize;
    let mut best_so_far: Option<f64> = None;
    let mut walltime_warned = false;

    loop {
        let walltime_exceeded = scenario
            .walltime_limit
            .map(|limit| started.elapsed() >= limit)
            .unwrap_or(false);
        if walltime_exceeded && proposed < scenario.n_trials && !walltime_warned {
            walltime_warned = true;
            warn!(
                elapsed_secs = started.elapsed().as_secs_f64(),
                proposed, "walltime limit reached; draining outstanding trials"
            );
        }

        while !walltime_exceeded && proposed < scenario.n_trials && in_flight.len() < worker_count
        {
            let proposal = optimizer.propose()?;
            let mut trial = Trial::new(
                proposal.trial_number,
                proposal.instance.clone(),
                proposal.budget,
            );
            let trace = proposal.instance.decode();
            debug!(
                trial = proposal.trial_number,
                overrides = %trace,
                budget = ?proposal.budget,
                "proposing trial"
            );
            let overrides = trace.to_strings();
            let ticket: JobTicket = cluster
                .submit(EvalRequest {
                    trial_id: trial.id,
                    trial_number: proposal.trial_number,
                    overrides: trace.overrides,
                    budget: proposal.budget,
                    seed: scenario.seed,
                })
                .await?;
            trial.mark_running(None);
            emit(
                events,
                SweepEvent::TrialStarted {
                    trial_number: proposal.trial_number,
                    overrides,
                },
            );
            pending.insert(trial.id, (proposal, trial));
            in_flight.spawn(ticket.wait());
            proposed += 1;
        }

        let Some(joined) = in_flight.join_next().await else {
            if walltime_exceeded || proposed >= scenario.n_trials {
                break;
            }
            continue;
        };
        let reply = joined
            .map_err(|err| HsError::Internal(format!("evaluation task panicked: {err}")))?;
        let (proposal, mut trial) = pending.remove(&reply.trial_id).ok_or_else(|| {
            HsError::Internal(format!(
                "reply for unknown trial id {} (trial {})",
                reply.trial_id, reply.trial_number
            ))
        })?;

        trial.worker_id = reply.worker_id.map(|w| format!("worker-{w}"));
        let outcome = match reply.outcome {
            Ok(objective) => {
                trial.mark_completed();
                emit(
                    events,
                    SweepEvent::TrialFinished {
                        trial_number: proposal.trial_number,
                        objective,
                    },
                );
                TrialOutcome::Success { objective }
            }
            Err(err) => {
                let message = err.to_string();
                trial.mark_failed(message.clone());
                warn!(trial = proposal.trial_number, %message, "trial failed");
                emit(
                    events,
                    SweepEvent::TrialFailed {
                        trial_number: proposal.trial_number,
                        error: message.clone(),
                    },
                );
                TrialOutcome::Failure { message }
            }
        };
        let record = TrialRecord {
            trial_number: trial.trial_number,
            trial_id: trial.id,
            overrides: trial.instance.decode().to_strings(),
            budget: trial.budget,
            objective: outcome.objective(),
            status: trial.status,
            worker_id: trial.worker_id.clone(),
            error: trial.error.clone(),
            duration_secs: Some(reply.duration.as_secs_f64()),
        };

        optimizer.observe(&proposal, &outcome);
        if let Some(best) = optimizer.incumbent() {
            if best_so_far != Some(best.objective) {
                best_so_far = Some(best.objective);
                emit(
                    events,
                    SweepEvent::NewIncumbent {
                        trial_number: best.trial_number,
                        objective: best.objective,
                    },
                );
            }
        }
        history.record(record);

        if in_flight.is_empty() && (proposed >= scenario.n_trials || walltime_exceeded) {
            break;
        }
    }

    if let Some(base) = &scenario.output_directory {
        history.save(base)?;
    }

    let (best_overrides, incumbent_value) = match optimizer.incumbent() {
        Some(best) => (best.instance.decode().to_strings(), Some(best.objective)),
        None => (Vec::new(), None),
    };
    Ok(SweepResult {
        best_overrides,
        incumbent_value,
        trials_finished: history.stats.finished,
        trials_failed: history.stats.failed,
    })
}

fn emit(events: Option<&Sender<SweepEvent>>, event: SweepEvent) {
    if let Some(sender) = events {
        // A gone receiver just means nobody is listening.
        let _ = sender.send(event);
    }
}
