//! Trial tracking and the incumbent record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hs_space::ConfigurationInstance;

use crate::scenario::ObjectiveDirection;

/// Lifecycle state of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A single trial: one proposed configuration under evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub id: Uuid,
    pub trial_number: usize,
    pub instance: ConfigurationInstance,
    /// Fidelity budget for multi-fidelity runs.
    pub budget: Option<f64>,
    pub status: TrialStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub error: Option<String>,
}

impl Trial {
    pub fn new(trial_number: usize, instance: ConfigurationInstance, budget: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trial_number,
            instance,
            budget,
            status: TrialStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            worker_id: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self, worker_id: Option<String>) {
        self.status = TrialStatus::Running;
        self.started_at = Some(Utc::now());
        self.worker_id = worker_id;
    }

    pub fn mark_completed(&mut self) {
        self.status = TrialStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = TrialStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }
}

/// Outcome of evaluating one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrialOutcome {
    Success { objective: f64 },
    Failure { message: String },
}

impl TrialOutcome {
    pub fn objective(&self) -> Option<f64> {
        match self {
            Self::Success { objective } => Some(*objective),
            Self::Failure { .. } => None,
        }
    }
}

/// Result of a finished trial, as tracked by the incumbent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: Uuid,
    pub trial_number: usize,
    pub objective: f64,
    pub instance: ConfigurationInstance,
    pub budget: Option<f64>,
}

/// Best configuration found so far.
///
/// Monotonic: the recorded objective never worsens within one sweep, and ties
/// keep the earlier-found configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Incumbent {
    best: Option<TrialResult>,
}

impl Incumbent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `result` if it strictly improves on the current best.
    /// Returns whether the incumbent changed.
    pub fn update(&mut self, result: &TrialResult, direction: ObjectiveDirection) -> bool {
        let improved = match &self.best {
            None => true,
            Some(current) => direction.improves(result.objective, current.objective),
        };
        if improved {
            self.best = Some(result.clone());
        }
        improved
    }

    pub fn best(&self) -> Option<&TrialResult> {
        self.best.as_ref()
    }
}
