//! The job-invocation seam between the sweep loop and the outer runner.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use hs_cluster::{EvalRequest, TrialExecutor};
use hs_types::errors::EvaluationError;
use hs_types::overrides::Override;
use hs_types::value::ParameterValue;

/// Flattened configuration handed to an in-process task function.
pub type ValueMap = HashMap<String, ParameterValue>;

/// Launches one job with the given overrides and reports its objective.
///
/// This is the boundary the outer experiment runner plugs into; the sweep
/// loop never sees how a job actually runs.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(
        &self,
        overrides: &[Override],
        seed: Option<u64>,
    ) -> Result<f64, EvaluationError>;
}

/// In-process launcher wrapping a plain task function.
///
/// Overrides are applied on top of a base configuration map; inactive
/// parameters arrive as [`ParameterValue::Inactive`] so the task function can
/// distinguish "off" from a real value.
pub struct FnLauncher {
    base: ValueMap,
    task: Arc<dyn Fn(&ValueMap) -> Result<f64, String> + Send + Sync>,
}

impl FnLauncher {
    pub fn new<F>(task: F) -> Self
    where
        F: Fn(&ValueMap) -> Result<f64, String> + Send + Sync + 'static,
    {
        Self {
            base: ValueMap::new(),
            task: Arc::new(task),
        }
    }

    pub fn with_base(mut self, base: ValueMap) -> Self {
        self.base = base;
        self
    }
}

#[async_trait]
impl Launcher for FnLauncher {
    async fn launch(
        &self,
        overrides: &[Override],
        _seed: Option<u64>,
    ) -> Result<f64, EvaluationError> {
        let mut config = self.base.clone();
        for o in overrides {
            config.insert(o.key.clone(), o.value.clone());
        }
        (self.task)(&config).map_err(|message| EvaluationError::TaskFailed {
            trial_number: 0,
            message,
        })
    }
}

/// Adapts a [`Launcher`] to the cluster's [`TrialExecutor`] seam.
///
/// Base overrides come first so trial overrides win on key collision, and the
/// fidelity budget is injected under the scenario's budget variable when the
/// proposal carries one.
pub struct LauncherExecutor {
    launcher: Arc<dyn Launcher>,
    base_overrides: Vec<Override>,
    budget_variable: Option<String>,
}

impl LauncherExecutor {
    pub fn new(
        launcher: Arc<dyn Launcher>,
        base_overrides: Vec<Override>,
        budget_variable: Option<String>,
    ) -> Self {
        Self {
            launcher,
            base_overrides,
            budget_variable,
        }
    }
}

#[async_trait]
impl TrialExecutor for LauncherExecutor {
    async fn execute(&self, request: &EvalRequest) -> Result<f64, EvaluationError> {
        let mut overrides = self.base_overrides.clone();
        overrides.extend(request.overrides.iter().cloned());
        if let (Some(variable), Some(budget)) = (&self.budget_variable, request.budget) {
            overrides.push(Override::new(variable.clone(), budget));
        }
        self.launcher
            .launch(&overrides, Some(request.seed))
            .await
            .map_err(|err| match err {
                EvaluationError::TaskFailed { message, .. } => EvaluationError::TaskFailed {
                    trial_number: request.trial_number,
                    message,
                },
                other => other,
            })
    }
}
