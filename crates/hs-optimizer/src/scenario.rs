//! Evaluation scenario: run budget, fidelity bounds, seed, output location.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use hs_types::errors::ConfigurationError;

/// Whether the objective is minimized or maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Minimize,
    Maximize,
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Minimize
    }
}

impl ObjectiveDirection {
    /// Whether `candidate` strictly improves on `current`.
    pub fn improves(&self, candidate: f64, current: f64) -> bool {
        match self {
            Self::Minimize => candidate < current,
            Self::Maximize => candidate > current,
        }
    }

    /// The objective value used to penalize failed trials.
    pub fn penalty(&self) -> f64 {
        match self {
            Self::Minimize => f64::INFINITY,
            Self::Maximize => f64::NEG_INFINITY,
        }
    }
}

/// Static parameters of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Run name; namespaces the on-disk artifacts.
    pub name: String,

    /// Maximum number of evaluations.
    pub n_trials: usize,

    /// Optional wall-clock limit for the whole sweep.
    pub walltime_limit: Option<Duration>,

    /// Seed governing sampling and encoding tie-breaks.
    pub seed: u64,

    /// Where run artifacts (run history) are written. `None` disables them.
    pub output_directory: Option<PathBuf>,

    /// Name of the metric being optimized.
    pub objective: String,

    pub direction: ObjectiveDirection,

    /// Lower fidelity bound for multi-fidelity runs.
    pub min_budget: Option<f64>,

    /// Upper fidelity bound for multi-fidelity runs.
    pub max_budget: Option<f64>,

    /// Config field the fidelity budget is injected into (e.g. "max_epochs").
    pub budget_variable: Option<String>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            n_trials: 100,
            walltime_limit: None,
            seed: 0,
            output_directory: None,
            objective: "objective".to_string(),
            direction: ObjectiveDirection::Minimize,
            min_budget: None,
            max_budget: None,
            budget_variable: None,
        }
    }

    pub fn with_n_trials(mut self, n: usize) -> Self {
        self.n_trials = n;
        self
    }

    pub fn with_walltime_limit(mut self, limit: Duration) -> Self {
        self.walltime_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    pub fn with_objective(mut self, metric: &str, direction: ObjectiveDirection) -> Self {
        self.objective = metric.to_string();
        self.direction = direction;
        self
    }

    pub fn with_budget(
        mut self,
        min_budget: f64,
        max_budget: f64,
        budget_variable: impl Into<String>,
    ) -> Self {
        self.min_budget = Some(min_budget);
        self.max_budget = Some(max_budget);
        self.budget_variable = Some(budget_variable.into());
        self
    }

    /// Whether this is a multi-fidelity scenario.
    pub fn is_multi_fidelity(&self) -> bool {
        self.min_budget.is_some() || self.max_budget.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.n_trials == 0 {
            return Err(ConfigurationError::MalformedSpec {
                parameter: "n_trials".to_string(),
                message: "trial budget must be at least 1".to_string(),
            });
        }
        match (self.min_budget, self.max_budget) {
            (None, None) => {}
            (Some(min), Some(max)) => {
                if self.budget_variable.is_none() {
                    return Err(ConfigurationError::MissingBudgetVariable);
                }
                if min <= 0.0 || min >= max {
                    return Err(ConfigurationError::InvalidBudgetBounds { min, max });
                }
            }
            (min, max) => {
                return Err(ConfigurationError::InvalidBudgetBounds {
                    min: min.unwrap_or(f64::NAN),
                    max: max.unwrap_or(f64::NAN),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let scenario = Scenario::new("testrun")
            .with_n_trials(10)
            .with_seed(123)
            .with_objective("val_loss", ObjectiveDirection::Minimize);
        assert_eq!(scenario.n_trials, 10);
        assert_eq!(scenario.seed, 123);
        assert_eq!(scenario.objective, "val_loss");
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn budget_bounds_require_budget_variable() {
        let mut scenario = Scenario::new("mf");
        scenario.min_budget = Some(5.0);
        scenario.max_budget = Some(50.0);
        match scenario.validate() {
            Err(ConfigurationError::MissingBudgetVariable) => (),
            other => panic!("expected missing budget variable, got {other:?}"),
        }
    }

    #[test]
    fn inverted_budget_bounds_are_rejected() {
        let scenario = Scenario::new("mf").with_budget(50.0, 5.0, "max_epochs");
        assert!(matches!(
            scenario.validate(),
            Err(ConfigurationError::InvalidBudgetBounds { .. })
        ));
    }

    #[test]
    fn direction_semantics() {
        assert!(ObjectiveDirection::Minimize.improves(1.0, 2.0));
        assert!(!ObjectiveDirection::Minimize.improves(2.0, 2.0));
        assert!(ObjectiveDirection::Maximize.improves(2.0, 1.0));
        assert!(ObjectiveDirection::Minimize.penalty().is_infinite());
    }
}
