//! The optimizer protocol and the built-in search backends.
//!
//! The sweep engine only ever sees the [`Optimizer`] trait: propose a
//! configuration, observe its outcome, report the incumbent. Concrete
//! backends are selected by configuration at construction time via
//! [`build_optimizer`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

use hs_space::{ConfigurationInstance, SearchSpace};
use hs_types::errors::ConfigurationError;
use hs_types::HsResult;

use crate::scenario::{ObjectiveDirection, Scenario};
use crate::trial::{Incumbent, TrialOutcome, TrialResult};

/// A configuration proposed for evaluation, optionally carrying a fidelity
/// budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub trial_number: usize,
    pub instance: ConfigurationInstance,
    pub budget: Option<f64>,
}

/// Narrow protocol between the sweep engine and any optimizer backend.
pub trait Optimizer: Send {
    /// Propose the next configuration to evaluate.
    fn propose(&mut self) -> HsResult<Proposal>;

    /// Report the outcome of a proposed configuration. Failures are recorded
    /// as penalized observations; they never abort the optimizer.
    fn observe(&mut self, proposal: &Proposal, outcome: &TrialOutcome);

    /// Best result observed so far.
    fn incumbent(&self) -> Option<&TrialResult>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}

/// Geometric fidelity-budget ramp from `min_budget` to `max_budget` across
/// the trial budget (successive-halving flavored: early trials run cheap,
/// late trials at full fidelity).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetSchedule {
    min_budget: f64,
    max_budget: f64,
    n_trials: usize,
}

impl BudgetSchedule {
    pub fn from_scenario(scenario: &Scenario) -> Option<Self> {
        match (scenario.min_budget, scenario.max_budget) {
            (Some(min_budget), Some(max_budget)) => Some(Self {
                min_budget,
                max_budget,
                n_trials: scenario.n_trials,
            }),
            _ => None,
        }
    }

    pub fn budget_for(&self, trial_number: usize) -> f64 {
        if self.n_trials <= 1 {
            return self.max_budget;
        }
        let t = (trial_number.min(self.n_trials - 1)) as f64 / (self.n_trials - 1) as f64;
        self.min_budget * (self.max_budget / self.min_budget).powf(t)
    }
}

/// Independent seeded random sampling over the search space.
pub struct RandomOptimizer {
    space: SearchSpace,
    rng: ChaCha8Rng,
    direction: ObjectiveDirection,
    schedule: Option<BudgetSchedule>,
    next_trial: usize,
    incumbent: Incumbent,
}

impl RandomOptimizer {
    pub fn new(space: SearchSpace, scenario: &Scenario) -> Self {
        let seed = space.seed.unwrap_or(scenario.seed);
        Self {
            space,
            rng: ChaCha8Rng::seed_from_u64(seed),
            direction: scenario.direction,
            schedule: BudgetSchedule::from_scenario(scenario),
            next_trial: 0,
            incumbent: Incumbent::new(),
        }
    }
}

impl Optimizer for RandomOptimizer {
    fn propose(&mut self) -> HsResult<Proposal> {
        let instance = self.space.sample(&mut self.rng)?;
        let trial_number = self.next_trial;
        self.next_trial += 1;
        Ok(Proposal {
            trial_number,
            instance,
            budget: self.schedule.map(|s| s.budget_for(trial_number)),
        })
    }

    fn observe(&mut self, proposal: &Proposal, outcome: &TrialOutcome) {
        match outcome {
            TrialOutcome::Success { objective } => {
                let result = TrialResult {
                    trial_id: uuid::Uuid::new_v4(),
                    trial_number: proposal.trial_number,
                    objective: *objective,
                    instance: proposal.instance.clone(),
                    budget: proposal.budget,
                };
                if self.incumbent.update(&result, self.direction) {
                    debug!(
                        trial = proposal.trial_number,
                        objective, "new incumbent (random)"
                    );
                }
            }
            TrialOutcome::Failure { message } => {
                warn!(trial = proposal.trial_number, %message, "trial failed");
            }
        }
    }

    fn incumbent(&self) -> Option<&TrialResult> {
        self.incumbent.best()
    }

    fn name(&self) -> &str {
        "random"
    }
}

/// Surrogate-guided search: tracks observed (configuration, objective) pairs
/// and biases sampling toward the neighborhood of the best-known point.
///
/// Exploration draws a fresh sample; exploitation perturbs the best observed
/// configuration within a fraction of each parameter's range. Failed trials
/// enter the observation set at the penalty objective so their neighborhoods
/// stop being attractive.
pub struct SurrogateOptimizer {
    space: SearchSpace,
    rng: ChaCha8Rng,
    direction: ObjectiveDirection,
    schedule: Option<BudgetSchedule>,
    next_trial: usize,
    incumbent: Incumbent,
    observations: Vec<(ConfigurationInstance, f64)>,
    exploration_weight: f64,
    perturbation_scale: f64,
}

impl SurrogateOptimizer {
    pub fn new(space: SearchSpace, scenario: &Scenario) -> Self {
        let seed = space.seed.unwrap_or(scenario.seed);
        Self {
            space,
            rng: ChaCha8Rng::seed_from_u64(seed),
            direction: scenario.direction,
            schedule: BudgetSchedule::from_scenario(scenario),
            next_trial: 0,
            incumbent: Incumbent::new(),
            observations: Vec::new(),
            exploration_weight: 0.3,
            perturbation_scale: 0.1,
        }
    }

    pub fn with_exploration_weight(mut self, weight: f64) -> Self {
        self.exploration_weight = weight;
        self
    }

    fn best_observation(&self) -> Option<&(ConfigurationInstance, f64)> {
        let mut best: Option<&(ConfigurationInstance, f64)> = None;
        for obs in &self.observations {
            if best
                .map(|current| self.direction.improves(obs.1, current.1))
                .unwrap_or(true)
            {
                best = Some(obs);
            }
        }
        best
    }
}

impl Optimizer for SurrogateOptimizer {
    fn propose(&mut self) -> HsResult<Proposal> {
        let explore =
            self.observations.is_empty() || self.rng.gen::<f64>() < self.exploration_weight;
        let instance = if explore {
            self.space.sample(&mut self.rng)?
        } else {
            // best_observation is Some here: observations is non-empty.
            let base = self
                .best_observation()
                .map(|(instance, _)| instance.clone())
                .unwrap_or_default();
            self.space
                .sample_perturbed(&base, self.perturbation_scale, &mut self.rng)?
        };
        let trial_number = self.next_trial;
        self.next_trial += 1;
        Ok(Proposal {
            trial_number,
            instance,
            budget: self.schedule.map(|s| s.budget_for(trial_number)),
        })
    }

    fn observe(&mut self, proposal: &Proposal, outcome: &TrialOutcome) {
        match outcome {
            TrialOutcome::Success { objective } => {
                self.observations
                    .push((proposal.instance.clone(), *objective));
                let result = TrialResult {
                    trial_id: uuid::Uuid::new_v4(),
                    trial_number: proposal.trial_number,
                    objective: *objective,
                    instance: proposal.instance.clone(),
                    budget: proposal.budget,
                };
                if self.incumbent.update(&result, self.direction) {
                    debug!(
                        trial = proposal.trial_number,
                        objective, "new incumbent (surrogate)"
                    );
                }
            }
            TrialOutcome::Failure { message } => {
                warn!(
                    trial = proposal.trial_number,
                    %message,
                    "trial failed; observing penalty"
                );
                self.observations
                    .push((proposal.instance.clone(), self.direction.penalty()));
            }
        }
    }

    fn incumbent(&self) -> Option<&TrialResult> {
        self.incumbent.best()
    }

    fn name(&self) -> &str {
        "surrogate"
    }
}

/// Which optimizer backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Random,
    Surrogate,
}

impl Default for OptimizerKind {
    fn default() -> Self {
        Self::Surrogate
    }
}

impl FromStr for OptimizerKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "surrogate" | "bayesian" => Ok(Self::Surrogate),
            other => Err(ConfigurationError::MalformedSpec {
                parameter: "optimizer".to_string(),
                message: format!("unknown optimizer backend '{other}'"),
            }),
        }
    }
}

/// Construct the configured optimizer backend.
pub fn build_optimizer(
    kind: OptimizerKind,
    space: SearchSpace,
    scenario: &Scenario,
) -> Box<dyn Optimizer> {
    match kind {
        OptimizerKind::Random => Box::new(RandomOptimizer::new(space, scenario)),
        OptimizerKind::Surrogate => Box::new(SurrogateOptimizer::new(space, scenario)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branin_space() -> SearchSpace {
        SearchSpace::new()
            .add_float("x0", -5.0, 10.0)
            .add_float("x1", 0.0, 15.0)
    }

    fn scenario() -> Scenario {
        Scenario::new("test").with_n_trials(20).with_seed(42)
    }

    fn success(objective: f64) -> TrialOutcome {
        TrialOutcome::Success { objective }
    }

    #[test]
    fn random_proposals_stay_in_bounds() {
        let space = branin_space();
        let mut optimizer = RandomOptimizer::new(space.clone(), &scenario());
        for i in 0..20 {
            let proposal = optimizer.propose().unwrap();
            assert_eq!(proposal.trial_number, i);
            assert!(proposal.instance.within_bounds(&space));
            assert!(proposal.budget.is_none());
        }
    }

    #[test]
    fn budget_schedule_ramps_geometrically() {
        let scenario = Scenario::new("mf")
            .with_n_trials(5)
            .with_budget(5.0, 80.0, "max_epochs");
        let schedule = BudgetSchedule::from_scenario(&scenario).unwrap();
        assert!((schedule.budget_for(0) - 5.0).abs() < 1e-9);
        assert!((schedule.budget_for(4) - 80.0).abs() < 1e-9);
        for i in 1..5 {
            assert!(schedule.budget_for(i) > schedule.budget_for(i - 1));
        }
    }

    #[test]
    fn surrogate_exploits_best_observation() {
        let space = SearchSpace::new().add_float("x", 0.0, 100.0);
        let mut optimizer =
            SurrogateOptimizer::new(space.clone(), &scenario()).with_exploration_weight(0.0);

        let seed_proposal = optimizer.propose().unwrap();
        let mut near_ten = seed_proposal.instance.clone();
        near_ten.set("x", hs_types::value::ParameterValue::Float(10.0));
        let observed = Proposal {
            trial_number: seed_proposal.trial_number,
            instance: near_ten,
            budget: None,
        };
        optimizer.observe(&observed, &success(0.1));

        for _ in 0..50 {
            let proposal = optimizer.propose().unwrap();
            let x = proposal.instance.get("x").unwrap().as_f64().unwrap();
            // Perturbation scale is 0.1 of the range around x = 10.
            assert!((0.0..=20.0).contains(&x), "exploit strayed to {x}");
        }
    }

    #[test]
    fn failure_penalty_never_becomes_incumbent() {
        let space = branin_space();
        let mut optimizer = SurrogateOptimizer::new(space, &scenario());
        let proposal = optimizer.propose().unwrap();
        optimizer.observe(
            &proposal,
            &TrialOutcome::Failure {
                message: "boom".to_string(),
            },
        );
        assert!(optimizer.incumbent().is_none());

        let proposal = optimizer.propose().unwrap();
        optimizer.observe(&proposal, &success(1.0));
        assert_eq!(optimizer.incumbent().unwrap().objective, 1.0);
    }

    #[test]
    fn incumbent_is_monotonic_across_observations() {
        let space = branin_space();
        let mut optimizer = RandomOptimizer::new(space, &scenario());
        let mut last_best = f64::INFINITY;
        for objective in [5.0, 3.0, 4.0, 1.0, 2.0] {
            let proposal = optimizer.propose().unwrap();
            optimizer.observe(&proposal, &success(objective));
            let best = optimizer.incumbent().unwrap().objective;
            assert!(best <= last_best);
            last_best = best;
        }
        assert_eq!(last_best, 1.0);
    }

    #[test]
    fn kind_parses_from_config_strings() {
        assert_eq!(OptimizerKind::from_str("random").unwrap(), OptimizerKind::Random);
        assert_eq!(
            OptimizerKind::from_str("bayesian").unwrap(),
            OptimizerKind::Surrogate
        );
        assert!(OptimizerKind::from_str("tpe").is_err());
    }

    #[test]
    fn build_selects_backend_by_kind() {
        let scenario = scenario();
        let optimizer = build_optimizer(OptimizerKind::Random, branin_space(), &scenario);
        assert_eq!(optimizer.name(), "random");
        let optimizer = build_optimizer(OptimizerKind::Surrogate, branin_space(), &scenario);
        assert_eq!(optimizer.name(), "surrogate");
    }
}
