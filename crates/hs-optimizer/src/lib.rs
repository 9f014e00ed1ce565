//! # hs-optimizer
//!
//! The black-box optimizer side of Hypersweep: the narrow
//! propose/observe/incumbent protocol the sweep engine drives, built-in
//! reference backends (random and surrogate search), the evaluation scenario,
//! trial tracking, and the on-disk run history artifact.

mod history;
mod optimizer;
mod scenario;
mod trial;

pub use history::{RunHistory, RunStats, TrialRecord};
pub use optimizer::{
    build_optimizer, BudgetSchedule, Optimizer, OptimizerKind, Proposal, RandomOptimizer,
    SurrogateOptimizer,
};
pub use scenario::{ObjectiveDirection, Scenario};
pub use trial::{Incumbent, Trial, TrialOutcome, TrialResult, TrialStatus};
