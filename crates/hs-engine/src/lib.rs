//! # hs-engine
//!
//! The sweep engine: binds a launcher, scenario, optimizer, and cluster
//! together and drives the propose/evaluate/observe loop to completion,
//! persisting the run history and tearing the worker pool down on every
//! exit path.

mod engine;
mod launcher;

pub use engine::{EngineContext, SweepEngine, SweepEvent, SweepResult, SweepState};
pub use launcher::{FnLauncher, Launcher, LauncherExecutor, ValueMap};
