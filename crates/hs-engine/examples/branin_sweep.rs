//! Minimal end-to-end sweep over the Branin function.
//!
//! Declares the search space the same way a config front end would (a
//! declarative mapping), runs ten trials on a local two-worker pool, and
//! prints the incumbent.
//!
//! Run with: `cargo run --example branin_sweep`

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use hs_engine::{EngineContext, FnLauncher, SweepEngine, ValueMap};
use hs_optimizer::{OptimizerKind, Scenario};
use hs_space::SearchSpaceSource;

fn branin(config: &ValueMap) -> Result<f64, String> {
    let x0 = config["x0"].as_f64().ok_or("missing x0")?;
    let x1 = config["x1"].as_f64().ok_or("missing x1")?;
    let b = 5.1 / (4.0 * std::f64::consts::PI.powi(2));
    let c = 5.0 / std::f64::consts::PI;
    let t = 1.0 / (8.0 * std::f64::consts::PI);
    Ok((x1 - b * x0 * x0 + c * x0 - 6.0).powi(2) + 10.0 * (1.0 - t) * x0.cos() + 10.0)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let space = SearchSpaceSource::from(json!({
        "hyperparameters": {
            "x0": { "type": "uniform_float", "lower": -5.0, "upper": 10.0 },
            "x1": { "type": "uniform_float", "lower": 0.0, "upper": 15.0 },
        }
    }));

    let scenario = Scenario::new("branin").with_n_trials(10).with_seed(42);
    let mut engine = SweepEngine::new(space);
    let context = EngineContext::new(Arc::new(FnLauncher::new(branin)), scenario)
        .with_optimizer(OptimizerKind::Surrogate)
        .with_worker_count(2);
    engine.setup(context)?;

    let result = engine.sweep(Vec::new()).await?;
    println!(
        "best objective {:?} at {}",
        result.incumbent_value,
        result.best_overrides.join(" ")
    );
    Ok(())
}
