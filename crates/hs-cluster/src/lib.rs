//! # hs-cluster
//!
//! Worker-pool provisioning for Hypersweep: cluster configuration, the
//! executor seam the engine plugs user task functions into, and a local
//! tokio-backed pool with ticketed dispatch and idempotent teardown.

mod config;
mod pool;

pub use config::{ClusterBackend, ClusterConfig, WorkerResources};
pub use pool::{ClusterHandle, EvalReply, EvalRequest, JobTicket, TrialExecutor};
