//! Cluster configuration and worker-count resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use hs_types::errors::ConfigurationError;

/// Which execution substrate hosts the workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClusterBackend {
    /// In-process worker pool on the local machine.
    Local,
    /// An external job-queue cluster. Described here so configs round-trip,
    /// but this process cannot provision it.
    JobQueue { address: String, namespace: String },
}

impl Default for ClusterBackend {
    fn default() -> Self {
        Self::Local
    }
}

impl ClusterBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::JobQueue { .. } => "job_queue",
        }
    }
}

/// Resource requirements for a single worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResources {
    /// CPUs per worker (fractional ok).
    pub num_cpus: f64,
    /// GPUs per worker (0 = no GPU).
    pub num_gpus: f64,
    /// Memory in bytes (0 = no limit).
    pub memory_bytes: u64,
    /// Custom resource requirements.
    pub custom: HashMap<String, f64>,
}

impl Default for WorkerResources {
    fn default() -> Self {
        Self {
            num_cpus: 1.0,
            num_gpus: 0.0,
            memory_bytes: 0,
            custom: HashMap::new(),
        }
    }
}

/// Full cluster description for one sweep.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub backend: ClusterBackend,

    /// Worker count from the cluster config itself. May also arrive as an
    /// explicit sweep-level setting; see [`ClusterConfig::resolve_worker_count`].
    pub worker_count: Option<usize>,

    pub resources: WorkerResources,
}

impl ClusterConfig {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: ClusterBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn with_resources(mut self, resources: WorkerResources) -> Self {
        self.resources = resources;
        self
    }

    /// Resolve the effective worker count against an explicit sweep-level
    /// setting. Specifying both is rejected outright rather than silently
    /// preferring one source; with neither, the machine's available
    /// parallelism is used.
    pub fn resolve_worker_count(
        &self,
        explicit: Option<usize>,
    ) -> Result<usize, ConfigurationError> {
        match (explicit, self.worker_count) {
            (Some(explicit), Some(configured)) => {
                Err(ConfigurationError::WorkerCountConflict {
                    explicit,
                    configured,
                })
            }
            (Some(count), None) | (None, Some(count)) => Ok(count),
            (None, None) => Ok(std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)),
        }
    }
}
