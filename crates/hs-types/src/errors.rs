use thiserror::Error;

/// Main error type for the Hypersweep system
#[derive(Error, Debug)]
pub enum HsError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Cluster provisioning error: {0}")]
    Cluster(#[from] ClusterProvisioningError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Engine state error: {0}")]
    State(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Malformed or inconsistent search-space / scenario input.
///
/// Raised before any evaluation occurs; fatal to the sweep. Each variant
/// identifies the offending parameter or clause.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("parameter '{parameter}' is missing required bound '{field}'")]
    MissingBound { parameter: String, field: String },

    #[error("parameter '{parameter}' has invalid bounds: lower {lower} >= upper {upper}")]
    InvalidBounds {
        parameter: String,
        lower: f64,
        upper: f64,
    },

    #[error("default value {default} of parameter '{parameter}' lies outside the declared bounds/choices")]
    DefaultOutOfBounds { parameter: String, default: String },

    #[error("categorical parameter '{parameter}' has no choices")]
    EmptyChoices { parameter: String },

    #[error("{referenced_by} references unknown parameter '{parameter}'")]
    UnknownParameter {
        parameter: String,
        referenced_by: String,
    },

    #[error("circular condition chain involving parameter '{parameter}'")]
    CircularCondition { parameter: String },

    #[error("malformed parameter spec for '{parameter}': {message}")]
    MalformedSpec { parameter: String, message: String },

    #[error("invalid override '{override_str}': {message}")]
    InvalidOverride {
        override_str: String,
        message: String,
    },

    #[error("worker count specified both explicitly ({explicit}) and in the cluster config ({configured})")]
    WorkerCountConflict { explicit: usize, configured: usize },

    #[error("scenario declares fidelity budget bounds but no budget_variable naming the config field they control")]
    MissingBudgetVariable,

    #[error("invalid budget bounds: min_budget {min} must be positive and below max_budget {max}")]
    InvalidBudgetBounds { min: f64, max: f64 },

    #[error("search space source not recognized: {message}")]
    UnsupportedSource { message: String },

    #[error("invalid search space document: {message}")]
    InvalidDocument { message: String },

    #[error("could not sample a configuration outside the forbidden clauses after {attempts} attempts")]
    ForbiddenExhausted { attempts: usize },
}

/// A single configuration's evaluation failed.
///
/// Recorded as a failed trial and fed back to the optimizer as a penalized
/// result; never aborts the sweep.
#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("task function failed for trial {trial_number}: {message}")]
    TaskFailed {
        trial_number: usize,
        message: String,
    },

    #[error("worker dropped the evaluation for trial {trial_number} before replying")]
    WorkerGone { trial_number: usize },

    #[error("evaluation of trial {trial_number} was cancelled")]
    Cancelled { trial_number: usize },
}

/// The worker pool could not be created or died mid-sweep. Fatal.
#[derive(Error, Debug)]
pub enum ClusterProvisioningError {
    #[error("failed to spawn worker pool: {message}")]
    SpawnFailed { message: String },

    #[error("cluster backend '{backend}' cannot be provisioned by this process")]
    UnsupportedBackend { backend: String },

    #[error("cluster handle was already shut down")]
    AlreadyShutdown,

    #[error("worker count resolved to zero")]
    NoWorkers,
}

/// Result type alias for Hypersweep operations
pub type HsResult<T> = Result<T, HsError>;

/// Macro for creating configuration errors with a formatted message
#[macro_export]
macro_rules! config_error {
    ($param:expr, $($arg:tt)*) => {
        $crate::errors::ConfigurationError::MalformedSpec {
            parameter: $param.to_string(),
            message: format!($($arg)*),
        }
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::errors::HsError::Internal(format!($($arg)*))
    };
}
