pub mod errors;
pub mod overrides;
pub mod value;

pub use errors::{
    ClusterProvisioningError, ConfigurationError, EvaluationError, HsError, HsResult,
};
pub use overrides::{Override, OverrideTrace};
pub use value::ParameterValue;
