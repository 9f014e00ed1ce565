//! # hs-space
//!
//! Search-space encoding for Hypersweep.
//!
//! Translates a declarative, possibly-nested search-space description into a
//! formal, optimizer-consumable [`SearchSpace`] with typed parameters,
//! condition clauses, and forbidden clauses, and decodes sampled
//! [`ConfigurationInstance`]s back into the declarative override shape the
//! evaluation function expects.

mod declarative;
mod document;
mod instance;
mod space;

pub use declarative::{encode, SearchSpaceSource};
pub use document::{SpaceDocument, FORMAT_VERSION};
pub use instance::ConfigurationInstance;
pub use space::{
    Condition, ConditionOp, ForbiddenClause, ForbiddenTerm, ParameterDef, ParameterKind,
    SearchSpace,
};
