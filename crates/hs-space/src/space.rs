//! Formal search space: typed parameters, condition clauses, forbidden clauses.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use hs_types::errors::ConfigurationError;
use hs_types::value::ParameterValue;

use crate::instance::ConfigurationInstance;

/// Upper bound on rejection-sampling retries when forbidden clauses are dense.
const MAX_FORBIDDEN_RETRIES: usize = 128;

/// Describes how a parameter is typed and bounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterKind {
    /// Continuous uniform range [lower, upper]; `log` samples in log-space.
    UniformFloat { lower: f64, upper: f64, log: bool },
    /// Integer range [lower, upper] inclusive; `log` samples in log-space.
    UniformInt { lower: i64, upper: i64, log: bool },
    /// Categorical choices, order-preserving.
    Categorical { choices: Vec<serde_json::Value> },
    /// Fixed value that still appears in every configuration.
    Constant { value: serde_json::Value },
}

/// A single parameter dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub kind: ParameterKind,
    /// Declared default. Must lie within bounds/choices; violations are
    /// construction-time failures, never silently clamped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ParameterValue>,
}

impl ParameterDef {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<ParameterValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Whether `value` lies within this parameter's bounds/choices.
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match &self.kind {
            ParameterKind::UniformFloat { lower, upper, .. } => value
                .as_f64()
                .map(|v| v >= *lower && v <= *upper)
                .unwrap_or(false),
            ParameterKind::UniformInt { lower, upper, .. } => value
                .as_i64()
                .map(|v| v >= *lower && v <= *upper)
                .unwrap_or(false),
            ParameterKind::Categorical { choices } => {
                choices.iter().any(|c| values_equal(value, c))
            }
            ParameterKind::Constant { value: fixed } => values_equal(value, fixed),
        }
    }

    /// The declared default, or the inferred one: range midpoint (geometric
    /// for log scales), first choice for categoricals.
    pub fn default_or_inferred(&self) -> ParameterValue {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match &self.kind {
            ParameterKind::UniformFloat { lower, upper, log } => {
                if *log {
                    ParameterValue::Float(((lower.ln() + upper.ln()) / 2.0).exp())
                } else {
                    ParameterValue::Float((lower + upper) / 2.0)
                }
            }
            ParameterKind::UniformInt { lower, upper, log } => {
                let mid = if *log {
                    (((*lower as f64).ln() + (*upper as f64).ln()) / 2.0).exp()
                } else {
                    (*lower as f64 + *upper as f64) / 2.0
                };
                ParameterValue::Int((mid.round() as i64).clamp(*lower, *upper))
            }
            ParameterKind::Categorical { choices } => ParameterValue::from_json(
                choices.first().cloned().unwrap_or(serde_json::Value::Null),
            ),
            ParameterKind::Constant { value } => ParameterValue::from_json(value.clone()),
        }
    }

    /// Draw a uniform sample from this parameter's range.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> ParameterValue {
        match &self.kind {
            ParameterKind::UniformFloat { lower, upper, log } => {
                let v = if *log {
                    rng.gen_range(lower.ln()..=upper.ln()).exp()
                } else {
                    rng.gen_range(*lower..=*upper)
                };
                ParameterValue::Float(v.clamp(*lower, *upper))
            }
            ParameterKind::UniformInt { lower, upper, log } => {
                let v = if *log {
                    let raw = rng
                        .gen_range((*lower as f64).ln()..=(*upper as f64).ln())
                        .exp();
                    (raw.round() as i64).clamp(*lower, *upper)
                } else {
                    rng.gen_range(*lower..=*upper)
                };
                ParameterValue::Int(v)
            }
            ParameterKind::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                ParameterValue::from_json(choices[idx].clone())
            }
            ParameterKind::Constant { value } => ParameterValue::from_json(value.clone()),
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match &self.kind {
            ParameterKind::UniformFloat { lower, upper, log } => {
                if lower >= upper {
                    return Err(ConfigurationError::InvalidBounds {
                        parameter: self.name.clone(),
                        lower: *lower,
                        upper: *upper,
                    });
                }
                if *log && *lower <= 0.0 {
                    return Err(ConfigurationError::MalformedSpec {
                        parameter: self.name.clone(),
                        message: format!("log-scale lower bound must be positive, got {lower}"),
                    });
                }
            }
            ParameterKind::UniformInt { lower, upper, log } => {
                if lower >= upper {
                    return Err(ConfigurationError::InvalidBounds {
                        parameter: self.name.clone(),
                        lower: *lower as f64,
                        upper: *upper as f64,
                    });
                }
                if *log && *lower < 1 {
                    return Err(ConfigurationError::MalformedSpec {
                        parameter: self.name.clone(),
                        message: format!("log-scale lower bound must be >= 1, got {lower}"),
                    });
                }
            }
            ParameterKind::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(ConfigurationError::EmptyChoices {
                        parameter: self.name.clone(),
                    });
                }
            }
            ParameterKind::Constant { .. } => {}
        }
        if let Some(default) = &self.default {
            if !self.contains(default) {
                return Err(ConfigurationError::DefaultOutOfBounds {
                    parameter: self.name.clone(),
                    default: default.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Constraint a parent parameter must satisfy for a child to be active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConditionOp {
    Equals { value: serde_json::Value },
    In { values: Vec<serde_json::Value> },
    Range { lower: f64, upper: f64 },
}

impl ConditionOp {
    /// Whether an (active) parent value satisfies this constraint.
    pub fn satisfied_by(&self, value: &ParameterValue) -> bool {
        if value.is_inactive() {
            return false;
        }
        match self {
            Self::Equals { value: expected } => values_equal(value, expected),
            Self::In { values } => values.iter().any(|v| values_equal(value, v)),
            Self::Range { lower, upper } => value
                .as_f64()
                .map(|v| v >= *lower && v <= *upper)
                .unwrap_or(false),
        }
    }
}

/// Rule activating `child` only when `parent` satisfies `op`.
///
/// Multiple conditions on the same child form a conjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub child: String,
    pub parent: String,
    pub op: ConditionOp,
}

/// One `parameter == value` term of a forbidden clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenTerm {
    pub parameter: String,
    pub value: serde_json::Value,
}

/// A conjunction of equality terms that is disallowed outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenClause {
    pub terms: Vec<ForbiddenTerm>,
}

impl ForbiddenClause {
    pub fn new<S: Into<String>>(terms: Vec<(S, serde_json::Value)>) -> Self {
        Self {
            terms: terms
                .into_iter()
                .map(|(parameter, value)| ForbiddenTerm {
                    parameter: parameter.into(),
                    value,
                })
                .collect(),
        }
    }

    /// All terms match the (active) assignment.
    pub fn matches(&self, instance: &ConfigurationInstance) -> bool {
        !self.terms.is_empty()
            && self.terms.iter().all(|term| {
                instance
                    .get(&term.parameter)
                    .map(|v| !v.is_inactive() && values_equal(v, &term.value))
                    .unwrap_or(false)
            })
    }
}

/// The formal search space: an ordered list of parameter definitions plus
/// condition and forbidden clauses.
///
/// Parameter declaration order is preserved end to end so that encoding
/// output is reproducible; clause order carries no meaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    pub parameters: Vec<ParameterDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbiddens: Vec<ForbiddenClause>,
    /// Seed recorded at encoding time, governing sampling tie-breaks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn add_param(mut self, def: ParameterDef) -> Self {
        self.parameters.push(def);
        self
    }

    pub fn add_float(self, name: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.add_param(ParameterDef::new(
            name,
            ParameterKind::UniformFloat {
                lower,
                upper,
                log: false,
            },
        ))
    }

    pub fn add_log_float(self, name: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.add_param(ParameterDef::new(
            name,
            ParameterKind::UniformFloat {
                lower,
                upper,
                log: true,
            },
        ))
    }

    pub fn add_int(self, name: impl Into<String>, lower: i64, upper: i64) -> Self {
        self.add_param(ParameterDef::new(
            name,
            ParameterKind::UniformInt {
                lower,
                upper,
                log: false,
            },
        ))
    }

    pub fn add_categorical(
        self,
        name: impl Into<String>,
        choices: Vec<serde_json::Value>,
    ) -> Self {
        self.add_param(ParameterDef::new(name, ParameterKind::Categorical { choices }))
    }

    pub fn add_constant(self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.add_param(ParameterDef::new(name, ParameterKind::Constant { value }))
    }

    pub fn add_condition(
        mut self,
        child: impl Into<String>,
        parent: impl Into<String>,
        op: ConditionOp,
    ) -> Self {
        self.conditions.push(Condition {
            child: child.into(),
            parent: parent.into(),
            op,
        });
        self
    }

    pub fn add_forbidden(mut self, clause: ForbiddenClause) -> Self {
        self.forbiddens.push(clause);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Validate the whole space: unique names, sane bounds, in-bounds
    /// defaults, clause references that exist, acyclic conditions.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen: HashMap<&str, ()> = HashMap::new();
        for param in &self.parameters {
            if seen.insert(param.name.as_str(), ()).is_some() {
                return Err(ConfigurationError::MalformedSpec {
                    parameter: param.name.clone(),
                    message: "duplicate parameter name".to_string(),
                });
            }
            param.validate()?;
        }
        for condition in &self.conditions {
            for name in [&condition.child, &condition.parent] {
                if self.param(name).is_none() {
                    return Err(ConfigurationError::UnknownParameter {
                        parameter: name.clone(),
                        referenced_by: format!("condition on '{}'", condition.child),
                    });
                }
            }
            if condition.child == condition.parent {
                return Err(ConfigurationError::CircularCondition {
                    parameter: condition.child.clone(),
                });
            }
        }
        for clause in &self.forbiddens {
            for term in &clause.terms {
                if self.param(&term.parameter).is_none() {
                    return Err(ConfigurationError::UnknownParameter {
                        parameter: term.parameter.clone(),
                        referenced_by: "forbidden clause".to_string(),
                    });
                }
            }
        }
        self.topo_order()?;
        Ok(())
    }

    /// Parameter indices ordered so that every condition parent precedes its
    /// children. Fails on cyclic condition chains.
    pub(crate) fn topo_order(&self) -> Result<Vec<usize>, ConfigurationError> {
        let index: HashMap<&str, usize> = self
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.parameters.len()];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); self.parameters.len()];
        for condition in &self.conditions {
            let (Some(&parent), Some(&child)) = (
                index.get(condition.parent.as_str()),
                index.get(condition.child.as_str()),
            ) else {
                continue; // unknown references are reported by validate()
            };
            children[parent].push(child);
            in_degree[child] += 1;
        }

        // Kahn's algorithm, seeded in declaration order for determinism.
        let mut queue: Vec<usize> = (0..self.parameters.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.parameters.len());
        let mut cursor = 0;
        while cursor < queue.len() {
            let node = queue[cursor];
            cursor += 1;
            order.push(node);
            for &child in &children[node] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push(child);
                }
            }
        }

        if order.len() != self.parameters.len() {
            let stuck = in_degree
                .iter()
                .position(|&d| d > 0)
                .map(|i| self.parameters[i].name.clone())
                .unwrap_or_default();
            return Err(ConfigurationError::CircularCondition { parameter: stuck });
        }
        Ok(order)
    }

    /// Whether `name` is active under the given partial assignment.
    pub fn is_active(&self, name: &str, instance: &ConfigurationInstance) -> bool {
        self.conditions
            .iter()
            .filter(|c| c.child == name)
            .all(|c| {
                instance
                    .get(&c.parent)
                    .map(|v| c.op.satisfied_by(v))
                    .unwrap_or(false)
            })
    }

    /// The first forbidden clause the assignment violates, if any.
    pub fn matching_forbidden(&self, instance: &ConfigurationInstance) -> Option<&ForbiddenClause> {
        self.forbiddens.iter().find(|clause| clause.matches(instance))
    }

    /// Sample a configuration consistent with all conditions and forbidden
    /// clauses. Parents are sampled before children; inactive parameters are
    /// set to the explicit [`ParameterValue::Inactive`] placeholder. Assignments
    /// matching a forbidden clause are rejected and resampled.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> Result<ConfigurationInstance, ConfigurationError> {
        let order = self.topo_order()?;
        for _ in 0..MAX_FORBIDDEN_RETRIES {
            let mut instance = ConfigurationInstance::with_names(
                self.parameters.iter().map(|p| p.name.clone()),
            );
            for &i in &order {
                let param = &self.parameters[i];
                let value = if self.is_active(&param.name, &instance) {
                    param.sample(rng)
                } else {
                    ParameterValue::Inactive
                };
                instance.set(&param.name, value);
            }
            if self.matching_forbidden(&instance).is_none() {
                return Ok(instance);
            }
        }
        Err(ConfigurationError::ForbiddenExhausted {
            attempts: MAX_FORBIDDEN_RETRIES,
        })
    }

    /// Sample a configuration near `base`: numeric parameters are perturbed
    /// by `scale` of their range (log-space for log scales), categoricals are
    /// resampled with probability `scale`. Conditions are re-evaluated against
    /// the perturbed parents, and forbidden assignments are rejected the same
    /// way [`SearchSpace::sample`] rejects them.
    pub fn sample_perturbed(
        &self,
        base: &ConfigurationInstance,
        scale: f64,
        rng: &mut ChaCha8Rng,
    ) -> Result<ConfigurationInstance, ConfigurationError> {
        let order = self.topo_order()?;
        for _ in 0..MAX_FORBIDDEN_RETRIES {
            let mut instance = ConfigurationInstance::with_names(
                self.parameters.iter().map(|p| p.name.clone()),
            );
            for &i in &order {
                let param = &self.parameters[i];
                if !self.is_active(&param.name, &instance) {
                    instance.set(&param.name, ParameterValue::Inactive);
                    continue;
                }
                let value = match (base.get(&param.name), &param.kind) {
                    (
                        Some(ParameterValue::Float(v)),
                        ParameterKind::UniformFloat { lower, upper, log },
                    ) => {
                        let v = if *log {
                            let noise = rng.gen_range(-scale..=scale) * (upper.ln() - lower.ln());
                            (v.ln() + noise).exp()
                        } else {
                            v + rng.gen_range(-scale..=scale) * (upper - lower)
                        };
                        ParameterValue::Float(v.clamp(*lower, *upper))
                    }
                    (
                        Some(ParameterValue::Int(v)),
                        ParameterKind::UniformInt { lower, upper, .. },
                    ) => {
                        let step = (((upper - lower) as f64 * scale).ceil() as i64).max(1);
                        let delta = rng.gen_range(-step..=step);
                        ParameterValue::Int((v + delta).clamp(*lower, *upper))
                    }
                    (Some(v), ParameterKind::Categorical { .. }) if !v.is_inactive() => {
                        if rng.gen::<f64>() < scale {
                            param.sample(rng)
                        } else {
                            v.clone()
                        }
                    }
                    // No usable base value (newly activated or missing): fresh draw.
                    _ => param.sample(rng),
                };
                instance.set(&param.name, value);
            }
            if self.matching_forbidden(&instance).is_none() {
                return Ok(instance);
            }
        }
        Err(ConfigurationError::ForbiddenExhausted {
            attempts: MAX_FORBIDDEN_RETRIES,
        })
    }

    /// The default configuration (declared defaults or inferred ones), with
    /// condition-gated parameters resolved against those defaults.
    pub fn default_configuration(&self) -> Result<ConfigurationInstance, ConfigurationError> {
        let order = self.topo_order()?;
        let mut instance =
            ConfigurationInstance::with_names(self.parameters.iter().map(|p| p.name.clone()));
        for &i in &order {
            let param = &self.parameters[i];
            let value = if self.is_active(&param.name, &instance) {
                param.default_or_inferred()
            } else {
                ParameterValue::Inactive
            };
            instance.set(&param.name, value);
        }
        Ok(instance)
    }
}

/// Compare a parameter value against a raw JSON value, treating ints and
/// floats of equal magnitude as equal.
pub(crate) fn values_equal(value: &ParameterValue, expected: &serde_json::Value) -> bool {
    if let (Some(a), Some(b)) = (value.as_f64(), expected.as_f64()) {
        return a == b;
    }
    value.to_json() == *expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn mlp_space() -> SearchSpace {
        SearchSpace::new()
            .add_categorical(
                "solver",
                vec![serde_json::json!("lbfgs"), serde_json::json!("sgd"), serde_json::json!("adam")],
            )
            .add_log_float("learning_rate_init", 1e-5, 1e-1)
            .add_int("n_layer", 1, 5)
            .add_condition(
                "learning_rate_init",
                "solver",
                ConditionOp::In {
                    values: vec![serde_json::json!("sgd"), serde_json::json!("adam")],
                },
            )
    }

    #[test]
    fn samples_stay_in_bounds() {
        let space = SearchSpace::new()
            .add_float("x0", -5.0, 10.0)
            .add_float("x1", 0.0, 15.0)
            .add_int("n", 2, 8);
        let mut rng = rng();
        for _ in 0..100 {
            let instance = space.sample(&mut rng).unwrap();
            assert!(instance.within_bounds(&space));
        }
    }

    #[test]
    fn log_sampling_respects_bounds() {
        let space = SearchSpace::new().add_log_float("lr", 1e-5, 1e-1);
        let mut rng = rng();
        for _ in 0..200 {
            let instance = space.sample(&mut rng).unwrap();
            let v = instance.get("lr").unwrap().as_f64().unwrap();
            assert!((1e-5..=1e-1).contains(&v), "lr out of bounds: {v}");
        }
    }

    #[test]
    fn unmet_condition_yields_inactive_placeholder() {
        let space = mlp_space();
        let mut rng = rng();
        let mut saw_inactive = false;
        for _ in 0..100 {
            let instance = space.sample(&mut rng).unwrap();
            let solver = instance.get("solver").unwrap().as_str().unwrap().to_string();
            let lr = instance.get("learning_rate_init").unwrap();
            if solver == "lbfgs" {
                assert!(lr.is_inactive());
                saw_inactive = true;
            } else {
                assert!(!lr.is_inactive());
            }
        }
        assert!(saw_inactive, "sampler never chose the gating branch");
    }

    #[test]
    fn forbidden_combination_never_sampled() {
        let space = SearchSpace::new()
            .add_categorical("a", vec![serde_json::json!(0), serde_json::json!(1)])
            .add_categorical("b", vec![serde_json::json!(0), serde_json::json!(1)])
            .add_forbidden(ForbiddenClause::new(vec![
                ("a", serde_json::json!(1)),
                ("b", serde_json::json!(1)),
            ]));
        let mut rng = rng();
        for _ in 0..200 {
            let instance = space.sample(&mut rng).unwrap();
            let a = instance.get("a").unwrap().as_i64().unwrap();
            let b = instance.get("b").unwrap().as_i64().unwrap();
            assert!(!(a == 1 && b == 1), "forbidden combination sampled");
        }
    }

    #[test]
    fn validate_rejects_unknown_condition_reference() {
        let space = SearchSpace::new()
            .add_float("x0", 0.0, 1.0)
            .add_condition(
                "missing_param",
                "x0",
                ConditionOp::Equals {
                    value: serde_json::json!(0.5),
                },
            );
        let err = space.validate().unwrap_err();
        assert!(err.to_string().contains("missing_param"));
    }

    #[test]
    fn validate_rejects_condition_cycle() {
        let space = SearchSpace::new()
            .add_int("a", 0, 1)
            .add_int("b", 0, 1)
            .add_condition("a", "b", ConditionOp::Equals { value: serde_json::json!(1) })
            .add_condition("b", "a", ConditionOp::Equals { value: serde_json::json!(1) });
        match space.validate() {
            Err(ConfigurationError::CircularCondition { .. }) => (),
            other => panic!("expected circular condition error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_out_of_bounds_default() {
        let space = SearchSpace::new().add_param(
            ParameterDef::new(
                "x0",
                ParameterKind::UniformFloat {
                    lower: 0.0,
                    upper: 1.0,
                    log: false,
                },
            )
            .with_default(5.0),
        );
        match space.validate() {
            Err(ConfigurationError::DefaultOutOfBounds { parameter, .. }) => {
                assert_eq!(parameter, "x0");
            }
            other => panic!("expected default-out-of-bounds, got {other:?}"),
        }
    }

    #[test]
    fn inferred_default_uses_geometric_mean_on_log_scales() {
        let def = ParameterDef::new(
            "x1",
            ParameterKind::UniformFloat {
                lower: 335.0,
                upper: 512.0,
                log: true,
            },
        );
        let inferred = def.default_or_inferred().as_f64().unwrap();
        assert!((inferred - 414.1497313774).abs() < 1e-6);
    }

    #[test]
    fn default_configuration_respects_conditions() {
        let space = mlp_space();
        let defaults = space.default_configuration().unwrap();
        // First choice of "solver" is lbfgs, which gates learning_rate_init off.
        assert_eq!(defaults.get("solver").unwrap().as_str(), Some("lbfgs"));
        assert!(defaults.get("learning_rate_init").unwrap().is_inactive());
    }

    #[test]
    fn perturbed_samples_stay_in_bounds_and_respect_conditions() {
        let space = mlp_space();
        let mut rng = rng();
        let base = space.sample(&mut rng).unwrap();
        for _ in 0..100 {
            let near = space.sample_perturbed(&base, 0.1, &mut rng).unwrap();
            assert!(near.within_bounds(&space));
            let solver = near.get("solver").unwrap().as_str().unwrap();
            let lr = near.get("learning_rate_init").unwrap();
            assert_eq!(solver == "lbfgs", lr.is_inactive());
        }
    }

    #[test]
    fn sampling_is_reproducible_per_seed() {
        let space = mlp_space();
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(space.sample(&mut a).unwrap(), space.sample(&mut b).unwrap());
        }
    }
}
