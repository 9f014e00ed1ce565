//! Declarative search-space descriptions and their translation to the formal
//! [`SearchSpace`].
//!
//! The sweeper accepts the search space in three forms: an already-built
//! formal space, a declarative mapping handed over by the config front end,
//! or a path to a serialized document. [`SearchSpaceSource::resolve`] detects
//! the form and normalizes it without data loss. Declarative input reduces to
//! plain ordered mappings and sequences at this boundary; nothing downstream
//! depends on the front end's object graph.

use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use hs_types::errors::ConfigurationError;
use hs_types::value::ParameterValue;

use crate::document::SpaceDocument;
use crate::space::{ConditionOp, ForbiddenClause, ForbiddenTerm, ParameterDef, ParameterKind, SearchSpace};

/// The search-space input, in whichever form the caller has it.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchSpaceSource {
    /// Already-materialized formal search space.
    Formal(SearchSpace),
    /// Declarative mapping from the config front end.
    Declarative(Value),
    /// Path to a serialized search-space document.
    Path(PathBuf),
}

impl SearchSpaceSource {
    /// Normalize to a validated formal search space.
    pub fn resolve(&self, seed: Option<u64>) -> Result<SearchSpace, ConfigurationError> {
        encode(self, seed)
    }
}

impl From<SearchSpace> for SearchSpaceSource {
    fn from(space: SearchSpace) -> Self {
        Self::Formal(space)
    }
}

impl From<Value> for SearchSpaceSource {
    fn from(value: Value) -> Self {
        Self::Declarative(value)
    }
}

impl From<&str> for SearchSpaceSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

/// Encode a search-space source into a validated formal [`SearchSpace`].
///
/// The `seed` is recorded on the space and governs any stochastic sampling
/// tie-breaks downstream. Encoding itself is deterministic.
pub fn encode(
    source: &SearchSpaceSource,
    seed: Option<u64>,
) -> Result<SearchSpace, ConfigurationError> {
    let mut space = match source {
        SearchSpaceSource::Formal(space) => space.clone(),
        SearchSpaceSource::Path(path) => {
            debug!(path = %path.display(), "loading search-space document");
            SpaceDocument::space_from_file(path)?
        }
        SearchSpaceSource::Declarative(value) => {
            // A serialized document pasted inline is still a valid source.
            if value.get("format_version").is_some() {
                SpaceDocument::from_json_str(&value.to_string())?.to_space()?
            } else {
                parse_declarative(value)?
            }
        }
    };
    space.seed = seed.or(space.seed);
    space.validate()?;
    debug!(
        parameters = space.parameters.len(),
        conditions = space.conditions.len(),
        forbiddens = space.forbiddens.len(),
        "encoded search space"
    );
    Ok(space)
}

fn parse_declarative(value: &Value) -> Result<SearchSpace, ConfigurationError> {
    let root = value
        .as_object()
        .ok_or_else(|| ConfigurationError::UnsupportedSource {
            message: format!(
                "expected a mapping, a formal search space, or a document path; got {}",
                json_kind(value)
            ),
        })?;

    let mut space = SearchSpace::new();

    // Either the canonical {"hyperparameters": {...}} shape or a bare mapping
    // of parameter specs.
    let specs: Vec<(&String, &Value)> = match root.get("hyperparameters") {
        Some(Value::Object(map)) => map.iter().collect(),
        Some(other) => {
            return Err(ConfigurationError::UnsupportedSource {
                message: format!("'hyperparameters' must be a mapping, got {}", json_kind(other)),
            })
        }
        None => root
            .iter()
            .filter(|(k, _)| *k != "conditions" && *k != "forbiddens")
            .collect(),
    };

    for (name, entry) in specs {
        collect_params(name, entry, &mut space.parameters)?;
    }

    if let Some(conditions) = root.get("conditions") {
        for entry in as_array(conditions, "conditions")? {
            space.conditions.push(parse_condition(entry)?);
        }
    }
    if let Some(forbiddens) = root.get("forbiddens") {
        for entry in as_array(forbiddens, "forbiddens")? {
            space.forbiddens.push(parse_forbidden(entry)?);
        }
    }

    Ok(space)
}

/// Walk one declarative entry. Parameter specs become definitions; nested
/// mappings recurse with dotted names so structure survives as naming;
/// scalars become constants.
fn collect_params(
    name: &str,
    entry: &Value,
    out: &mut Vec<ParameterDef>,
) -> Result<(), ConfigurationError> {
    match entry {
        Value::Object(map) if is_param_spec(map) => {
            out.push(parse_param_spec(name, map)?);
        }
        Value::Object(map) => {
            for (key, nested) in map {
                collect_params(&format!("{name}.{key}"), nested, out)?;
            }
        }
        scalar => {
            out.push(ParameterDef::new(
                name,
                ParameterKind::Constant {
                    value: scalar.clone(),
                },
            ));
        }
    }
    Ok(())
}

fn is_param_spec(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("type")
        || map.contains_key("choices")
        || (map.contains_key("lower") && map.contains_key("upper"))
        || map.contains_key("value")
}

fn parse_param_spec(
    name: &str,
    map: &serde_json::Map<String, Value>,
) -> Result<ParameterDef, ConfigurationError> {
    let explicit_type = map.get("type").and_then(Value::as_str);
    let log = map.get("log").and_then(Value::as_bool).unwrap_or(false);

    let kind = match explicit_type {
        Some("uniform_float") | Some("float") => ParameterKind::UniformFloat {
            lower: bound_f64(name, "lower", map)?,
            upper: bound_f64(name, "upper", map)?,
            log,
        },
        Some("uniform_int") | Some("int") => ParameterKind::UniformInt {
            lower: bound_i64(name, "lower", map)?,
            upper: bound_i64(name, "upper", map)?,
            log,
        },
        Some("categorical") => ParameterKind::Categorical {
            choices: map
                .get("choices")
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| ConfigurationError::MissingBound {
                    parameter: name.to_string(),
                    field: "choices".to_string(),
                })?,
        },
        Some("constant") => ParameterKind::Constant {
            value: map
                .get("value")
                .cloned()
                .ok_or_else(|| ConfigurationError::MissingBound {
                    parameter: name.to_string(),
                    field: "value".to_string(),
                })?,
        },
        Some(other) => {
            return Err(ConfigurationError::MalformedSpec {
                parameter: name.to_string(),
                message: format!("unknown type tag '{other}'"),
            })
        }
        // No explicit tag: infer from value shapes.
        None => {
            if let Some(choices) = map.get("choices").and_then(Value::as_array) {
                ParameterKind::Categorical {
                    choices: choices.clone(),
                }
            } else if let Some(value) = map.get("value") {
                ParameterKind::Constant {
                    value: value.clone(),
                }
            } else {
                let lower = map.get("lower");
                let upper = map.get("upper");
                let integral = |v: Option<&Value>| v.map(|v| v.is_i64()).unwrap_or(false);
                if integral(lower) && integral(upper) {
                    ParameterKind::UniformInt {
                        lower: bound_i64(name, "lower", map)?,
                        upper: bound_i64(name, "upper", map)?,
                        log,
                    }
                } else {
                    ParameterKind::UniformFloat {
                        lower: bound_f64(name, "lower", map)?,
                        upper: bound_f64(name, "upper", map)?,
                        log,
                    }
                }
            }
        }
    };

    let mut def = ParameterDef::new(name, kind);
    if let Some(default) = map.get("default") {
        def = def.with_default(ParameterValue::from_json(default.clone()));
    }
    Ok(def)
}

fn parse_condition(entry: &Value) -> Result<crate::space::Condition, ConfigurationError> {
    let map = entry
        .as_object()
        .ok_or_else(|| ConfigurationError::InvalidDocument {
            message: format!("condition entries must be mappings, got {}", json_kind(entry)),
        })?;
    let child = require_str(map, "child")?;
    let parent = require_str(map, "parent")?;
    let kind = map
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("EQ")
        .to_ascii_uppercase();
    let op = match kind.as_str() {
        "EQ" => ConditionOp::Equals {
            value: map
                .get("value")
                .cloned()
                .ok_or_else(|| ConfigurationError::InvalidDocument {
                    message: format!("EQ condition on '{child}' requires 'value'"),
                })?,
        },
        "IN" => ConditionOp::In {
            values: map
                .get("values")
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| ConfigurationError::InvalidDocument {
                    message: format!("IN condition on '{child}' requires 'values'"),
                })?,
        },
        "RANGE" => ConditionOp::Range {
            lower: map.get("lower").and_then(Value::as_f64).ok_or_else(|| {
                ConfigurationError::InvalidDocument {
                    message: format!("RANGE condition on '{child}' requires numeric 'lower'"),
                }
            })?,
            upper: map.get("upper").and_then(Value::as_f64).ok_or_else(|| {
                ConfigurationError::InvalidDocument {
                    message: format!("RANGE condition on '{child}' requires numeric 'upper'"),
                }
            })?,
        },
        other => {
            return Err(ConfigurationError::InvalidDocument {
                message: format!("unknown condition type '{other}'"),
            })
        }
    };
    Ok(crate::space::Condition { child, parent, op })
}

fn parse_forbidden(entry: &Value) -> Result<ForbiddenClause, ConfigurationError> {
    let map = entry
        .as_object()
        .ok_or_else(|| ConfigurationError::InvalidDocument {
            message: format!("forbidden entries must be mappings, got {}", json_kind(entry)),
        })?;
    // Either the document form {"clauses": [{parameter, value}]} or the
    // shorthand mapping {param: value, ...}.
    if let Some(clauses) = map.get("clauses").and_then(Value::as_array) {
        let mut terms = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let clause_map =
                clause
                    .as_object()
                    .ok_or_else(|| ConfigurationError::InvalidDocument {
                        message: "forbidden clause terms must be mappings".to_string(),
                    })?;
            terms.push(ForbiddenTerm {
                parameter: require_str(clause_map, "parameter")?,
                value: clause_map.get("value").cloned().unwrap_or(Value::Null),
            });
        }
        return Ok(ForbiddenClause { terms });
    }
    Ok(ForbiddenClause {
        terms: map
            .iter()
            .map(|(parameter, value)| ForbiddenTerm {
                parameter: parameter.clone(),
                value: value.clone(),
            })
            .collect(),
    })
}

fn as_array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, ConfigurationError> {
    value
        .as_array()
        .ok_or_else(|| ConfigurationError::InvalidDocument {
            message: format!("'{field}' must be a sequence, got {}", json_kind(value)),
        })
}

fn bound_f64(
    name: &str,
    field: &str,
    map: &serde_json::Map<String, Value>,
) -> Result<f64, ConfigurationError> {
    map.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| ConfigurationError::MissingBound {
            parameter: name.to_string(),
            field: field.to_string(),
        })
}

fn bound_i64(
    name: &str,
    field: &str,
    map: &serde_json::Map<String, Value>,
) -> Result<i64, ConfigurationError> {
    map.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| ConfigurationError::MissingBound {
            parameter: name.to_string(),
            field: field.to_string(),
        })
}

fn require_str(
    map: &serde_json::Map<String, Value>,
    field: &str,
) -> Result<String, ConfigurationError> {
    map.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConfigurationError::InvalidDocument {
            message: format!("missing required string field '{field}'"),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SpaceDocument;
    use std::io::Write;

    #[test]
    fn encodes_flat_declarative_mapping() {
        let declarative = serde_json::json!({
            "hyperparameters": {
                "x0": {"type": "uniform_float", "lower": -512.0, "upper": 512.0, "default": -3.0},
                "x1": {"type": "uniform_float", "log": true, "lower": 335, "upper": 512.0, "default": 400},
            }
        });
        let space = encode(&declarative.into(), Some(48574)).unwrap();
        assert_eq!(space.parameters.len(), 2);
        assert_eq!(space.seed, Some(48574));
        assert_eq!(
            space.parameters[0].kind,
            ParameterKind::UniformFloat {
                lower: -512.0,
                upper: 512.0,
                log: false,
            }
        );
        assert_eq!(
            space.parameters[0].default,
            Some(ParameterValue::Float(-3.0))
        );
        match &space.parameters[1].kind {
            ParameterKind::UniformFloat { lower, upper, log } => {
                assert_eq!((*lower, *upper), (335.0, 512.0));
                assert!(*log);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn infers_types_without_explicit_tags() {
        let declarative = serde_json::json!({
            "n_layer": {"lower": 1, "upper": 5},
            "alpha": {"lower": 0.0001, "upper": 1.0, "log": true},
            "activation": {"choices": ["tanh", "relu"]},
        });
        let space = encode(&declarative.into(), None).unwrap();
        assert!(matches!(
            space.param("n_layer").unwrap().kind,
            ParameterKind::UniformInt { lower: 1, upper: 5, log: false }
        ));
        assert!(matches!(
            space.param("alpha").unwrap().kind,
            ParameterKind::UniformFloat { log: true, .. }
        ));
        assert!(matches!(
            space.param("activation").unwrap().kind,
            ParameterKind::Categorical { .. }
        ));
    }

    #[test]
    fn nested_mappings_become_dotted_names() {
        let declarative = serde_json::json!({
            "hyperparameters": {
                "model": {
                    "alpha": {"lower": 0.01, "upper": 1.0},
                    "activation": {"choices": ["tanh", "relu"]},
                },
                "optimizer": {
                    "solver": {"choices": ["sgd", "adam"]},
                },
            }
        });
        let space = encode(&declarative.into(), None).unwrap();
        let names: Vec<&str> = space.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["model.alpha", "model.activation", "optimizer.solver"]
        );
    }

    #[test]
    fn conditions_and_forbiddens_are_parsed() {
        let declarative = serde_json::json!({
            "hyperparameters": {
                "solver": {"choices": ["lbfgs", "sgd", "adam"]},
                "learning_rate_init": {"type": "uniform_float", "log": true,
                                       "lower": 1e-5, "upper": 1e-1},
                "batch_size": {"lower": 16, "upper": 256},
            },
            "conditions": [
                {"child": "learning_rate_init", "parent": "solver", "type": "IN",
                 "values": ["sgd", "adam"]},
            ],
            "forbiddens": [
                {"solver": "sgd", "batch_size": 16},
            ],
        });
        let space = encode(&declarative.into(), None).unwrap();
        assert_eq!(space.conditions.len(), 1);
        assert_eq!(space.forbiddens.len(), 1);
        assert_eq!(space.forbiddens[0].terms.len(), 2);
    }

    #[test]
    fn missing_bound_fails_at_construction() {
        let declarative = serde_json::json!({
            "x0": {"type": "uniform_float", "lower": -5.0},
        });
        match encode(&declarative.into(), None) {
            Err(ConfigurationError::MissingBound { parameter, field }) => {
                assert_eq!(parameter, "x0");
                assert_eq!(field, "upper");
            }
            other => panic!("expected missing bound, got {other:?}"),
        }
    }

    #[test]
    fn condition_on_unknown_parameter_is_rejected() {
        let declarative = serde_json::json!({
            "hyperparameters": {
                "x0": {"lower": 0.0, "upper": 1.0},
            },
            "conditions": [
                {"child": "ghost", "parent": "x0", "type": "EQ", "value": 0.5},
            ],
        });
        match encode(&declarative.into(), None) {
            Err(ConfigurationError::UnknownParameter { parameter, .. }) => {
                assert_eq!(parameter, "ghost");
            }
            other => panic!("expected unknown parameter, got {other:?}"),
        }
    }

    #[test]
    fn non_sequence_conditions_are_rejected() {
        let declarative = serde_json::json!({
            "hyperparameters": {
                "x0": {"lower": 0.0, "upper": 1.0},
            },
            "conditions": {"child": "x0", "parent": "x0"},
        });
        match encode(&declarative.into(), None) {
            Err(ConfigurationError::InvalidDocument { message }) => {
                assert!(message.contains("'conditions'"), "{message}");
                assert!(message.contains("sequence"), "{message}");
            }
            other => panic!("expected invalid document, got {other:?}"),
        }
    }

    #[test]
    fn non_mapping_source_is_rejected() {
        let err = encode(&serde_json::json!([1, 2, 3]).into(), None).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedSource { .. }));
    }

    #[test]
    fn formal_space_passes_through() {
        let space = SearchSpace::new().add_float("x0", 0.0, 1.0);
        let resolved = encode(&space.clone().into(), Some(1)).unwrap();
        assert_eq!(resolved.parameters, space.parameters);
        assert_eq!(resolved.seed, Some(1));
    }

    #[test]
    fn path_source_loads_serialized_document() {
        let space = SearchSpace::new()
            .add_float("x0", -5.0, 10.0)
            .add_float("x1", 0.0, 15.0);
        let json = SpaceDocument::from_space(&space).to_canonical_json().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let source = SearchSpaceSource::Path(file.path().to_path_buf());
        let loaded = source.resolve(None).unwrap();
        assert_eq!(loaded.parameters, space.parameters);
    }
}
