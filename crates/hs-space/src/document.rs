//! Stable on-disk text format for formal search spaces.
//!
//! The document is a machine-normalized JSON form: plain ordered mappings and
//! sequences only, a `format_version` marker, parameter entries in declarative
//! order, and canonical (shortest round-trip) float text. Serializing the same
//! space twice yields byte-identical output.

use serde::{Deserialize, Serialize};
use std::path::Path;

use hs_types::errors::ConfigurationError;
use hs_types::value::ParameterValue;

use crate::space::{
    ConditionOp, ForbiddenClause, ForbiddenTerm, ParameterDef, ParameterKind, SearchSpace,
};

/// Current document format version.
pub const FORMAT_VERSION: u32 = 1;

/// Serialized search-space document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceDocument {
    pub format_version: u32,
    pub hyperparameters: Vec<HyperparameterDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbiddens: Vec<ForbiddenDoc>,
}

/// One parameter entry. Field presence depends on `type`:
/// `uniform_float`/`uniform_int` carry bounds, `categorical` carries choices,
/// `constant` carries a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDoc {
    pub child: String,
    pub parent: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenDoc {
    pub clauses: Vec<ForbiddenTermDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenTermDoc {
    pub parameter: String,
    pub value: serde_json::Value,
}

impl SpaceDocument {
    /// Normalize a formal search space into its document form.
    pub fn from_space(space: &SearchSpace) -> Self {
        let hyperparameters = space
            .parameters
            .iter()
            .map(|param| {
                let default = param.default.as_ref().map(|d| d.to_json());
                match &param.kind {
                    ParameterKind::UniformFloat { lower, upper, log } => HyperparameterDoc {
                        name: param.name.clone(),
                        kind: "uniform_float".to_string(),
                        lower: Some(serde_json::json!(lower)),
                        upper: Some(serde_json::json!(upper)),
                        log: Some(*log),
                        choices: None,
                        value: None,
                        default,
                    },
                    ParameterKind::UniformInt { lower, upper, log } => HyperparameterDoc {
                        name: param.name.clone(),
                        kind: "uniform_int".to_string(),
                        lower: Some(serde_json::json!(lower)),
                        upper: Some(serde_json::json!(upper)),
                        log: Some(*log),
                        choices: None,
                        value: None,
                        default,
                    },
                    ParameterKind::Categorical { choices } => HyperparameterDoc {
                        name: param.name.clone(),
                        kind: "categorical".to_string(),
                        lower: None,
                        upper: None,
                        log: None,
                        choices: Some(choices.clone()),
                        value: None,
                        default,
                    },
                    ParameterKind::Constant { value } => HyperparameterDoc {
                        name: param.name.clone(),
                        kind: "constant".to_string(),
                        lower: None,
                        upper: None,
                        log: None,
                        choices: None,
                        value: Some(value.clone()),
                        default,
                    },
                }
            })
            .collect();

        let conditions = space
            .conditions
            .iter()
            .map(|c| match &c.op {
                ConditionOp::Equals { value } => ConditionDoc {
                    child: c.child.clone(),
                    parent: c.parent.clone(),
                    kind: "EQ".to_string(),
                    value: Some(value.clone()),
                    values: None,
                    lower: None,
                    upper: None,
                },
                ConditionOp::In { values } => ConditionDoc {
                    child: c.child.clone(),
                    parent: c.parent.clone(),
                    kind: "IN".to_string(),
                    value: None,
                    values: Some(values.clone()),
                    lower: None,
                    upper: None,
                },
                ConditionOp::Range { lower, upper } => ConditionDoc {
                    child: c.child.clone(),
                    parent: c.parent.clone(),
                    kind: "RANGE".to_string(),
                    value: None,
                    values: None,
                    lower: Some(*lower),
                    upper: Some(*upper),
                },
            })
            .collect();

        let forbiddens = space
            .forbiddens
            .iter()
            .map(|clause| ForbiddenDoc {
                clauses: clause
                    .terms
                    .iter()
                    .map(|t| ForbiddenTermDoc {
                        parameter: t.parameter.clone(),
                        value: t.value.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION,
            hyperparameters,
            conditions,
            forbiddens,
        }
    }

    /// Reconstruct and validate the formal search space.
    pub fn to_space(&self) -> Result<SearchSpace, ConfigurationError> {
        let mut space = SearchSpace::new();
        for hp in &self.hyperparameters {
            let kind = match hp.kind.as_str() {
                "uniform_float" => ParameterKind::UniformFloat {
                    lower: require_f64(&hp.name, "lower", &hp.lower)?,
                    upper: require_f64(&hp.name, "upper", &hp.upper)?,
                    log: hp.log.unwrap_or(false),
                },
                "uniform_int" => ParameterKind::UniformInt {
                    lower: require_i64(&hp.name, "lower", &hp.lower)?,
                    upper: require_i64(&hp.name, "upper", &hp.upper)?,
                    log: hp.log.unwrap_or(false),
                },
                "categorical" => ParameterKind::Categorical {
                    choices: hp.choices.clone().ok_or_else(|| {
                        ConfigurationError::MissingBound {
                            parameter: hp.name.clone(),
                            field: "choices".to_string(),
                        }
                    })?,
                },
                "constant" => ParameterKind::Constant {
                    value: hp.value.clone().ok_or_else(|| {
                        ConfigurationError::MissingBound {
                            parameter: hp.name.clone(),
                            field: "value".to_string(),
                        }
                    })?,
                },
                other => {
                    return Err(ConfigurationError::MalformedSpec {
                        parameter: hp.name.clone(),
                        message: format!("unknown parameter type '{other}'"),
                    })
                }
            };
            let mut def = ParameterDef::new(hp.name.clone(), kind);
            if let Some(default) = &hp.default {
                def = def.with_default(ParameterValue::from_json(default.clone()));
            }
            space = space.add_param(def);
        }

        for c in &self.conditions {
            let op = match c.kind.as_str() {
                "EQ" => ConditionOp::Equals {
                    value: c.value.clone().ok_or_else(|| {
                        condition_doc_error(&c.child, "EQ condition requires 'value'")
                    })?,
                },
                "IN" => ConditionOp::In {
                    values: c.values.clone().ok_or_else(|| {
                        condition_doc_error(&c.child, "IN condition requires 'values'")
                    })?,
                },
                "RANGE" => ConditionOp::Range {
                    lower: c.lower.ok_or_else(|| {
                        condition_doc_error(&c.child, "RANGE condition requires 'lower'")
                    })?,
                    upper: c.upper.ok_or_else(|| {
                        condition_doc_error(&c.child, "RANGE condition requires 'upper'")
                    })?,
                },
                other => {
                    return Err(ConfigurationError::InvalidDocument {
                        message: format!("unknown condition type '{other}'"),
                    })
                }
            };
            space = space.add_condition(c.child.clone(), c.parent.clone(), op);
        }

        for f in &self.forbiddens {
            space = space.add_forbidden(ForbiddenClause {
                terms: f
                    .clauses
                    .iter()
                    .map(|t| ForbiddenTerm {
                        parameter: t.parameter.clone(),
                        value: t.value.clone(),
                    })
                    .collect(),
            });
        }

        space.validate()?;
        Ok(space)
    }

    /// Canonical text form: fixed key order, canonical float text.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse and version-check a document.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigurationError> {
        let doc: Self =
            serde_json::from_str(s).map_err(|e| ConfigurationError::InvalidDocument {
                message: e.to_string(),
            })?;
        if doc.format_version > FORMAT_VERSION {
            return Err(ConfigurationError::InvalidDocument {
                message: format!(
                    "document format version {} is newer than supported version {}",
                    doc.format_version, FORMAT_VERSION
                ),
            });
        }
        Ok(doc)
    }

    /// Load and reconstruct a search space from a document file.
    pub fn space_from_file(path: impl AsRef<Path>) -> Result<SearchSpace, ConfigurationError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::InvalidDocument {
                message: format!("{}: {e}", path.display()),
            })?;
        Self::from_json_str(&text)?.to_space()
    }
}

fn condition_doc_error(child: &str, message: &str) -> ConfigurationError {
    ConfigurationError::InvalidDocument {
        message: format!("condition on '{child}': {message}"),
    }
}

fn require_f64(
    parameter: &str,
    field: &str,
    value: &Option<serde_json::Value>,
) -> Result<f64, ConfigurationError> {
    value
        .as_ref()
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ConfigurationError::MissingBound {
            parameter: parameter.to_string(),
            field: field.to_string(),
        })
}

fn require_i64(
    parameter: &str,
    field: &str,
    value: &Option<serde_json::Value>,
) -> Result<i64, ConfigurationError> {
    value
        .as_ref()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ConfigurationError::MissingBound {
            parameter: parameter.to_string(),
            field: field.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_space() -> SearchSpace {
        SearchSpace::new()
            .add_float("x0", -512.0, 512.0)
            .add_param(
                ParameterDef::new(
                    "x1",
                    ParameterKind::UniformFloat {
                        lower: 335.0,
                        upper: 512.0,
                        log: true,
                    },
                )
                .with_default(400.0),
            )
            .add_categorical(
                "solver",
                vec![serde_json::json!("sgd"), serde_json::json!("adam")],
            )
            .add_condition(
                "x1",
                "solver",
                ConditionOp::Equals {
                    value: serde_json::json!("adam"),
                },
            )
            .add_forbidden(ForbiddenClause::new(vec![(
                "solver",
                serde_json::json!("sgd"),
            )]))
    }

    #[test]
    fn round_trip_preserves_parameters_in_order() {
        let space = sample_space();
        let json = SpaceDocument::from_space(&space).to_canonical_json().unwrap();
        let back = SpaceDocument::from_json_str(&json).unwrap().to_space().unwrap();
        assert_eq!(back.parameters, space.parameters);
        assert_eq!(back.conditions, space.conditions);
        assert_eq!(back.forbiddens, space.forbiddens);
    }

    #[test]
    fn clause_sets_compare_order_insensitively() {
        let a = SearchSpace::new()
            .add_int("p", 0, 1)
            .add_int("q", 0, 1)
            .add_forbidden(ForbiddenClause::new(vec![("p", serde_json::json!(0))]))
            .add_forbidden(ForbiddenClause::new(vec![("q", serde_json::json!(1))]));
        let b = SearchSpace::new()
            .add_int("p", 0, 1)
            .add_int("q", 0, 1)
            .add_forbidden(ForbiddenClause::new(vec![("q", serde_json::json!(1))]))
            .add_forbidden(ForbiddenClause::new(vec![("p", serde_json::json!(0))]));
        let doc_a = SpaceDocument::from_space(&a);
        let doc_b = SpaceDocument::from_space(&b);
        for clause in &doc_a.forbiddens {
            assert!(doc_b.forbiddens.contains(clause));
        }
        assert_eq!(doc_a.forbiddens.len(), doc_b.forbiddens.len());
    }

    #[test]
    fn canonical_output_is_stable() {
        let space = sample_space();
        let doc = SpaceDocument::from_space(&space);
        assert_eq!(
            doc.to_canonical_json().unwrap(),
            doc.to_canonical_json().unwrap()
        );
    }

    #[test]
    fn version_marker_is_enforced() {
        let json = r#"{"format_version": 99, "hyperparameters": []}"#;
        match SpaceDocument::from_json_str(json) {
            Err(ConfigurationError::InvalidDocument { message }) => {
                assert!(message.contains("99"));
            }
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn missing_bound_is_reported() {
        let json = r#"{
            "format_version": 1,
            "hyperparameters": [{"name": "x0", "type": "uniform_float", "lower": -5.0}]
        }"#;
        let doc = SpaceDocument::from_json_str(json).unwrap();
        match doc.to_space() {
            Err(ConfigurationError::MissingBound { parameter, field }) => {
                assert_eq!(parameter, "x0");
                assert_eq!(field, "upper");
            }
            other => panic!("expected missing bound, got {other:?}"),
        }
    }

    #[test]
    fn space_loads_from_file() {
        let space = sample_space();
        let json = SpaceDocument::from_space(&space).to_canonical_json().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let loaded = SpaceDocument::space_from_file(file.path()).unwrap();
        assert_eq!(loaded.parameters, space.parameters);
    }
}
