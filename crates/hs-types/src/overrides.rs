//! Override syntax (`parameter=value`) shared with the outer experiment runner.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;
use crate::value::ParameterValue;

/// One `key=value` override in the declarative syntax the launcher understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub key: String,
    pub value: ParameterValue,
}

impl Override {
    pub fn new(key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a `key=value` string. The value is interpreted as JSON first
    /// (numbers, booleans, null) and falls back to a bare string.
    pub fn parse(s: &str) -> Result<Self, ConfigurationError> {
        let (key, raw) = s
            .split_once('=')
            .ok_or_else(|| ConfigurationError::InvalidOverride {
                override_str: s.to_string(),
                message: "expected 'key=value'".to_string(),
            })?;
        if key.is_empty() {
            return Err(ConfigurationError::InvalidOverride {
                override_str: s.to_string(),
                message: "empty key".to_string(),
            });
        }
        let value = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(v) => ParameterValue::from_json(v),
            Err(_) => ParameterValue::from(raw),
        };
        Ok(Self {
            key: key.to_string(),
            value,
        })
    }
}

impl std::fmt::Display for Override {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Ordered sequence of overrides representing one configuration, in
/// declarative parameter-declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverrideTrace {
    pub overrides: Vec<Override>,
}

impl OverrideTrace {
    pub fn new(overrides: Vec<Override>) -> Self {
        Self { overrides }
    }

    /// Render as the `parameter=value` strings the calling launcher expects.
    pub fn to_strings(&self) -> Vec<String> {
        self.overrides.iter().map(|o| o.to_string()).collect()
    }

    pub fn push(&mut self, o: Override) {
        self.overrides.push(o);
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl std::fmt::Display for OverrideTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_strings().join(" "))
    }
}
