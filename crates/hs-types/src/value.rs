//! Parameter values exchanged between the encoder, the optimizer, and the
//! evaluation callback.

use serde::{Deserialize, Deserializer, Serialize};

/// A concrete value assigned to a single search-space parameter.
///
/// Values are kept in their native types end to end: the evaluation callback
/// receives a `Float` or `Int`, never a stringified numeric. A parameter
/// deactivated by an unmet condition is represented by the explicit
/// [`ParameterValue::Inactive`] placeholder — it is never silently omitted or
/// default-filled, so the callback can detect it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Json(serde_json::Value),
    /// Placeholder for a parameter whose activation condition is unmet.
    /// Serializes to / deserializes from JSON `null`.
    Inactive,
}

// Deserialized by hand: an untagged derive would pick variants in declaration
// order, turning `null` into `Json(Null)` and widening integers to `Float`.
// Routing through [`ParameterValue::from_json`] keeps `null` ↔ `Inactive` and
// integers integral.
impl<'de> Deserialize<'de> for ParameterValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(value))
    }
}

impl ParameterValue {
    /// Value as `f64` if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Json(v) => v.as_f64(),
            Self::Inactive => None,
        }
    }

    /// Value as `i64` if integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Json(v) => v.as_i64(),
            _ => None,
        }
    }

    /// Value as string slice for categorical string choices.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Json(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn is_inactive(&self) -> bool {
        matches!(self, Self::Inactive)
    }

    /// Lift a raw JSON value into its most specific variant.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Inactive,
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Json(serde_json::Value::Number(n))
                }
            }
            other => Self::Json(other),
        }
    }

    /// Back to a plain JSON value (Inactive becomes `null`).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Float(v) => serde_json::json!(v),
            Self::Int(v) => serde_json::json!(v),
            Self::Json(v) => v.clone(),
            Self::Inactive => serde_json::Value::Null,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            // Strings are rendered bare so `solver=adam` comes out without quotes.
            Self::Json(serde_json::Value::String(s)) => write!(f, "{s}"),
            Self::Json(v) => write!(f, "{v}"),
            Self::Inactive => write!(f, "null"),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Json(serde_json::Value::String(v.to_string()))
    }
}
