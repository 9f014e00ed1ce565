//! Concrete configuration instances and decoding back to declarative overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use hs_types::overrides::{Override, OverrideTrace};
use hs_types::value::ParameterValue;

use crate::space::SearchSpace;

/// One concrete assignment of values to the search space's parameters, in
/// declaration order.
///
/// Every declared parameter is present: parameters deactivated by an unmet
/// condition carry the explicit [`ParameterValue::Inactive`] placeholder
/// rather than being omitted or default-filled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigurationInstance {
    values: Vec<(String, ParameterValue)>,
}

impl ConfigurationInstance {
    /// Pre-size the assignment with all parameter names, each initially
    /// inactive, preserving declaration order.
    pub fn with_names(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            values: names
                .into_iter()
                .map(|n| (n, ParameterValue::Inactive))
                .collect(),
        }
    }

    pub fn from_pairs(pairs: Vec<(String, ParameterValue)>) -> Self {
        Self { values: pairs }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Assign `value` to `name`, appending if the name is new.
    pub fn set(&mut self, name: &str, value: ParameterValue) {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decode into the declarative override shape, declaration order
    /// preserved. Inactive parameters decode to `name=null`, never to a
    /// default value.
    pub fn decode(&self) -> OverrideTrace {
        OverrideTrace::new(
            self.values
                .iter()
                .map(|(name, value)| Override {
                    key: name.clone(),
                    value: value.clone(),
                })
                .collect(),
        )
    }

    /// Value map handed to the evaluation callback: parameter name to
    /// native-typed value, inactive parameters explicitly present.
    pub fn to_map(&self) -> HashMap<String, ParameterValue> {
        self.values.iter().cloned().collect()
    }

    /// Every active value lies within its declared bounds/choices.
    pub fn within_bounds(&self, space: &SearchSpace) -> bool {
        self.values.iter().all(|(name, value)| {
            if value.is_inactive() {
                return true;
            }
            space.param(name).map(|p| p.contains(value)).unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> ConfigurationInstance {
        let mut instance =
            ConfigurationInstance::with_names(["solver", "learning_rate_init"].map(String::from));
        instance.set("solver", ParameterValue::from("lbfgs"));
        instance
    }

    #[test]
    fn decode_keeps_declaration_order_and_placeholders() {
        let trace = instance().decode();
        assert_eq!(
            trace.to_strings(),
            vec!["solver=lbfgs", "learning_rate_init=null"]
        );
    }

    #[test]
    fn map_exposes_inactive_explicitly() {
        let map = instance().to_map();
        assert!(map["learning_rate_init"].is_inactive());
        assert_eq!(map["solver"].as_str(), Some("lbfgs"));
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut inst = instance();
        inst.set("solver", ParameterValue::from("adam"));
        assert_eq!(inst.get("solver").unwrap().as_str(), Some("adam"));
        assert_eq!(inst.len(), 2);
    }
}
