use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::rules::RuleSpec;

/// Mapping from category name to its (not yet interpreted) rule entry.
///
/// Entries keep their mapping order. Rule entries are stored raw so that a
/// malformed entry only affects its own category when generating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    entries: IndexMap<String, JsonValue>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary JSON value; anything but an object is rejected.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => Ok(Self {
                entries: map.into_iter().collect(),
            }),
            other => Err(Error::InvalidConfiguration(format!(
                "expected a mapping of category names to rules, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, category: &str) -> Option<&JsonValue> {
        self.entries.get(category)
    }

    /// Iterate raw entries in mapping order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries
            .iter()
            .map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Insert (or replace) the rule for a category.
    pub fn insert_rule(&mut self, category: impl Into<String>, rule: &RuleSpec) {
        self.entries.insert(category.into(), rule.to_json());
    }

    /// Insert a raw entry without interpretation.
    pub fn insert_raw(&mut self, category: impl Into<String>, rule: JsonValue) {
        self.entries.insert(category.into(), rule);
    }
}

impl FromIterator<(String, RuleSpec)> for Configuration {
    fn from_iter<T: IntoIterator<Item = (String, RuleSpec)>>(iter: T) -> Self {
        let mut config = Self::new();
        for (category, rule) in iter {
            config.insert_rule(category, &rule);
        }
        config
    }
}

pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a list",
        JsonValue::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rejects_non_mapping() {
        let err = Configuration::from_value(json!(["a", "b"])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
        assert!(err.to_string().contains("a list"));
    }

    #[test]
    fn keeps_mapping_order() {
        let config =
            Configuration::from_json_str(r#"{"zeta": {}, "alpha": {}, "mid": "oops"}"#).unwrap();
        let names: Vec<&str> = config.category_names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(config.get("mid"), Some(&json!("oops")));
    }
}
