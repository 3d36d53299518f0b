use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::Configuration;

/// One selectable option within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Value {
    /// Token used for selection and matching (`fixed.value`, `allowed_values`).
    pub core: String,
    /// Free text carried through to output, never used for selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Value {
    pub fn new(core: impl Into<String>, description: Option<String>) -> Self {
        Self {
            core: core.into(),
            description,
        }
    }
}

/// A named axis of variation owning its pool of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Category {
    pub name: String,
    /// Presentation-only grouping label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_group: None,
            description: None,
            values: Vec::new(),
        }
    }

    pub fn with_values<I, S>(name: impl Into<String>, cores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut category = Self::new(name);
        category.values = cores
            .into_iter()
            .map(|core| Value::new(core, None))
            .collect();
        category
    }

    /// First value whose core matches exactly.
    pub fn find_value(&self, core: &str) -> Option<&Value> {
        self.values.iter().find(|value| value.core == core)
    }

    pub fn contains_core(&self, core: &str) -> bool {
        self.find_value(core).is_some()
    }
}

/// Named, persisted configuration.
///
/// The configuration is kept as serialized JSON text, the way it is stored;
/// decoding happens on demand through [`Template::config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Template {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub config_json: String,
}

/// Why a stored template configuration could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateConfigError {
    #[error("stored configuration is not valid JSON: {0}")]
    Syntax(String),
    #[error("stored configuration is not a mapping")]
    NotMapping,
}

impl Template {
    /// Decode the stored configuration.
    pub fn config(&self) -> Result<Configuration, TemplateConfigError> {
        let value: serde_json::Value = serde_json::from_str(&self.config_json)
            .map_err(|err| TemplateConfigError::Syntax(err.to_string()))?;
        Configuration::from_value(value).map_err(|_| TemplateConfigError::NotMapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(config_json: &str) -> Template {
        Template {
            id: 1,
            name: "t".to_string(),
            description: None,
            config_json: config_json.to_string(),
        }
    }

    #[test]
    fn template_config_decodes_mapping() {
        let config = template(r#"{"Engine": {"rule": "fixed", "value": "V8"}}"#)
            .config()
            .expect("mapping");
        assert_eq!(config.len(), 1);
        assert!(config.get("Engine").is_some());
    }

    #[test]
    fn template_config_reports_markers() {
        assert!(matches!(
            template("{not json").config(),
            Err(TemplateConfigError::Syntax(_))
        ));
        assert_eq!(
            template("[1, 2]").config(),
            Err(TemplateConfigError::NotMapping)
        );
    }

    #[test]
    fn find_value_matches_exact_core() {
        let category = Category::with_values("Drive", ["AWD", "RWD"]);
        assert!(category.contains_core("AWD"));
        assert!(!category.contains_core("awd"));
    }
}
