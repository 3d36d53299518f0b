//! Catalog seeding from the `ready_data.json` fixture.
//!
//! Fixture shape: `{"automation": {"<category>": ["core: description", ...]}}`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{Category, Value};
use crate::store::CatalogStore;

/// Group used for categories without an explicit assignment.
pub const DEFAULT_GROUP: &str = "Other";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFixture {
    #[serde(default)]
    pub automation: IndexMap<String, JsonValue>,
}

impl SeedFixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Category → display group assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMap {
    #[serde(default)]
    pub assignments: BTreeMap<String, String>,
    #[serde(default = "default_group")]
    pub default_group: String,
}

impl Default for GroupMap {
    fn default() -> Self {
        Self {
            assignments: BTreeMap::new(),
            default_group: default_group(),
        }
    }
}

impl GroupMap {
    pub fn group_for(&self, category: &str) -> &str {
        self.assignments
            .get(category)
            .map(String::as_str)
            .unwrap_or(&self.default_group)
    }
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

/// Summary of a seeding pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub categories_added: usize,
    pub categories_regrouped: usize,
    pub values_added: usize,
    /// Categories whose fixture entry was not a list.
    pub skipped: Vec<String>,
}

/// Split a fixture entry on its first `:` into core and description.
pub fn parse_value_entry(raw: &str) -> Value {
    match raw.split_once(':') {
        Some((core, description)) => Value::new(core.trim(), Some(description.trim().to_string())),
        None => Value::new(raw.trim(), None),
    }
}

impl CatalogStore {
    /// Merge fixture categories and values into the catalog.
    ///
    /// Existing cores are left untouched, so seeding is repeatable.
    pub fn seed(&mut self, fixture: &SeedFixture, groups: &GroupMap) -> SeedReport {
        let mut report = SeedReport::default();
        if fixture.automation.is_empty() {
            warn!("fixture has no 'automation' section or it is empty");
        }

        for (name, entries) in &fixture.automation {
            let JsonValue::Array(entries) = entries else {
                warn!(category = %name, "expected a list of values, skipping category");
                report.skipped.push(name.clone());
                continue;
            };

            let group = groups.group_for(name).to_string();
            if self.category_mut(name).is_none() {
                let mut category = Category::new(name.clone());
                category.display_group = Some(group.clone());
                self.upsert_category(category);
                report.categories_added += 1;
                info!(category = %name, group = %group, "category added");
            }
            let Some(category) = self.category_mut(name) else {
                continue;
            };
            if category.display_group.as_deref() != Some(group.as_str()) {
                info!(category = %name, group = %group, "category regrouped");
                category.display_group = Some(group);
                report.categories_regrouped += 1;
            }

            let mut existing: HashSet<String> =
                category.values.iter().map(|value| value.core.clone()).collect();
            for entry in entries {
                let raw = match entry {
                    JsonValue::String(text) => text.clone(),
                    other => other.to_string(),
                };
                let value = parse_value_entry(&raw);
                if existing.insert(value.core.clone()) {
                    category.values.push(value);
                    report.values_added += 1;
                }
            }
        }

        info!(
            categories_added = report.categories_added,
            categories_regrouped = report.categories_regrouped,
            values_added = report.values_added,
            skipped = report.skipped.len(),
            "catalog seeded"
        );
        report
    }
}
