use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::model::{Category, Template};
use crate::rules::RuleSpec;

/// Name of the template installed by [`CatalogStore::install_default_templates`].
pub const FULL_RANDOM_TEMPLATE: &str = "Full Random";

/// Category/value lookup consumed by the generation engine.
pub trait CategoryLookup {
    fn find_category_by_name(&self, name: &str) -> Option<&Category>;
}

/// Template lookup consumed when a generator is built from a template id.
pub trait TemplateLookup {
    fn find_template_by_id(&self, id: u64) -> Option<&Template>;
}

/// Serialized form of a [`CatalogStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

/// In-memory catalog of categories and templates.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    categories: Vec<Category>,
    templates: Vec<Template>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut store = Self::new();
        for category in snapshot.categories {
            store.upsert_category(category);
        }
        store.templates = snapshot.templates;
        store
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            categories: self.categories.clone(),
            templates: self.templates.clone(),
        }
    }

    /// Load a snapshot; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "catalog file missing, starting empty");
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&content)?;
        let store = Self::from_snapshot(snapshot);
        info!(
            path = %path.display(),
            categories = store.categories.len(),
            templates = store.templates.len(),
            "catalog loaded"
        );
        Ok(store)
    }

    /// Persist the catalog through a temp file + rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.snapshot())?;
        write_bytes_atomic(path, &data)?;
        info!(path = %path.display(), "catalog saved");
        Ok(())
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn category_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|category| category.name == name)
    }

    /// Insert a category, replacing any category with the same name.
    pub fn upsert_category(&mut self, category: Category) {
        match self.category_mut(&category.name) {
            Some(existing) => *existing = category,
            None => self.categories.push(category),
        }
    }

    pub fn find_template_by_name(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|template| template.name == name)
    }

    /// Store a configuration as a new named template.
    pub fn save_template(
        &mut self,
        name: &str,
        description: Option<&str>,
        config: &Configuration,
    ) -> Result<&Template> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidTemplate(
                "template name cannot be empty".to_string(),
            ));
        }
        if self.find_template_by_name(name).is_some() {
            return Err(Error::DuplicateTemplate(name.to_string()));
        }

        let id = self.templates.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let description = description
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        self.templates.push(Template {
            id,
            name: name.to_string(),
            description,
            config_json: config.to_json_string()?,
        });
        info!(template_id = id, name = %name, "template saved");

        self.templates
            .last()
            .ok_or_else(|| Error::Other("template vanished after insert".to_string()))
    }

    /// Install the "Full Random" template (one random value from every
    /// category) unless a template with that name exists.
    pub fn install_default_templates(&mut self) -> Result<bool> {
        if self.find_template_by_name(FULL_RANDOM_TEMPLATE).is_some() {
            return Ok(false);
        }
        let config: Configuration = self
            .categories
            .iter()
            .map(|category| (category.name.clone(), RuleSpec::random_from_category(1)))
            .collect();
        self.save_template(
            FULL_RANDOM_TEMPLATE,
            Some("One random value from every category."),
            &config,
        )?;
        Ok(true)
    }
}

impl CategoryLookup for CatalogStore {
    fn find_category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }
}

impl TemplateLookup for CatalogStore {
    fn find_template_by_id(&self, id: u64) -> Option<&Template> {
        self.templates.iter().find(|template| template.id == id)
    }
}

fn write_bytes_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Other("invalid path for atomic write".to_string()))?;
    let tmp_name = format!("{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}
