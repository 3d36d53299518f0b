use std::fs;
use std::path::PathBuf;

use challenger_core::{
    CatalogStore, Category, CategoryLookup, Configuration, GroupMap, RuleSpec, SeedFixture,
    TemplateLookup,
};

#[test]
fn catalog_survives_save_and_load() {
    let dir = temp_dir("roundtrip");
    let path = dir.join("catalog.json");

    let mut store = CatalogStore::new();
    let fixture: SeedFixture = serde_json::from_str(
        r#"{"automation": {"Engine Type": ["V8: Loud", "I4"], "Drive": ["AWD", "RWD"]}}"#,
    )
    .expect("parse fixture");
    store.seed(&fixture, &GroupMap::default());
    let mut config = Configuration::new();
    config.insert_rule("Engine Type", &RuleSpec::fixed("V8").with_apply_all(true));
    let id = store
        .save_template("Muscle", Some("Big engines"), &config)
        .expect("save template")
        .id;
    store.save(&path).expect("save catalog");

    let loaded = CatalogStore::load(&path).expect("load catalog");
    let engine = loaded
        .find_category_by_name("Engine Type")
        .expect("engine category");
    assert_eq!(engine.values.len(), 2);
    assert_eq!(engine.values[0].description.as_deref(), Some("Loud"));

    let template = loaded.find_template_by_id(id).expect("template");
    assert_eq!(template.config().expect("decode config"), config);
    assert!(!dir.join("catalog.json.tmp").exists());
}

#[test]
fn missing_catalog_file_loads_empty() {
    let dir = temp_dir("missing");
    let store = CatalogStore::load(&dir.join("absent.json")).expect("load");
    assert!(store.categories().is_empty());
    assert!(store.templates().is_empty());
}

#[test]
fn snapshot_deduplicates_category_names() {
    let snapshot = challenger_core::CatalogSnapshot {
        categories: vec![
            Category::with_values("Drive", ["AWD"]),
            Category::with_values("Drive", ["RWD", "FWD"]),
        ],
        templates: Vec::new(),
    };
    let store = CatalogStore::from_snapshot(snapshot);
    assert_eq!(store.categories().len(), 1);
    assert_eq!(
        store
            .find_category_by_name("Drive")
            .map(|category| category.values.len()),
        Some(2)
    );
}

fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("challenger_core_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
