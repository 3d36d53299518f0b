//! Core contracts for Challenger.
//!
//! This crate defines the catalog model (categories, values, templates), the
//! per-category rule specs and configuration mapping consumed by the
//! generation engine, and the lookup traits plus an in-memory catalog that
//! backs them.

pub mod config;
pub mod error;
pub mod groups;
pub mod model;
pub mod rules;
pub mod seed;
pub mod store;
pub mod validation;

pub use config::Configuration;
pub use error::{Error, Result};
pub use groups::{CategoryGroup, group_categories};
pub use model::{Category, Template, TemplateConfigError, Value};
pub use rules::{
    CountError, IntRange, RangeError, Rule, RuleKind, RuleSpec, Scalar, WireRule, resolve_count,
};
pub use seed::{DEFAULT_GROUP, GroupMap, SeedFixture, SeedReport, parse_value_entry};
pub use store::{
    CatalogSnapshot, CatalogStore, CategoryLookup, FULL_RANDOM_TEMPLATE, TemplateLookup,
};
pub use validation::{IssueSeverity, ValidationIssue, ValidationReport, validate_configuration};
