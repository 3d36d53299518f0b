use serde::Serialize;

use crate::config::Configuration;
use crate::rules::{IntRange, Rule, RuleSpec, resolve_count};
use crate::store::CategoryLookup;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Structured validation issue with a JSON-path style location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, code: &str, path: String, message: String) {
        self.errors
            .push(ValidationIssue::new(IssueSeverity::Error, code, path, message));
    }

    fn warning(&mut self, code: &str, path: String, message: String) {
        self.warnings
            .push(ValidationIssue::new(IssueSeverity::Warning, code, path, message));
    }
}

/// Lint a configuration against the catalog without drawing anything.
///
/// This anticipates what generation would report: every error here would
/// make the category fail, every warning would let it through reduced or
/// ignored.
pub fn validate_configuration(
    config: &Configuration,
    categories: &dyn CategoryLookup,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    if config.is_empty() {
        report.error("empty_configuration", "$".to_string(), "configuration is empty".to_string());
    }

    for (name, entry) in config.iter() {
        let path = format!("$.{name}");
        let spec = match RuleSpec::from_json(entry) {
            Ok(spec) => spec,
            Err(err) => {
                report.error("rule_not_mapping", path, err.to_string());
                continue;
            }
        };

        let Some(category) = categories.find_category_by_name(name) else {
            report.error(
                "unknown_category",
                path,
                format!("category '{name}' not found"),
            );
            continue;
        };

        let count_present = entry.get("count").is_some();
        match &spec.rule {
            Rule::Fixed { value } => {
                match value.as_deref().map(str::trim) {
                    None | Some("") => report.error(
                        "missing_field",
                        format!("{path}.value"),
                        "rule 'fixed' requires 'value'".to_string(),
                    ),
                    Some(core) if !category.contains_core(core) => report.warning(
                        "value_not_in_category",
                        format!("{path}.value"),
                        format!("'{core}' is not a value of '{name}'; it will be used without description"),
                    ),
                    Some(_) => {}
                }
                if count_present {
                    report.warning(
                        "count_ignored",
                        format!("{path}.count"),
                        "'count' has no effect for rule 'fixed'".to_string(),
                    );
                }
            }
            Rule::RandomFromCategory { count } => {
                if category.values.is_empty() {
                    report.error(
                        "empty_pool",
                        path.clone(),
                        format!("category '{name}' has no values"),
                    );
                }
                check_count(&mut report, &path, count.as_ref(), category.values.len());
            }
            Rule::RandomFromList {
                allowed_values,
                count,
            } => {
                let allowed = allowed_values.as_deref().unwrap_or_default();
                if allowed.is_empty() {
                    report.error(
                        "missing_field",
                        format!("{path}.allowed_values"),
                        "rule 'random_from_list' requires a non-empty 'allowed_values' list"
                            .to_string(),
                    );
                } else {
                    let unknown: Vec<&str> = allowed
                        .iter()
                        .map(String::as_str)
                        .filter(|core| !category.contains_core(core))
                        .collect();
                    if unknown.len() == allowed.len() {
                        report.error(
                            "no_matching_values",
                            format!("{path}.allowed_values"),
                            format!("no value of '{name}' matches the allowed list"),
                        );
                    } else if !unknown.is_empty() {
                        report.warning(
                            "unknown_allowed_value",
                            format!("{path}.allowed_values"),
                            format!("not values of '{name}': {}", unknown.join(", ")),
                        );
                    }
                    let eligible = category
                        .values
                        .iter()
                        .filter(|value| allowed.contains(&value.core))
                        .count();
                    check_count(&mut report, &path, count.as_ref(), eligible);
                }
            }
            Rule::Range { min, max, step } => {
                if let Err(err) = IntRange::resolve(min.as_ref(), max.as_ref(), step.as_ref()) {
                    report.error("invalid_range", path.clone(), err.to_string());
                }
                if count_present {
                    report.warning(
                        "count_ignored",
                        format!("{path}.count"),
                        "'count' has no effect for rule 'range'".to_string(),
                    );
                }
            }
            Rule::Unknown { name: rule } => {
                report.error(
                    "unknown_rule",
                    format!("{path}.rule"),
                    format!("unknown rule '{rule}'"),
                );
            }
        }
    }

    report
}

fn check_count(
    report: &mut ValidationReport,
    path: &str,
    count: Option<&crate::rules::Scalar>,
    available: usize,
) {
    match resolve_count(count) {
        Ok(requested) if available > 0 && requested > available => report.warning(
            "count_exceeds_pool",
            format!("{path}.count"),
            format!("requested {requested}, only {available} available"),
        ),
        Ok(_) => {}
        Err(err) => report.error("invalid_count", format!("{path}.count"), err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::Category;
    use crate::store::CatalogStore;

    fn store() -> CatalogStore {
        let mut store = CatalogStore::new();
        store.upsert_category(Category::with_values("Drive", ["AWD", "RWD"]));
        store.upsert_category(Category::with_values("Era", ["70s"]));
        store.upsert_category(Category::new("Empty"));
        store
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|issue| issue.code.as_str()).collect()
    }

    #[test]
    fn clean_configuration_passes() {
        let config = Configuration::from_value(json!({
            "Drive": {"rule": "random_from_list", "allowed_values": ["AWD", "RWD"], "count": 1},
            "Era": {"rule": "fixed", "value": "70s", "apply_all": true},
            "Power": {"rule": "range", "min": "100", "max": "300", "step": "50"}
        }))
        .unwrap();
        let mut store = store();
        store.upsert_category(Category::new("Power"));

        let report = validate_configuration(&config, &store);
        assert!(report.is_ok(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn reports_errors_per_category() {
        let config = Configuration::from_value(json!({
            "Drive": {"rule": "random_from_list", "allowed_values": ["4WD"]},
            "Era": {"rule": "teleport"},
            "Empty": {"rule": "random_from_category"},
            "Ghost": {"rule": "fixed", "value": "x"},
            "Broken": 7
        }))
        .unwrap();

        let report = validate_configuration(&config, &store());
        assert_eq!(
            codes(&report.errors),
            vec![
                "no_matching_values",
                "unknown_rule",
                "empty_pool",
                "unknown_category",
                "rule_not_mapping"
            ]
        );
        assert_eq!(report.errors[0].path, "$.Drive.allowed_values");
    }

    #[test]
    fn report_serializes_for_output() {
        let config = Configuration::from_value(json!({"Ghost": {"rule": "fixed", "value": "x"}}))
            .unwrap();
        let report = validate_configuration(&config, &store());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            json!({
                "errors": [{
                    "severity": "error",
                    "code": "unknown_category",
                    "path": "$.Ghost",
                    "message": "category 'Ghost' not found"
                }],
                "warnings": []
            })
        );
    }

    #[test]
    fn reports_capacity_and_ignored_count_warnings() {
        let config = Configuration::from_value(json!({
            "Drive": {"rule": "random_from_category", "count": 5},
            "Era": {"rule": "fixed", "value": "90s", "count": 2}
        }))
        .unwrap();

        let report = validate_configuration(&config, &store());
        assert!(report.is_ok());
        assert_eq!(
            codes(&report.warnings),
            vec!["count_exceeds_pool", "value_not_in_category", "count_ignored"]
        );
    }
}
