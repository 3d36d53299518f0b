use challenger_core::{
    Category, IntRange, RangeError, Rule, RuleKind, RuleSpec, Scalar, Value, resolve_count,
};
use rand::seq::index;
use rand::{Rng, RngCore};
use tracing::debug;

use crate::errors::{CandidateSource, GenerationIssue};
use crate::model::ValueRecord;

/// Outcome of evaluating one rule against one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Selected records, or `None` when the rule failed.
    pub values: Option<Vec<ValueRecord>>,
    /// The failure cause (if any) plus non-fatal warnings.
    pub issues: Vec<GenerationIssue>,
}

impl Evaluation {
    fn selected(values: Vec<ValueRecord>, warnings: Vec<GenerationIssue>) -> Self {
        Self {
            values: Some(values),
            issues: warnings,
        }
    }

    fn failed(issue: GenerationIssue) -> Self {
        Self {
            values: None,
            issues: vec![issue],
        }
    }

    pub fn is_success(&self) -> bool {
        self.values.is_some()
    }
}

/// Single-category value selection.
///
/// Stateless: each call is an independent draw from `rng`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn evaluate(category: &Category, spec: &RuleSpec, rng: &mut dyn RngCore) -> Evaluation {
        let name = category.name.as_str();
        let evaluation = match &spec.rule {
            Rule::Fixed { value } => select_fixed(category, value.as_deref()),
            Rule::RandomFromCategory { count } => match resolve_count(count.as_ref()) {
                Ok(requested) => {
                    if category.values.is_empty() {
                        Evaluation::failed(GenerationIssue::EmptyPool {
                            category: name.to_string(),
                        })
                    } else {
                        let candidates: Vec<&Value> = category.values.iter().collect();
                        sample_values(name, &candidates, requested, CandidateSource::Category, rng)
                    }
                }
                Err(source) => Evaluation::failed(GenerationIssue::InvalidCount {
                    category: name.to_string(),
                    source,
                }),
            },
            Rule::RandomFromList {
                allowed_values,
                count,
            } => select_from_list(category, allowed_values.as_deref(), count.as_ref(), rng),
            Rule::Range { min, max, step } => {
                pick_from_range(name, min.as_ref(), max.as_ref(), step.as_ref(), rng)
            }
            Rule::Unknown { name: rule } => Evaluation::failed(GenerationIssue::UnknownRule {
                category: name.to_string(),
                rule: rule.clone(),
            }),
        };

        debug!(
            category = %name,
            rule = %spec.rule.name(),
            selected = evaluation.values.as_ref().map(Vec::len).unwrap_or(0),
            ok = evaluation.is_success(),
            "rule evaluated"
        );
        evaluation
    }
}

fn select_fixed(category: &Category, value: Option<&str>) -> Evaluation {
    let core = match value {
        Some(core) if !core.trim().is_empty() => core,
        _ => {
            return Evaluation::failed(GenerationIssue::MissingField {
                category: category.name.clone(),
                rule: RuleKind::Fixed,
                field: "value",
            });
        }
    };
    // Unknown cores are still emitted verbatim, just without a description.
    let description = category
        .find_value(core)
        .and_then(|value| value.description.clone());
    Evaluation::selected(vec![ValueRecord::new(core, description)], Vec::new())
}

fn select_from_list(
    category: &Category,
    allowed_values: Option<&[String]>,
    count: Option<&Scalar>,
    rng: &mut dyn RngCore,
) -> Evaluation {
    let name = category.name.as_str();
    let allowed = match allowed_values {
        Some(allowed) if !allowed.is_empty() => allowed,
        _ => {
            return Evaluation::failed(GenerationIssue::MissingField {
                category: name.to_string(),
                rule: RuleKind::RandomFromList,
                field: "allowed_values",
            });
        }
    };
    let requested = match resolve_count(count) {
        Ok(requested) => requested,
        Err(source) => {
            return Evaluation::failed(GenerationIssue::InvalidCount {
                category: name.to_string(),
                source,
            });
        }
    };

    let candidates: Vec<&Value> = category
        .values
        .iter()
        .filter(|value| allowed.contains(&value.core))
        .collect();
    if candidates.is_empty() {
        return Evaluation::failed(GenerationIssue::NoMatchingValues {
            category: name.to_string(),
            allowed: allowed.to_vec(),
        });
    }

    sample_values(name, &candidates, requested, CandidateSource::AllowedList, rng)
}

/// Uniform sample without replacement of `min(requested, candidates)` values.
fn sample_values(
    category: &str,
    candidates: &[&Value],
    requested: usize,
    from: CandidateSource,
    rng: &mut dyn RngCore,
) -> Evaluation {
    let available = candidates.len();
    let amount = requested.min(available);
    let mut warnings = Vec::new();
    if amount < requested {
        warnings.push(GenerationIssue::CapacityReduced {
            category: category.to_string(),
            from,
            requested,
            available,
        });
    }

    let values = index::sample(rng, available, amount)
        .into_iter()
        .map(|idx| ValueRecord::from(candidates[idx]))
        .collect();
    Evaluation::selected(values, warnings)
}

fn pick_from_range(
    category: &str,
    min: Option<&Scalar>,
    max: Option<&Scalar>,
    step: Option<&Scalar>,
    rng: &mut dyn RngCore,
) -> Evaluation {
    let range = match IntRange::resolve(min, max, step) {
        Ok(range) => range,
        Err(RangeError::MissingBound) => {
            return Evaluation::failed(GenerationIssue::MissingField {
                category: category.to_string(),
                rule: RuleKind::Range,
                field: if min.is_none() { "min" } else { "max" },
            });
        }
        Err(source) => {
            return Evaluation::failed(GenerationIssue::InvalidRange {
                category: category.to_string(),
                min: display_param(min),
                max: display_param(max),
                step: display_param(step),
                source,
            });
        }
    };

    let value = range.nth(rng.random_range(0..range.len()));
    Evaluation::selected(vec![ValueRecord::new(value.to_string(), None)], Vec::new())
}

fn display_param(value: Option<&Scalar>) -> String {
    value
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use challenger_core::Value;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    use super::*;

    fn engines() -> Category {
        let mut category = Category::with_values("Engine Type", ["V6", "V8", "V12", "I4", "Electric"]);
        category.values[1] = Value::new("V8", Some("Eight cylinders".to_string()));
        category
    }

    fn spec(value: serde_json::Value) -> RuleSpec {
        RuleSpec::from_json(&value).expect("rule mapping")
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn random_from_category_draws_distinct_pool_members() {
        let category = engines();
        let mut rng = rng();
        for _ in 0..50 {
            let evaluation =
                RuleEvaluator::evaluate(&category, &RuleSpec::random_from_category(3), &mut rng);
            let values = evaluation.values.expect("selected");
            assert_eq!(values.len(), 3);
            let distinct: HashSet<&str> = values.iter().map(|v| v.value.as_str()).collect();
            assert_eq!(distinct.len(), 3);
            for record in &values {
                let source = category.find_value(&record.value).expect("pool member");
                assert_eq!(record.description, source.description);
            }
            assert!(evaluation.issues.is_empty());
        }
    }

    #[test]
    fn oversized_count_is_reduced_with_warning() {
        let category = engines();
        let evaluation =
            RuleEvaluator::evaluate(&category, &RuleSpec::random_from_category(9), &mut rng());
        assert_eq!(evaluation.values.map(|v| v.len()), Some(5));
        assert_eq!(
            evaluation.issues,
            vec![GenerationIssue::CapacityReduced {
                category: "Engine Type".to_string(),
                from: CandidateSource::Category,
                requested: 9,
                available: 5,
            }]
        );
    }

    #[test]
    fn empty_pool_fails() {
        let evaluation = RuleEvaluator::evaluate(
            &Category::new("Nothing"),
            &RuleSpec::random_from_category(1),
            &mut rng(),
        );
        assert_eq!(evaluation.values, None);
        assert_eq!(evaluation.issues[0].code(), "empty_pool");
    }

    #[test]
    fn zero_count_fails() {
        let evaluation = RuleEvaluator::evaluate(
            &engines(),
            &spec(json!({"rule": "random_from_category", "count": 0})),
            &mut rng(),
        );
        assert!(!evaluation.is_success());
        assert_eq!(evaluation.issues[0].code(), "invalid_count");
    }

    #[test]
    fn random_from_list_only_draws_allowed_values() {
        let rule = RuleSpec::random_from_list(["V8", "V12", "Rotary"], 2);
        let mut rng = rng();
        for _ in 0..30 {
            let evaluation = RuleEvaluator::evaluate(&engines(), &rule, &mut rng);
            let values = evaluation.values.expect("selected");
            assert_eq!(values.len(), 2);
            assert!(values.iter().all(|v| v.value == "V8" || v.value == "V12"));
        }
    }

    #[test]
    fn random_from_list_reduces_to_filtered_size() {
        let rule = RuleSpec::random_from_list(["V8", "Rotary"], 3);
        let evaluation = RuleEvaluator::evaluate(&engines(), &rule, &mut rng());
        assert_eq!(
            evaluation.values,
            Some(vec![ValueRecord::new("V8", Some("Eight cylinders".to_string()))])
        );
        assert_eq!(evaluation.issues[0].code(), "capacity_reduced");
    }

    #[test]
    fn random_from_list_failures() {
        let empty = RuleEvaluator::evaluate(
            &engines(),
            &spec(json!({"rule": "random_from_list", "allowed_values": []})),
            &mut rng(),
        );
        assert_eq!(empty.issues[0].code(), "missing_field");

        let not_a_list = RuleEvaluator::evaluate(
            &engines(),
            &spec(json!({"rule": "random_from_list", "allowed_values": "V8"})),
            &mut rng(),
        );
        assert_eq!(not_a_list.issues[0].code(), "missing_field");

        let no_match = RuleEvaluator::evaluate(
            &engines(),
            &RuleSpec::random_from_list(["Steam"], 1),
            &mut rng(),
        );
        assert_eq!(no_match.values, None);
        assert_eq!(
            no_match.issues[0].to_string(),
            "category 'Engine Type': no values match the allowed list [Steam]"
        );
    }

    #[test]
    fn fixed_attaches_description_when_known() {
        let known = RuleEvaluator::evaluate(&engines(), &RuleSpec::fixed("V8"), &mut rng());
        assert_eq!(
            known.values,
            Some(vec![ValueRecord::new("V8", Some("Eight cylinders".to_string()))])
        );

        let unknown = RuleEvaluator::evaluate(&engines(), &RuleSpec::fixed("X"), &mut rng());
        assert_eq!(unknown.values, Some(vec![ValueRecord::new("X", None)]));
        assert!(unknown.issues.is_empty());
    }

    #[test]
    fn fixed_without_value_fails() {
        let evaluation =
            RuleEvaluator::evaluate(&engines(), &spec(json!({"rule": "fixed", "value": " "})), &mut rng());
        assert_eq!(
            evaluation.issues,
            vec![GenerationIssue::MissingField {
                category: "Engine Type".to_string(),
                rule: RuleKind::Fixed,
                field: "value",
            }]
        );
    }

    #[test]
    fn range_stays_on_step_boundaries() {
        let category = Category::new("Horsepower");
        let rule = RuleSpec::range(0, 10, 5);
        let mut rng = rng();
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let values = RuleEvaluator::evaluate(&category, &rule, &mut rng)
                .values
                .expect("selected");
            assert_eq!(values.len(), 1);
            assert_eq!(values[0].description, None);
            seen.insert(values[0].value.clone());
        }
        let expected: HashSet<String> = ["0", "5", "10"].iter().map(|v| v.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn degenerate_range_yields_min() {
        let evaluation = RuleEvaluator::evaluate(
            &Category::new("Horsepower"),
            &RuleSpec::range(10, 10, 3),
            &mut rng(),
        );
        assert_eq!(evaluation.values, Some(vec![ValueRecord::new("10", None)]));
    }

    #[test]
    fn full_width_range_draws_without_overflow() {
        let category = Category::new("Horsepower");
        let mut rng = rng();
        for rule in [
            RuleSpec::range(i64::MIN, i64::MAX, 1),
            RuleSpec::range(i64::MIN, i64::MAX, i64::MAX),
        ] {
            let values = RuleEvaluator::evaluate(&category, &rule, &mut rng)
                .values
                .expect("selected");
            assert_eq!(values.len(), 1);
            assert!(values[0].value.parse::<i64>().is_ok());
        }
    }

    #[test]
    fn range_failures_are_reported() {
        let category = Category::new("Horsepower");
        let cases = [
            (json!({"rule": "range", "min": "a", "max": 5}), "invalid_range"),
            (json!({"rule": "range", "min": 1, "max": 5, "step": 0}), "invalid_range"),
            (json!({"rule": "range", "min": 1, "max": 5, "step": -2}), "invalid_range"),
            (json!({"rule": "range", "min": 9, "max": 5}), "invalid_range"),
            (json!({"rule": "range", "max": 5}), "missing_field"),
        ];
        for (rule, code) in cases {
            let evaluation = RuleEvaluator::evaluate(&category, &spec(rule.clone()), &mut rng());
            assert!(!evaluation.is_success(), "{rule}");
            assert_eq!(evaluation.issues[0].code(), code, "{rule}");
        }
    }

    #[test]
    fn unknown_rule_always_fails() {
        let evaluation = RuleEvaluator::evaluate(
            &engines(),
            &spec(json!({"rule": "filter_and_random", "count": 1})),
            &mut rng(),
        );
        assert_eq!(
            evaluation.issues[0].to_string(),
            "category 'Engine Type': unknown rule 'filter_and_random'"
        );
    }

    #[test]
    fn same_seed_same_draw() {
        let rule = RuleSpec::random_from_category(2);
        let a = RuleEvaluator::evaluate(&engines(), &rule, &mut ChaCha8Rng::seed_from_u64(99));
        let b = RuleEvaluator::evaluate(&engines(), &rule, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
