//! Per-category generation rules.
//!
//! Rule entries arrive as loosely typed JSON (form posts send numbers as
//! strings, templates were written by hand). Parsing here is lenient: only an
//! entry that is not a mapping is rejected outright. Field-level problems are
//! kept in the parsed [`Rule`] and reported when the rule is evaluated, so the
//! failure is attributed to the category that owns it.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::config::json_kind;
use crate::error::{Error, Result};

/// Integer-like rule parameter that may have been supplied as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    /// Integer value, accepting surrounding whitespace in text form.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(value) => Some(*value),
            Scalar::Text(text) => text.trim().parse().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(text) if text.trim().is_empty())
    }

    fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Number(number) => Some(match number.as_i64() {
                Some(int) => Scalar::Int(int),
                None => Scalar::Text(number.to_string()),
            }),
            JsonValue::String(text) => Some(Scalar::Text(text.clone())),
            other => Some(Scalar::Text(other.to_string())),
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Int(value) => JsonValue::from(*value),
            Scalar::Text(text) => JsonValue::from(text.as_str()),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Text(text) => write!(f, "{text}"),
        }
    }
}

/// Known rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Fixed,
    RandomFromCategory,
    RandomFromList,
    Range,
}

impl RuleKind {
    pub const ALL: [RuleKind; 4] = [
        RuleKind::Fixed,
        RuleKind::RandomFromCategory,
        RuleKind::RandomFromList,
        RuleKind::Range,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Fixed => "fixed",
            RuleKind::RandomFromCategory => "random_from_category",
            RuleKind::RandomFromList => "random_from_list",
            RuleKind::Range => "range",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether `count` has any effect for this kind.
    pub fn uses_count(self) -> bool {
        matches!(self, RuleKind::RandomFromCategory | RuleKind::RandomFromList)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule union; every kind the engine may meet, including unrecognized ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Fixed {
        value: Option<String>,
    },
    RandomFromCategory {
        count: Option<Scalar>,
    },
    RandomFromList {
        /// `None` when missing or not a list.
        allowed_values: Option<Vec<String>>,
        count: Option<Scalar>,
    },
    Range {
        min: Option<Scalar>,
        max: Option<Scalar>,
        step: Option<Scalar>,
    },
    Unknown {
        name: String,
    },
}

impl Rule {
    pub fn kind(&self) -> Option<RuleKind> {
        match self {
            Rule::Fixed { .. } => Some(RuleKind::Fixed),
            Rule::RandomFromCategory { .. } => Some(RuleKind::RandomFromCategory),
            Rule::RandomFromList { .. } => Some(RuleKind::RandomFromList),
            Rule::Range { .. } => Some(RuleKind::Range),
            Rule::Unknown { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Rule::Unknown { name } => name.as_str(),
            known => known.kind().map(RuleKind::as_str).unwrap_or_default(),
        }
    }
}

/// A category's generation policy plus its fan-out flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub rule: Rule,
    /// Share one draw across all players instead of drawing per player.
    pub apply_all: bool,
}

impl RuleSpec {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            apply_all: false,
        }
    }

    pub fn fixed(value: impl Into<String>) -> Self {
        Self::new(Rule::Fixed {
            value: Some(value.into()),
        })
    }

    pub fn random_from_category(count: i64) -> Self {
        Self::new(Rule::RandomFromCategory {
            count: Some(Scalar::Int(count)),
        })
    }

    pub fn random_from_list<I, S>(allowed_values: I, count: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Rule::RandomFromList {
            allowed_values: Some(allowed_values.into_iter().map(Into::into).collect()),
            count: Some(Scalar::Int(count)),
        })
    }

    pub fn range(min: impl Into<Scalar>, max: impl Into<Scalar>, step: impl Into<Scalar>) -> Self {
        Self::new(Rule::Range {
            min: Some(min.into()),
            max: Some(max.into()),
            step: Some(step.into()),
        })
    }

    pub fn with_apply_all(mut self, apply_all: bool) -> Self {
        self.apply_all = apply_all;
        self
    }

    /// Copy of this rule with `count` replaced; kinds without a count are
    /// returned unchanged.
    pub fn with_count(&self, count: i64) -> Self {
        let mut spec = self.clone();
        match &mut spec.rule {
            Rule::RandomFromCategory { count: slot } | Rule::RandomFromList { count: slot, .. } => {
                *slot = Some(Scalar::Int(count));
            }
            Rule::Fixed { .. } | Rule::Range { .. } | Rule::Unknown { .. } => {}
        }
        spec
    }

    /// Interpret a raw configuration entry.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let JsonValue::Object(map) = value else {
            return Err(Error::InvalidConfiguration(format!(
                "rule entry must be a mapping, got {}",
                json_kind(value)
            )));
        };

        let name = match map.get("rule") {
            None | Some(JsonValue::Null) => RuleKind::RandomFromCategory.as_str().to_string(),
            Some(JsonValue::String(name)) => name.trim().to_string(),
            Some(other) => other.to_string(),
        };
        let count = map.get("count").and_then(Scalar::from_json);

        let rule = match RuleKind::parse(&name) {
            Some(RuleKind::Fixed) => Rule::Fixed {
                value: map.get("value").and_then(text_of),
            },
            Some(RuleKind::RandomFromCategory) => Rule::RandomFromCategory { count },
            Some(RuleKind::RandomFromList) => Rule::RandomFromList {
                allowed_values: match map.get("allowed_values") {
                    Some(JsonValue::Array(items)) => {
                        Some(items.iter().filter_map(text_of).collect())
                    }
                    _ => None,
                },
                count,
            },
            Some(RuleKind::Range) => Rule::Range {
                min: map.get("min").and_then(Scalar::from_json),
                max: map.get("max").and_then(Scalar::from_json),
                step: map.get("step").and_then(Scalar::from_json),
            },
            None => Rule::Unknown { name },
        };

        Ok(Self {
            rule,
            apply_all: map.get("apply_all").is_some_and(truthy),
        })
    }

    /// Wire representation, as stored in templates.
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert("rule".to_string(), JsonValue::from(self.rule.name()));
        map.insert("apply_all".to_string(), JsonValue::Bool(self.apply_all));
        match &self.rule {
            Rule::Fixed { value } => {
                if let Some(value) = value {
                    map.insert("value".to_string(), JsonValue::from(value.as_str()));
                }
            }
            Rule::RandomFromCategory { count } => {
                insert_scalar(&mut map, "count", count);
            }
            Rule::RandomFromList {
                allowed_values,
                count,
            } => {
                insert_scalar(&mut map, "count", count);
                if let Some(values) = allowed_values {
                    map.insert(
                        "allowed_values".to_string(),
                        JsonValue::Array(values.iter().map(|v| JsonValue::from(v.as_str())).collect()),
                    );
                }
            }
            Rule::Range { min, max, step } => {
                insert_scalar(&mut map, "min", min);
                insert_scalar(&mut map, "max", max);
                insert_scalar(&mut map, "step", step);
            }
            Rule::Unknown { .. } => {}
        }
        JsonValue::Object(map)
    }
}

/// Draw count for the random kinds; a missing count means 1.
pub fn resolve_count(count: Option<&Scalar>) -> std::result::Result<usize, CountError> {
    let Some(count) = count else {
        return Ok(1);
    };
    match count.as_int() {
        Some(value) if value >= 1 => usize::try_from(value).map_err(|_| CountError {
            raw: count.to_string(),
        }),
        _ => Err(CountError {
            raw: count.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[error("count must be a positive integer, got '{raw}'")]
pub struct CountError {
    pub raw: String,
}

/// Why range parameters could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum RangeError {
    #[error("'min' and 'max' are required")]
    MissingBound,
    #[error("'{field}' is not an integer ('{raw}')")]
    NotInteger { field: &'static str, raw: String },
    #[error("step must be a positive number")]
    NonPositiveStep,
    #[error("min cannot be greater than max")]
    MinAboveMax,
}

/// Integer arithmetic sequence `min, min + step, ...` bounded by `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
    pub step: i64,
}

impl IntRange {
    /// Resolve raw parameters. A missing or blank step means 1; `min == max`
    /// is a one-element sequence.
    pub fn resolve(
        min: Option<&Scalar>,
        max: Option<&Scalar>,
        step: Option<&Scalar>,
    ) -> std::result::Result<Self, RangeError> {
        let (Some(min), Some(max)) = (min, max) else {
            return Err(RangeError::MissingBound);
        };
        let min = int_param("min", min)?;
        let max = int_param("max", max)?;
        let step = match step {
            Some(step) if !step.is_blank() => int_param("step", step)?,
            _ => 1,
        };
        if step <= 0 {
            return Err(RangeError::NonPositiveStep);
        }
        if min > max {
            return Err(RangeError::MinAboveMax);
        }
        Ok(Self { min, max, step })
    }

    /// Number of elements in the sequence (always at least 1).
    ///
    /// Counted in `u128`: `i64::MIN..=i64::MAX` with step 1 holds 2^64 values.
    pub fn len(&self) -> u128 {
        let span = i128::from(self.max) - i128::from(self.min);
        (span / i128::from(self.step)) as u128 + 1
    }

    /// Element at `index`, which must be below [`IntRange::len`].
    pub fn nth(&self, index: u128) -> i64 {
        let offset = i128::try_from(index).unwrap_or(i128::MAX);
        let value = offset
            .saturating_mul(i128::from(self.step))
            .saturating_add(i128::from(self.min));
        value.clamp(i128::from(self.min), i128::from(self.max)) as i64
    }
}

fn int_param(field: &'static str, value: &Scalar) -> std::result::Result<i64, RangeError> {
    value.as_int().ok_or_else(|| RangeError::NotInteger {
        field,
        raw: value.to_string(),
    })
}

/// Documented wire shape of one configuration entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WireRule {
    /// Rule kind; defaults to `random_from_category`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleKind>,
    /// Same draw for every player when true.
    #[serde(default)]
    pub apply_all: bool,
    /// Number of values to draw (random kinds only); defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Scalar>,
    /// Core token for `fixed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Eligible cores for `random_from_list`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Scalar>,
    /// Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Scalar>,
}

fn insert_scalar(map: &mut Map<String, JsonValue>, key: &str, value: &Option<Scalar>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.to_json());
    }
}

fn text_of(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(flag) => *flag,
        JsonValue::String(text) => matches!(text.trim(), "true" | "True" | "1" | "on"),
        JsonValue::Number(number) => number.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_rule_defaults_to_random_from_category() {
        let spec = RuleSpec::from_json(&json!({"count": 2})).unwrap();
        assert_eq!(
            spec.rule,
            Rule::RandomFromCategory {
                count: Some(Scalar::Int(2))
            }
        );
        assert!(!spec.apply_all);
    }

    #[test]
    fn range_accepts_text_and_numbers() {
        let spec = RuleSpec::from_json(&json!({
            "rule": "range", "min": "150", "max": 350, "step": " 10 ", "apply_all": true
        }))
        .unwrap();
        let Rule::Range { min, max, step } = &spec.rule else {
            panic!("expected range");
        };
        assert_eq!(min.as_ref().and_then(Scalar::as_int), Some(150));
        assert_eq!(max.as_ref().and_then(Scalar::as_int), Some(350));
        assert_eq!(step.as_ref().and_then(Scalar::as_int), Some(10));
        assert!(spec.apply_all);
    }

    #[test]
    fn allowed_values_that_are_not_a_list_are_dropped() {
        let spec = RuleSpec::from_json(&json!({
            "rule": "random_from_list", "allowed_values": "AWD"
        }))
        .unwrap();
        assert_eq!(
            spec.rule,
            Rule::RandomFromList {
                allowed_values: None,
                count: None
            }
        );
    }

    #[test]
    fn unknown_kind_is_kept_by_name() {
        let spec = RuleSpec::from_json(&json!({"rule": "filter_and_random"})).unwrap();
        assert_eq!(spec.rule.kind(), None);
        assert_eq!(spec.rule.name(), "filter_and_random");
    }

    #[test]
    fn non_mapping_entry_is_rejected() {
        assert!(RuleSpec::from_json(&json!("fixed")).is_err());
        assert!(RuleSpec::from_json(&json!(null)).is_err());
    }

    #[test]
    fn fixed_value_is_stringified() {
        let spec = RuleSpec::from_json(&json!({"rule": "fixed", "value": false})).unwrap();
        assert_eq!(
            spec.rule,
            Rule::Fixed {
                value: Some("false".to_string())
            }
        );
    }

    #[test]
    fn with_count_only_touches_random_kinds() {
        let random = RuleSpec::random_from_list(["A", "B"], 3).with_count(1);
        assert_eq!(
            random.to_json(),
            json!({"rule": "random_from_list", "apply_all": false, "count": 1, "allowed_values": ["A", "B"]})
        );
        let fixed = RuleSpec::fixed("V8");
        assert_eq!(fixed.with_count(4), fixed);
    }

    #[test]
    fn range_resolution_validates_parameters() {
        let range = IntRange::resolve(Some(&0.into()), Some(&10.into()), Some(&"5".into())).unwrap();
        assert_eq!(range.len(), 3);
        assert_eq!((0..3).map(|i| range.nth(i)).collect::<Vec<_>>(), vec![0, 5, 10]);

        let single = IntRange::resolve(Some(&10.into()), Some(&10.into()), Some(&3.into())).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.nth(0), 10);

        let off_step = IntRange::resolve(Some(&5.into()), Some(&10.into()), Some(&6.into())).unwrap();
        assert_eq!(off_step.len(), 1);

        let full = IntRange::resolve(Some(&i64::MIN.into()), Some(&i64::MAX.into()), None).unwrap();
        assert_eq!(full.len(), 1_u128 << 64);
        assert_eq!(full.nth(0), i64::MIN);
        assert_eq!(full.nth(full.len() - 1), i64::MAX);

        let wide_step = IntRange::resolve(Some(&i64::MIN.into()), Some(&i64::MAX.into()), Some(&i64::MAX.into())).unwrap();
        assert_eq!(wide_step.len(), 3);
        assert_eq!(wide_step.nth(2), i64::MAX - 1);

        let blank_step = IntRange::resolve(Some(&1.into()), Some(&3.into()), Some(&"".into())).unwrap();
        assert_eq!(blank_step.step, 1);

        assert_eq!(
            IntRange::resolve(Some(&1.into()), Some(&3.into()), Some(&0.into())),
            Err(RangeError::NonPositiveStep)
        );
        assert_eq!(
            IntRange::resolve(Some(&4.into()), Some(&3.into()), None),
            Err(RangeError::MinAboveMax)
        );
        assert_eq!(
            IntRange::resolve(Some(&"abc".into()), Some(&3.into()), None),
            Err(RangeError::NotInteger {
                field: "min",
                raw: "abc".to_string()
            })
        );
        assert_eq!(
            IntRange::resolve(None, Some(&3.into()), None),
            Err(RangeError::MissingBound)
        );
    }

    #[test]
    fn count_defaults_to_one_and_rejects_non_positive() {
        assert_eq!(resolve_count(None), Ok(1));
        assert_eq!(resolve_count(Some(&" 3".into())), Ok(3));
        assert!(resolve_count(Some(&0.into())).is_err());
        assert!(resolve_count(Some(&"two".into())).is_err());
    }

    #[test]
    fn to_json_round_trips_through_parser() {
        let spec = RuleSpec::range(0, 10, "5").with_apply_all(true);
        assert_eq!(RuleSpec::from_json(&spec.to_json()).unwrap(), spec);
    }
}
