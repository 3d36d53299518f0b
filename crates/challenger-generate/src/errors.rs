use std::fmt;

use challenger_core::{CountError, RangeError, RuleKind};
use serde::Serialize;
use thiserror::Error;

/// Severity of a recorded issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Which candidate set a capacity warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    Category,
    AllowedList,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Category => f.write_str("in the category"),
            CandidateSource::AllowedList => f.write_str("from the allowed list"),
        }
    }
}

/// Problem recorded while building a generator, generating, or rerolling.
///
/// Issues never cross the engine boundary as panics or `Err`; they are
/// collected per operation and rendered to text only for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum GenerationIssue {
    #[error("template with id {id} not found")]
    TemplateNotFound { id: String },
    #[error("invalid template id '{id}'")]
    InvalidTemplateId { id: String },
    #[error("configuration of template {id} has an invalid format: {reason}")]
    InvalidTemplateConfig { id: u64, reason: String },
    #[error("custom configuration has an invalid format: {reason}")]
    CustomConfigNotMapping { reason: String },
    #[error("configuration is empty")]
    EmptyConfiguration,
    #[error("invalid number of players ({requested}), using 1")]
    InvalidPlayerCount { requested: usize },
    #[error("invalid rules for category '{category}'")]
    MalformedRule { category: String },
    #[error("category '{category}' not found")]
    CategoryNotFound { category: String },
    #[error("category '{category}': rule '{rule}' requires '{field}'")]
    MissingField {
        category: String,
        rule: RuleKind,
        field: &'static str,
    },
    #[error("category '{category}': {source}")]
    InvalidCount {
        category: String,
        #[source]
        source: CountError,
    },
    #[error("category '{category}': no values available")]
    EmptyPool { category: String },
    #[error("category '{category}': no values match the allowed list [{}]", allowed.join(", "))]
    NoMatchingValues {
        category: String,
        allowed: Vec<String>,
    },
    #[error("category '{category}': invalid range parameters (min={min}, max={max}, step={step}): {source}")]
    InvalidRange {
        category: String,
        min: String,
        max: String,
        step: String,
        #[source]
        source: RangeError,
    },
    #[error("category '{category}': unknown rule '{rule}'")]
    UnknownRule { category: String, rule: String },
    #[error("category '{category}': requested {requested} {from}, only {available} available; selected {available}")]
    CapacityReduced {
        category: String,
        from: CandidateSource,
        requested: usize,
        available: usize,
    },
    #[error("no values could be generated from the given rules")]
    NothingGenerated,
}

impl GenerationIssue {
    pub fn severity(&self) -> Severity {
        match self {
            GenerationIssue::CapacityReduced { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Stable identifier for counting and filtering.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationIssue::TemplateNotFound { .. } => "template_not_found",
            GenerationIssue::InvalidTemplateId { .. } => "invalid_template_id",
            GenerationIssue::InvalidTemplateConfig { .. } => "invalid_template_config",
            GenerationIssue::CustomConfigNotMapping { .. } => "custom_config_not_mapping",
            GenerationIssue::EmptyConfiguration => "empty_configuration",
            GenerationIssue::InvalidPlayerCount { .. } => "invalid_player_count",
            GenerationIssue::MalformedRule { .. } => "malformed_rule",
            GenerationIssue::CategoryNotFound { .. } => "category_not_found",
            GenerationIssue::MissingField { .. } => "missing_field",
            GenerationIssue::InvalidCount { .. } => "invalid_count",
            GenerationIssue::EmptyPool { .. } => "empty_pool",
            GenerationIssue::NoMatchingValues { .. } => "no_matching_values",
            GenerationIssue::InvalidRange { .. } => "invalid_range",
            GenerationIssue::UnknownRule { .. } => "unknown_rule",
            GenerationIssue::CapacityReduced { .. } => "capacity_reduced",
            GenerationIssue::NothingGenerated => "nothing_generated",
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            GenerationIssue::MalformedRule { category }
            | GenerationIssue::CategoryNotFound { category }
            | GenerationIssue::MissingField { category, .. }
            | GenerationIssue::InvalidCount { category, .. }
            | GenerationIssue::EmptyPool { category }
            | GenerationIssue::NoMatchingValues { category, .. }
            | GenerationIssue::InvalidRange { category, .. }
            | GenerationIssue::UnknownRule { category, .. }
            | GenerationIssue::CapacityReduced { category, .. } => Some(category.as_str()),
            _ => None,
        }
    }

    /// Configuration-level failures after which `generate` does not run.
    pub fn halts_generation(&self) -> bool {
        matches!(
            self,
            GenerationIssue::TemplateNotFound { .. }
                | GenerationIssue::InvalidTemplateId { .. }
                | GenerationIssue::InvalidTemplateConfig { .. }
                | GenerationIssue::CustomConfigNotMapping { .. }
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}
