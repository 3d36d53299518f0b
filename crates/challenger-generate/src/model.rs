use std::collections::{BTreeMap, HashSet};

use challenger_core::{Configuration, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{GenerationIssue, Severity};

/// One selected value as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub value: String,
    pub description: Option<String>,
}

impl ValueRecord {
    pub fn new(value: impl Into<String>, description: Option<String>) -> Self {
        Self {
            value: value.into(),
            description,
        }
    }
}

impl From<&Value> for ValueRecord {
    fn from(value: &Value) -> Self {
        Self {
            value: value.core.clone(),
            description: value.description.clone(),
        }
    }
}

/// One player's realized category → selected values mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerResult {
    categories: IndexMap<String, Vec<ValueRecord>>,
}

impl PlayerResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: &str) -> Option<&[ValueRecord]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn insert(&mut self, category: impl Into<String>, values: Vec<ValueRecord>) {
        self.categories.insert(category.into(), values);
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ValueRecord])> {
        self.categories
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

/// Insertion-ordered issue accumulator, deduplicated by issue identity.
#[derive(Debug, Clone, Default)]
pub struct IssueLog {
    issues: Vec<GenerationIssue>,
    seen: HashSet<GenerationIssue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue; returns false when it was already present.
    pub fn record(&mut self, issue: GenerationIssue) -> bool {
        if self.seen.contains(&issue) {
            return false;
        }
        crate::generator::log_issue(&issue);
        self.seen.insert(issue.clone());
        self.issues.push(issue);
        true
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = GenerationIssue>) {
        for issue in issues {
            self.record(issue);
        }
    }

    pub fn clear(&mut self) {
        self.issues.clear();
        self.seen.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn issues(&self) -> &[GenerationIssue] {
        &self.issues
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(GenerationIssue::is_error)
    }

    /// Number of error-severity issues; used to detect failures added by a step.
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.is_error()).count()
    }

    pub fn halts_generation(&self) -> bool {
        self.issues.iter().any(GenerationIssue::halts_generation)
    }

    /// Render every issue to its message text.
    pub fn render(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Result of one `generate` call.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// `None` when no player received any category.
    pub players: Option<Vec<PlayerResult>>,
    /// Configuration the run attempted, returned even on failure.
    pub effective_config: Configuration,
    pub issues: Vec<GenerationIssue>,
}

impl GenerationOutcome {
    pub fn errors(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    pub fn is_success(&self) -> bool {
        self.players.is_some()
    }
}

/// Structured issue entry for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<&GenerationIssue> for ReportIssue {
    fn from(issue: &GenerationIssue) -> Self {
        Self {
            level: match issue.severity() {
                Severity::Error => "error".to_string(),
                Severity::Warning => "warning".to_string(),
            },
            code: issue.code().to_string(),
            message: issue.to_string(),
            category: issue.category().map(str::to_string),
        }
    }
}

/// Summary of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub generated_at: String,
    pub players_requested: usize,
    pub players_with_results: usize,
    pub categories_configured: usize,
    pub categories_populated: usize,
    pub duration_ms: u64,
    pub issues_by_code: BTreeMap<String, u64>,
    pub errors: Vec<ReportIssue>,
    pub warnings: Vec<ReportIssue>,
}

impl GenerationReport {
    pub fn from_outcome(outcome: &GenerationOutcome, players_requested: usize, duration_ms: u64) -> Self {
        let players = outcome.players.as_deref().unwrap_or_default();
        let populated: HashSet<&str> = players
            .iter()
            .flat_map(|player| player.iter().map(|(name, _)| name))
            .collect();

        let mut issues_by_code = BTreeMap::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for issue in &outcome.issues {
            *issues_by_code.entry(issue.code().to_string()).or_insert(0) += 1;
            match issue.severity() {
                Severity::Error => errors.push(ReportIssue::from(issue)),
                Severity::Warning => warnings.push(ReportIssue::from(issue)),
            }
        }

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            players_requested,
            players_with_results: players.iter().filter(|player| !player.is_empty()).count(),
            categories_configured: outcome.effective_config.len(),
            categories_populated: populated.len(),
            duration_ms,
            issues_by_code,
            errors,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_log_deduplicates_structurally() {
        let mut log = IssueLog::new();
        assert!(log.record(GenerationIssue::CategoryNotFound {
            category: "Ghost".to_string()
        }));
        assert!(!log.record(GenerationIssue::CategoryNotFound {
            category: "Ghost".to_string()
        }));
        assert!(log.record(GenerationIssue::EmptyPool {
            category: "Ghost".to_string()
        }));
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.render(),
            vec![
                "category 'Ghost' not found".to_string(),
                "category 'Ghost': no values available".to_string()
            ]
        );
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut log = IssueLog::new();
        log.record(GenerationIssue::CapacityReduced {
            category: "Drive".to_string(),
            from: crate::errors::CandidateSource::Category,
            requested: 5,
            available: 3,
        });
        assert!(!log.has_errors());
        assert_eq!(log.error_count(), 0);
        assert_eq!(
            log.render()[0],
            "category 'Drive': requested 5 in the category, only 3 available; selected 3"
        );
    }

    #[test]
    fn player_result_serializes_as_mapping() {
        let mut player = PlayerResult::new();
        player.insert("Engine Type", vec![ValueRecord::new("V8", None)]);
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Engine Type": [{"value": "V8", "description": null}]})
        );
    }
}
