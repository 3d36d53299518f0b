use challenger_core::{Category, CategoryLookup, Configuration, RuleSpec, TemplateLookup};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::errors::GenerationIssue;
use crate::evaluator::{Evaluation, RuleEvaluator};
use crate::model::{GenerationOutcome, IssueLog, PlayerResult, ValueRecord};

/// Where a generator takes its configuration from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// No configuration; only rerolls are meaningful.
    None,
    /// Raw template id as entered by the caller.
    Template(String),
    /// Caller-supplied mapping, not yet checked.
    Custom(JsonValue),
}

impl ConfigSource {
    /// Pick the source the way the challenge form does: a template id wins
    /// unless it is blank or the literal `custom`.
    pub fn from_request(template_id: Option<&str>, custom_config: Option<JsonValue>) -> Self {
        match template_id.map(str::trim) {
            Some(id) if !id.is_empty() && id != "custom" => ConfigSource::Template(id.to_string()),
            _ => match custom_config {
                Some(config) => ConfigSource::Custom(config),
                None => ConfigSource::None,
            },
        }
    }
}

/// Orchestrates rule evaluation over a configuration and N players.
///
/// One instance serves one caller; issues are reset at the start of every
/// `generate` and reroll call and returned with that call's result.
pub struct ChallengeGenerator<'a> {
    categories: &'a dyn CategoryLookup,
    config: Configuration,
    setup_issues: IssueLog,
    issues: IssueLog,
    rng: Box<dyn RngCore>,
}

impl<'a> ChallengeGenerator<'a> {
    /// Resolve `source` against `templates`. Never fails: problems are kept
    /// as issues and reported by the next `generate`.
    pub fn new(
        categories: &'a dyn CategoryLookup,
        templates: &dyn TemplateLookup,
        source: ConfigSource,
    ) -> Self {
        let mut setup_issues = IssueLog::new();
        let config = resolve_source(templates, source, &mut setup_issues);
        Self {
            categories,
            issues: setup_issues.clone(),
            setup_issues,
            config,
            rng: default_rng(),
        }
    }

    pub fn from_configuration(categories: &'a dyn CategoryLookup, config: Configuration) -> Self {
        Self {
            categories,
            config,
            setup_issues: IssueLog::new(),
            issues: IssueLog::new(),
            rng: default_rng(),
        }
    }

    /// Generator without a configuration, for rerolls.
    pub fn for_reroll(categories: &'a dyn CategoryLookup) -> Self {
        Self::from_configuration(categories, Configuration::new())
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn with_rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Issues of the most recent operation (or of construction).
    pub fn issues(&self) -> &[GenerationIssue] {
        self.issues.issues()
    }

    pub fn errors(&self) -> Vec<String> {
        self.issues.render()
    }

    pub fn generate(&mut self, num_players: usize) -> GenerationOutcome {
        let effective_config = self.config.clone();
        self.issues = self.setup_issues.clone();

        if effective_config.is_empty() && self.issues.is_empty() {
            self.issues.record(GenerationIssue::EmptyConfiguration);
        }
        if self.issues.halts_generation() {
            warn!(issues = self.issues.len(), "generation skipped: configuration unusable");
            return self.outcome(None, effective_config);
        }

        let players = if num_players == 0 {
            self.issues.record(GenerationIssue::InvalidPlayerCount {
                requested: num_players,
            });
            1
        } else {
            num_players
        };

        info!(
            players,
            categories = effective_config.len(),
            "generation started"
        );

        let mut results = vec![PlayerResult::new(); players];
        for (name, entry) in effective_config.iter() {
            self.fill_category(name, entry, &mut results);
        }

        let populated = results.iter().any(|player| !player.is_empty());
        if !populated && !self.issues.has_errors() {
            self.issues.record(GenerationIssue::NothingGenerated);
        }

        info!(
            players,
            populated,
            errors = self.issues.error_count(),
            issues = self.issues.len(),
            "generation finished"
        );
        self.outcome(populated.then_some(results), effective_config)
    }

    /// Draw one category outside the stored configuration. `num_values`
    /// overrides the rule's count for the random kinds.
    pub fn reroll_category(
        &mut self,
        category: &Category,
        spec: &RuleSpec,
        num_values: Option<usize>,
    ) -> Evaluation {
        self.issues.clear();
        self.reroll(category, spec, num_values)
    }

    /// Reroll by category name with a raw rule entry.
    pub fn reroll_named(
        &mut self,
        name: &str,
        rule: &JsonValue,
        num_values: Option<usize>,
    ) -> Evaluation {
        self.issues.clear();
        let categories = self.categories;
        let Some(category) = categories.find_category_by_name(name) else {
            return self.reroll_failed(GenerationIssue::CategoryNotFound {
                category: name.to_string(),
            });
        };
        match RuleSpec::from_json(rule) {
            Ok(spec) => self.reroll(category, &spec, num_values),
            Err(_) => self.reroll_failed(GenerationIssue::MalformedRule {
                category: name.to_string(),
            }),
        }
    }

    fn reroll(
        &mut self,
        category: &Category,
        spec: &RuleSpec,
        num_values: Option<usize>,
    ) -> Evaluation {
        let spec = match num_values {
            Some(count) => spec.with_count(i64::try_from(count).unwrap_or(i64::MAX)),
            None => spec.clone(),
        };
        debug!(category = %category.name, rule = %spec.rule.name(), num_values, "reroll");
        let evaluation = RuleEvaluator::evaluate(category, &spec, &mut *self.rng);
        self.issues.extend(evaluation.issues.iter().cloned());
        evaluation
    }

    fn reroll_failed(&mut self, issue: GenerationIssue) -> Evaluation {
        self.issues.record(issue.clone());
        Evaluation {
            values: None,
            issues: vec![issue],
        }
    }

    fn fill_category(&mut self, name: &str, entry: &JsonValue, results: &mut [PlayerResult]) {
        let Ok(spec) = RuleSpec::from_json(entry) else {
            self.issues.record(GenerationIssue::MalformedRule {
                category: name.to_string(),
            });
            return;
        };
        let categories = self.categories;
        let Some(category) = categories.find_category_by_name(name) else {
            self.issues.record(GenerationIssue::CategoryNotFound {
                category: name.to_string(),
            });
            return;
        };

        if spec.apply_all {
            // One shared draw; a failure leaves the category out for everyone.
            if let Some(values) = self.evaluate(category, &spec) {
                for player in results.iter_mut() {
                    player.insert(name, values.clone());
                }
            }
        } else {
            for player in results.iter_mut() {
                if let Some(values) = self.evaluate(category, &spec) {
                    player.insert(name, values);
                }
            }
        }
    }

    fn evaluate(&mut self, category: &Category, spec: &RuleSpec) -> Option<Vec<ValueRecord>> {
        let evaluation = RuleEvaluator::evaluate(category, spec, &mut *self.rng);
        self.issues.extend(evaluation.issues);
        evaluation.values
    }

    fn outcome(
        &self,
        players: Option<Vec<PlayerResult>>,
        effective_config: Configuration,
    ) -> GenerationOutcome {
        GenerationOutcome {
            players,
            effective_config,
            issues: self.issues.issues().to_vec(),
        }
    }
}

fn default_rng() -> Box<dyn RngCore> {
    Box::new(ChaCha8Rng::from_rng(&mut rand::rng()))
}

fn resolve_source(
    templates: &dyn TemplateLookup,
    source: ConfigSource,
    issues: &mut IssueLog,
) -> Configuration {
    match source {
        ConfigSource::None => Configuration::new(),
        ConfigSource::Template(raw) => {
            let Ok(id) = raw.trim().parse::<u64>() else {
                issues.record(GenerationIssue::InvalidTemplateId { id: raw });
                return Configuration::new();
            };
            let Some(template) = templates.find_template_by_id(id) else {
                issues.record(GenerationIssue::TemplateNotFound { id: id.to_string() });
                return Configuration::new();
            };
            match template.config() {
                Ok(config) => {
                    debug!(template = id, name = %template.name, categories = config.len(), "template loaded");
                    config
                }
                Err(err) => {
                    issues.record(GenerationIssue::InvalidTemplateConfig {
                        id,
                        reason: err.to_string(),
                    });
                    Configuration::new()
                }
            }
        }
        ConfigSource::Custom(value) => match Configuration::from_value(value) {
            Ok(config) => config,
            Err(err) => {
                issues.record(GenerationIssue::CustomConfigNotMapping {
                    reason: err.to_string(),
                });
                Configuration::new()
            }
        },
    }
}

pub(crate) fn log_issue(issue: &GenerationIssue) {
    warn!(
        code = issue.code(),
        level = ?issue.severity(),
        category = issue.category().unwrap_or(""),
        message = %issue
    );
}
