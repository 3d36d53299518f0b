//! Challenge generation engine for Challenger.
//!
//! This crate turns a category → rule configuration into per-player results,
//! drawing values from the catalog exposed through `challenger_core` lookup
//! traits. Problems are collected as structured issues and returned with
//! every call instead of aborting the run.

pub mod errors;
pub mod evaluator;
pub mod generator;
pub mod model;

pub use errors::{CandidateSource, GenerationIssue, Severity};
pub use evaluator::{Evaluation, RuleEvaluator};
pub use generator::{ChallengeGenerator, ConfigSource};
pub use model::{
    GenerationOutcome, GenerationReport, IssueLog, PlayerResult, ReportIssue, ValueRecord,
};
