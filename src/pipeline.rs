//! End-to-end rule pipeline.
//!
//! ```text
//! raw rules → validate → detect conflicts → compile → solve → schedule
//! ```
//!
//! Each stage fully consumes its input before the next starts. Schema
//! errors drop the offending rule; conflicts and infeasibility come back
//! as data in the [`PipelineReport`]. What happens to shadowed rules is
//! decided by [`ConflictPolicy`].
//!
//! Rules authored in natural language come through a [`RuleTranslator`]
//! supplied by the caller. [`RuleIntake`] validates every candidate it
//! returns; a successful translation never bypasses the validator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::compiler::{CompileError, ConstraintCompiler};
use crate::conflict::{ConflictReport, ConflictResolver};
use crate::models::{CompiledConstraint, Rule, Schedule, StoreContext};
use crate::solver::{AssignmentSolver, SolveError, SolverConfig};
use crate::validation::{RuleValidator, SchemaError};

/// What to do when rules conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Stop before compilation; no schedule is produced.
    Abort,
    /// Drop shadowed rules and continue with canonical ones.
    #[default]
    KeepCanonical,
    /// Ignore the report and compile every valid rule.
    KeepAll,
}

/// Pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub conflict_policy: ConflictPolicy,
    pub solver: SolverConfig,
}

impl PipelineConfig {
    /// Sets the conflict policy.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Sets the solver configuration.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }
}

/// A raw rule the validator refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRule {
    /// Position in the input.
    pub index: usize,
    /// The `id` field, if it was a string.
    pub rule_id: Option<String>,
    pub error: SchemaError,
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub rejected: Vec<RejectedRule>,
    pub conflicts: ConflictReport,
    /// Active rules skipped because their type is unknown.
    pub unknown_rules: Vec<String>,
    pub constraints: Vec<CompiledConstraint>,
    /// `None` when the run was aborted on conflicts.
    pub schedule: Option<Schedule>,
}

/// Compilation or solver failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Validator → conflict resolver → compiler → solver.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pipeline with the given configuration.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Validates raw rules, keeping input order.
    pub fn validate(&self, raw_rules: &[Value]) -> (Vec<Rule>, Vec<RejectedRule>) {
        let validator = RuleValidator::new();
        let mut rules = Vec::new();
        let mut rejected = Vec::new();
        for (index, raw) in raw_rules.iter().enumerate() {
            match validator.validate(raw) {
                Ok(rule) => rules.push(rule),
                Err(error) => {
                    let rule_id = raw.get("id").and_then(Value::as_str).map(str::to_string);
                    warn!(index, rule_id = ?rule_id, %error, "rule rejected");
                    rejected.push(RejectedRule {
                        index,
                        rule_id,
                        error,
                    });
                }
            }
        }
        (rules, rejected)
    }

    /// Runs every stage.
    pub fn run(
        &self,
        raw_rules: &[Value],
        context: &StoreContext,
    ) -> Result<PipelineReport, PipelineError> {
        let (rules, rejected) = self.validate(raw_rules);
        let conflicts = ConflictResolver::new().resolve(&rules);

        let mut report = PipelineReport {
            rejected,
            conflicts,
            unknown_rules: Vec::new(),
            constraints: Vec::new(),
            schedule: None,
        };

        let rules: Vec<Rule> = match self.config.conflict_policy {
            ConflictPolicy::Abort if report.conflicts.blocked => {
                warn!(
                    conflicts = report.conflicts.conflicts.len(),
                    "aborting on rule conflicts"
                );
                return Ok(report);
            }
            ConflictPolicy::KeepCanonical => {
                let shadowed = report.conflicts.shadowed_positions();
                rules
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| !shadowed.contains(i))
                    .map(|(_, r)| r)
                    .collect()
            }
            ConflictPolicy::Abort | ConflictPolicy::KeepAll => rules,
        };

        let compilation = ConstraintCompiler::new().compile_with_report(&rules, context)?;
        report.unknown_rules = compilation.skipped;
        report.constraints = compilation.constraints;

        let solver = AssignmentSolver::with_config(self.config.solver.clone());
        let schedule = solver.solve(context, &report.constraints)?;
        info!(
            rules = rules.len(),
            rejected = report.rejected.len(),
            conflicts = report.conflicts.conflicts.len(),
            status = ?schedule.status,
            "pipeline finished"
        );
        report.schedule = Some(schedule);
        Ok(report)
    }
}

/// Failure reported by a rule translator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("cannot parse rule text")]
    CannotParse,
    #[error("translator returned an error: {0}")]
    Backend(String),
}

/// Turns free text into a candidate rule object.
///
/// Implementations wrap whatever text-understanding service the caller
/// uses. The returned object is untrusted and goes through validation.
pub trait RuleTranslator {
    fn translate(&self, text: &str) -> Result<Value, TranslateError>;
}

impl<F> RuleTranslator for F
where
    F: Fn(&str) -> Result<Value, TranslateError>,
{
    fn translate(&self, text: &str) -> Result<Value, TranslateError> {
        self(text)
    }
}

/// Why a piece of rule text did not become a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("translated rule is invalid: {0}")]
    Schema(#[from] SchemaError),
}

/// Translates rule text and validates the result.
#[derive(Debug, Clone)]
pub struct RuleIntake<T> {
    translator: T,
    validator: RuleValidator,
}

impl<T: RuleTranslator> RuleIntake<T> {
    /// Wraps a translator.
    pub fn new(translator: T) -> Self {
        Self {
            translator,
            validator: RuleValidator::new(),
        }
    }

    /// Translates and validates one piece of text.
    ///
    /// An object carrying an `"error"` key is treated as a parse failure.
    pub fn intake(&self, text: &str) -> Result<Rule, IntakeError> {
        let candidate = self.translator.translate(text)?;
        if let Some(reason) = candidate.get("error") {
            return Err(TranslateError::Backend(
                reason.as_str().map_or_else(|| reason.to_string(), str::to_string),
            )
            .into());
        }
        Ok(self.validator.validate(&candidate)?)
    }

    /// Processes several texts, splitting accepted rules from failures.
    pub fn intake_all<'a>(
        &self,
        texts: impl IntoIterator<Item = &'a str>,
    ) -> (Vec<Rule>, Vec<(String, IntakeError)>) {
        let mut accepted = Vec::new();
        let mut failed = Vec::new();
        for text in texts {
            match self.intake(text) {
                Ok(rule) => accepted.push(rule),
                Err(e) => {
                    warn!(text, error = %e, "rule text not accepted");
                    failed.push((text.to_string(), e));
                }
            }
        }
        (accepted, failed)
    }
}
