//! Rule → constraint compilation.
//!
//! This is the one place where business-rule vocabulary becomes solver
//! vocabulary. Each known rule type has exactly one branch:
//!
//! | Rule type | Constraint kind |
//! |-----------|-----------------|
//! | `TIME_WINDOW` | `TIME_BOUND` |
//! | `LIMIT` | `SUM_LIMIT` |
//! | `COVERAGE` | `SLOT_COVERAGE` |
//! | `AVAILABILITY` | `EXCLUSION` |
//!
//! Inactive rules are skipped. Unrecognized types are skipped with a
//! warning; type checking belongs to the validator. Every emitted
//! constraint is lowered once so that malformed parameters fail here,
//! not inside the search.

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{CompiledConstraint, ConstraintKind, ParamError, Rule, RuleType, StoreContext};

/// A rule whose parameters do not fit its constraint kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rule '{rule_id}': {source}")]
pub struct CompileError {
    pub rule_id: String,
    #[source]
    pub source: ParamError,
}

/// Output of a compilation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compilation {
    /// Compiled constraints in rule order.
    pub constraints: Vec<CompiledConstraint>,
    /// Ids of active rules with an unrecognized type.
    pub skipped: Vec<String>,
}

/// Lowers active rules into canonical constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintCompiler;

impl ConstraintCompiler {
    /// Creates a compiler.
    pub fn new() -> Self {
        Self
    }

    /// Compiles rules, returning constraints in rule order.
    ///
    /// The context is accepted for parity with the solver call; the
    /// current rule types compile independently of it.
    pub fn compile(
        &self,
        rules: &[Rule],
        context: &StoreContext,
    ) -> Result<Vec<CompiledConstraint>, CompileError> {
        self.compile_with_report(rules, context)
            .map(|c| c.constraints)
    }

    /// Compiles rules and also reports skipped unknown types.
    pub fn compile_with_report(
        &self,
        rules: &[Rule],
        _context: &StoreContext,
    ) -> Result<Compilation, CompileError> {
        let mut out = Compilation::default();

        for rule in rules.iter().filter(|r| r.active) {
            match compile_rule(rule)? {
                Some(c) => out.constraints.push(c),
                None => {
                    warn!(rule_id = %rule.id, rule_type = %rule.rule_type, "skipping rule with unknown type");
                    out.skipped.push(rule.id.clone());
                }
            }
        }

        debug!(
            rules = rules.len(),
            compiled = out.constraints.len(),
            skipped = out.skipped.len(),
            "compiled rules"
        );
        Ok(out)
    }
}

/// Compiles one rule; `None` for unknown types.
pub fn compile_rule(rule: &Rule) -> Result<Option<CompiledConstraint>, CompileError> {
    let kind = match &rule.rule_type {
        RuleType::TimeWindow => ConstraintKind::TimeBound,
        RuleType::Limit => ConstraintKind::SumLimit,
        RuleType::Coverage => ConstraintKind::SlotCoverage,
        RuleType::Availability => ConstraintKind::Exclusion,
        RuleType::Other(_) => return Ok(None),
    };

    let compiled = CompiledConstraint {
        rule_id: rule.id.clone(),
        kind,
        scope: rule.scope.clone(),
        filter: rule.conditions.clone(),
        params: rule.constraint.clone(),
        hard: rule.hard,
        priority: rule.priority,
    };
    compiled.lower().map_err(|source| CompileError {
        rule_id: rule.id.clone(),
        source,
    })?;
    Ok(Some(compiled))
}
