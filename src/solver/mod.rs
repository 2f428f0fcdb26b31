//! Assignment solver.
//!
//! Decides one boolean per (employee, day, slot) cell under the compiled
//! constraints and the context's coverage requirement.
//!
//! # Objective
//!
//! Hard constraints must hold. Among hard-feasible assignments the solver
//! maximizes, lexicographically:
//! 1. the sum of `1 + max(priority, 0)` over satisfied soft constraints;
//! 2. the number of assigned cells (coverage).
//!
//! Ties go to the assignment found first in the deterministic search
//! order, which tries "assigned" before "not assigned".
//!
//! # Outcomes
//!
//! Infeasibility is not an error: it is a [`Schedule`] with status
//! `Infeasible` (or `Unknown` if the budget ran out first) and no
//! assignments. Errors are reserved for malformed input.
//!
//! # Reference
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming",
//! Ch. 4 (Backtracking Search Algorithms)

mod config;
mod model;
mod search;

pub use config::SolverConfig;

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{
    AssignmentRecord, CompiledConstraint, ParamError, Schedule, Score, SearchStats, SolveStatus,
    StoreContext, Violation,
};

use model::{Owner, SearchModel};

/// Malformed solver input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("constraint from rule '{rule_id}' is malformed: {source}")]
    MalformedConstraint {
        rule_id: String,
        #[source]
        source: ParamError,
    },
    #[error("node limit must be positive")]
    ZeroNodeLimit,
}

/// Backtracking assignment solver.
///
/// # Example
///
/// ```
/// use shift_schedule::models::{Employee, StoreContext, SolveStatus};
/// use shift_schedule::solver::AssignmentSolver;
///
/// let ctx = StoreContext::new(
///     vec![Employee::new("e1", "Ana").with_role("cashier")],
///     vec!["Mon".into()],
///     vec!["09:00".parse().unwrap(), "17:00".parse().unwrap()],
/// )
/// .unwrap();
///
/// let schedule = AssignmentSolver::new().solve(&ctx, &[]).unwrap();
/// assert_eq!(schedule.status, SolveStatus::Optimal);
/// assert_eq!(schedule.assignment_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssignmentSolver {
    config: SolverConfig,
}

impl AssignmentSolver {
    /// Creates a solver with the default budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a solver with the given configuration.
    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves for an assignment.
    ///
    /// Blocks until the search space is exhausted or the budget runs out.
    pub fn solve(
        &self,
        context: &StoreContext,
        constraints: &[CompiledConstraint],
    ) -> Result<Schedule, SolveError> {
        if self.config.node_limit == 0 {
            return Err(SolveError::ZeroNodeLimit);
        }
        let started = Instant::now();
        let model = SearchModel::build(context, constraints)?;

        let variables = model.space.len() as u64;
        let fixed = model.fixed_count() as u64;
        info!(
            variables,
            fixed,
            groups = model.groups.len(),
            soft = model.soft.len(),
            parallel = self.config.runs_parallel(),
            "solve started"
        );

        let outcome = search::run(&model, &self.config, started);

        let status = match (&outcome.best, outcome.exhausted) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::Unknown,
        };
        if outcome.exhausted {
            warn!(nodes = outcome.nodes, ?status, "search budget exhausted");
        }

        let stats = SearchStats {
            variables,
            fixed,
            nodes: outcome.nodes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        let mut schedule = Schedule::empty(status);
        schedule.stats = stats;
        if let Some(best) = outcome.best {
            schedule.assignments = records(&model, context, &best.values);
            schedule.violations = soft_violations(&model, &best.values);
            schedule.score = best.score;
        }

        info!(
            ?status,
            assignments = schedule.assignment_count(),
            soft_score = schedule.score.soft,
            nodes = stats.nodes,
            elapsed_ms = stats.elapsed_ms,
            "solve finished"
        );
        Ok(schedule)
    }
}

/// Materializes true variables as records, in variable order.
fn records(model: &SearchModel, context: &StoreContext, values: &[bool]) -> Vec<AssignmentRecord> {
    values
        .iter()
        .enumerate()
        .filter(|&(_, &on)| on)
        .map(|(v, _)| {
            let (e, d, s) = model.space.triple(v);
            AssignmentRecord::new(
                &context.employees()[e].id,
                &context.days()[d],
                context.slots()[s],
            )
        })
        .collect()
}

/// Per soft constraint: whether any of its groups is out of bounds.
fn violated_soft(model: &SearchModel, values: &[bool]) -> Vec<bool> {
    let mut violated = vec![false; model.soft.len()];
    for group in &model.groups {
        if let Owner::Soft(i) = group.owner {
            let count = group.vars.iter().filter(|&&v| values[v]).count() as u32;
            if group.is_broken(count, 0) {
                violated[i] = true;
            }
        }
    }
    violated
}

fn soft_violations(model: &SearchModel, values: &[bool]) -> Vec<Violation> {
    model
        .soft
        .iter()
        .zip(violated_soft(model, values))
        .filter(|&(_, v)| v)
        .map(|(s, _)| {
            debug!(rule_id = %s.rule_id, "soft constraint violated");
            Violation::new(
                &s.rule_id,
                s.priority,
                format!("soft {:?} constraint from rule '{}' not satisfied", s.kind, s.rule_id),
            )
        })
        .collect()
}

/// Scores a schedule from scratch against the same constraints.
///
/// Returns `None` when the schedule breaks a hard constraint (including
/// the context coverage requirement) or names cells outside the context.
pub fn evaluate(
    context: &StoreContext,
    constraints: &[CompiledConstraint],
    schedule: &Schedule,
) -> Result<Option<Score>, SolveError> {
    let model = SearchModel::build(context, constraints)?;
    let mut values = vec![false; model.space.len()];
    for (v, slot) in values.iter_mut().enumerate() {
        let (e, d, s) = model.space.triple(v);
        *slot = schedule.is_assigned(
            &context.employees()[e].id,
            &context.days()[d],
            context.slots()[s],
        );
    }

    let coverage = values.iter().filter(|&&on| on).count() as u64;
    if coverage != schedule.assignment_count() as u64 {
        return Ok(None);
    }
    if values.iter().zip(&model.fixed).any(|(&on, &fixed)| on && fixed) {
        return Ok(None);
    }
    let hard_broken = model.groups.iter().any(|g| {
        g.owner == Owner::Hard
            && g.is_broken(g.vars.iter().filter(|&&v| values[v]).count() as u32, 0)
    });
    if hard_broken {
        return Ok(None);
    }

    let soft: i64 = model
        .soft
        .iter()
        .zip(violated_soft(&model, &values))
        .filter(|&(_, v)| !v)
        .map(|(s, _)| s.weight)
        .sum();
    Ok(Some(Score { soft, coverage }))
}
