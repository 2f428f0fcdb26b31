//! Schedule (solution) model.
//!
//! A schedule is the set of decision variables the solver set to true,
//! materialized as (employee, day, time) records, together with how the
//! search ended and which soft constraints the result violates.

use serde::{Deserialize, Serialize};

use super::SlotTime;

/// One employee working one slot on one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Employee id.
    pub employee: String,
    /// Day name.
    pub day: String,
    /// Slot time.
    pub time: SlotTime,
}

impl AssignmentRecord {
    /// Creates a new record.
    pub fn new(employee: impl Into<String>, day: impl Into<String>, time: SlotTime) -> Self {
        Self {
            employee: employee.into(),
            day: day.into(),
            time,
        }
    }
}

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Search space exhausted; the schedule is the best there is.
    Optimal,
    /// Budget exhausted; the schedule is the best found so far.
    Feasible,
    /// Search space exhausted without a hard-feasible assignment.
    Infeasible,
    /// Budget exhausted before any hard-feasible assignment was found.
    Unknown,
}

impl SolveStatus {
    /// Whether the schedule carries assignments worth using.
    pub fn is_solution_found(&self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }

    /// Whether the search ran to completion.
    pub fn is_proven(&self) -> bool {
        matches!(self, Self::Optimal | Self::Infeasible)
    }
}

/// Objective value of a complete assignment, compared lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Score {
    /// Sum of weights of satisfied soft constraints.
    pub soft: i64,
    /// Number of assigned cells.
    pub coverage: u64,
}

/// A soft constraint the returned schedule does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Source rule id.
    pub rule_id: String,
    /// Rule priority.
    pub priority: i64,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Creates a violation record.
    pub fn new(rule_id: impl Into<String>, priority: i64, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            priority,
            message: message.into(),
        }
    }
}

/// Search effort statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Decision variables in the model.
    pub variables: u64,
    /// Variables fixed before search.
    pub fixed: u64,
    /// Search nodes expanded.
    pub nodes: u64,
    /// Wall-clock solve time (ms).
    pub elapsed_ms: u64,
}

/// Solver output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// True decision variables, ordered by employee id, then day, then slot.
    pub assignments: Vec<AssignmentRecord>,
    /// How the search ended.
    pub status: SolveStatus,
    /// Objective value of `assignments` (zero when no solution).
    pub score: Score,
    /// Soft constraints not satisfied by `assignments`.
    pub violations: Vec<Violation>,
    /// Search statistics.
    pub stats: SearchStats,
}

impl Schedule {
    /// A schedule with no assignments.
    pub fn empty(status: SolveStatus) -> Self {
        Self {
            assignments: Vec::new(),
            status,
            score: Score::default(),
            violations: Vec::new(),
            stats: SearchStats::default(),
        }
    }

    /// Whether the solve produced a usable schedule.
    pub fn is_solution_found(&self) -> bool {
        self.status.is_solution_found()
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Assignment records (the schedule artifact).
    pub fn records(&self) -> &[AssignmentRecord] {
        &self.assignments
    }

    /// Cells assigned to an employee.
    pub fn slots_for_employee(&self, employee_id: &str) -> Vec<&AssignmentRecord> {
        self.assignments
            .iter()
            .filter(|a| a.employee == employee_id)
            .collect()
    }

    /// Number of cells assigned to an employee.
    pub fn count_for_employee(&self, employee_id: &str) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.employee == employee_id)
            .count()
    }

    /// Employees working a given cell.
    pub fn employees_at(&self, day: &str, time: SlotTime) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|a| a.day == day && a.time == time)
            .map(|a| a.employee.as_str())
            .collect()
    }

    /// Whether an employee works a given cell.
    pub fn is_assigned(&self, employee_id: &str, day: &str, time: SlotTime) -> bool {
        self.assignments
            .iter()
            .any(|a| a.employee == employee_id && a.day == day && a.time == time)
    }
}
