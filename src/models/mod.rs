//! Shift scheduling domain models.
//!
//! Provides the data types flowing through the rule pipeline: the
//! scheduling context (employees, days, slots), declarative rules, their
//! compiled canonical form, and the solver's schedule.
//!
//! # Pipeline Mapping
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | Validation | raw JSON object | `Rule` |
//! | Conflict detection | `Rule`s | `ConflictReport` |
//! | Compilation | `Rule`s | `CompiledConstraint`s |
//! | Solving | `StoreContext` + `CompiledConstraint`s | `Schedule` |

mod constraint;
mod context;
mod employee;
mod rule;
mod schedule;

pub use constraint::{
    CellFilter, CompiledConstraint, ConstraintKind, LimitScope, LoweredConstraint, ParamError,
    Primitive,
};
pub use context::{Coverage, DayHours, SlotTime, StoreContext, StoreHours};
pub use employee::Employee;
pub use rule::{Rule, RuleType};
pub use schedule::{AssignmentRecord, Schedule, Score, SearchStats, SolveStatus, Violation};
