//! Rule-driven shift scheduling.
//!
//! Turns declarative staffing rules into an employee-to-slot assignment
//! over a store's days and opening-hour slots.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Employee`, `StoreContext`, `Rule`,
//!   `CompiledConstraint`, `Schedule`
//! - **`validation`**: Rule schema checks and context input checks
//! - **`conflict`**: Duplicate-rule detection on (type, conditions)
//! - **`compiler`**: Rule → canonical constraint lowering
//! - **`solver`**: Exact backtracking search with branch-and-bound
//! - **`pipeline`**: Validate → resolve → compile → solve, plus
//!   translated-rule intake
//! - **`artifacts`**: JSON load/save for rules, employees, store hours,
//!   constraints and schedules
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use shift_schedule::models::{Employee, SlotTime, StoreContext};
//! use shift_schedule::pipeline::Pipeline;
//!
//! let context = StoreContext::new(
//!     vec![Employee::new("e1", "Ana").with_role("cashier")],
//!     vec!["Mon".to_string()],
//!     vec![SlotTime::from_hm(9, 0).unwrap(), SlotTime::from_hm(17, 0).unwrap()],
//! )
//! .unwrap();
//!
//! let rules = vec![json!({
//!     "id": "no-late", "name": "No late shifts", "type": "TIME_WINDOW",
//!     "scope": "employee", "priority": 1, "hard": true, "active": true,
//!     "conditions": {}, "constraint": {"end_time": "12:00"}
//! })];
//!
//! let report = Pipeline::new().run(&rules, &context).unwrap();
//! let schedule = report.schedule.unwrap();
//! assert_eq!(schedule.assignment_count(), 1);
//! ```
//!
//! # Features
//!
//! - `parallel`: explore search subtrees on the rayon thread pool.
//!
//! # References
//!
//! - Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach", ch. 6
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"

pub mod artifacts;
pub mod compiler;
pub mod conflict;
pub mod models;
pub mod pipeline;
pub mod solver;
pub mod validation;

pub use compiler::ConstraintCompiler;
pub use conflict::ConflictResolver;
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use solver::{AssignmentSolver, SolverConfig};
pub use validation::RuleValidator;
