//! JSON artifacts: rule sets, employee lists, store hours, compiled
//! constraints and schedules.
//!
//! # Formats
//!
//! | Artifact    | Document form                               | Also accepted     |
//! |-------------|---------------------------------------------|-------------------|
//! | rules       | `{"rules": [...]}`                          | bare array        |
//! | employees   | `{"employees": [...]}`                      | bare array        |
//! | store hours | `{"days": {"Mon": {"open", "close"}}, ...}` | `[{"day", ...}]`  |
//! | constraints | `{"constraints": [...]}`                    | bare array        |
//! | schedule    | `[{"employee", "day", "time"}]`             |                   |
//!
//! A missing or blank file loads as an empty collection. Malformed JSON
//! is an error, never silently discarded.
//!
//! Rules are loaded as raw JSON values; they must still pass
//! [`RuleValidator`](crate::validation::RuleValidator). Employees and
//! store hours are validated on load.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::{
    AssignmentRecord, CompiledConstraint, DayHours, Employee, Rule, Schedule, StoreHours,
};
use crate::validation::{validate_day_hours, validate_employee, InputError};

/// Failure reading or writing an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected {expected}")]
    Shape { expected: &'static str },
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Reads a file, treating a missing file as empty.
fn read_text(path: &Path) -> Result<String, ArtifactError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    debug!(path = %path.display(), "artifact written");
    Ok(())
}

/// Extracts the list under `key`, or the document itself if it is an array.
///
/// `expected` describes the list for the shape error.
fn list_under(
    text: &str,
    key: &str,
    expected: &'static str,
) -> Result<Vec<Value>, ArtifactError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(text)? {
        Value::Array(items) => Ok(items),
        Value::Object(mut doc) => match doc.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ArtifactError::Shape { expected }),
        },
        _ => Err(ArtifactError::Shape {
            expected: "an object or array",
        }),
    }
}

// ---- rules ----

/// Parses a rule set into raw (unvalidated) rule objects.
pub fn parse_rules(text: &str) -> Result<Vec<Value>, ArtifactError> {
    list_under(text, "rules", "a \"rules\" array")
}

/// Loads a rule set file.
pub fn load_rules(path: impl AsRef<Path>) -> Result<Vec<Value>, ArtifactError> {
    parse_rules(&read_text(path.as_ref())?)
}

/// Saves rules as `{"rules": [...]}`.
pub fn save_rules(path: impl AsRef<Path>, rules: &[Rule]) -> Result<(), ArtifactError> {
    write_json(path.as_ref(), &json!({ "rules": rules }))
}

// ---- employees ----

/// Parses and validates an employee list.
pub fn parse_employees(text: &str) -> Result<Vec<Employee>, ArtifactError> {
    let mut employees = Vec::new();
    for item in list_under(text, "employees", "an \"employees\" array")? {
        let employee: Employee = serde_json::from_value(item)?;
        validate_employee(&employee)?;
        employees.push(employee);
    }
    Ok(employees)
}

/// Loads an employee file.
pub fn load_employees(path: impl AsRef<Path>) -> Result<Vec<Employee>, ArtifactError> {
    parse_employees(&read_text(path.as_ref())?)
}

/// Saves employees as `{"employees": [...]}`.
pub fn save_employees(path: impl AsRef<Path>, employees: &[Employee]) -> Result<(), ArtifactError> {
    write_json(path.as_ref(), &json!({ "employees": employees }))
}

// ---- store hours ----

/// Parses store hours.
///
/// In the document form days are keyed by name and keep the order they
/// are written in. Any `time_slots` entry is ignored since slots are derived
/// from the hours.
pub fn parse_store_hours(text: &str) -> Result<StoreHours, ArtifactError> {
    if text.trim().is_empty() {
        return Ok(StoreHours::new());
    }
    let hours = match serde_json::from_str(text)? {
        Value::Array(items) => StoreHours {
            days: items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<_, _>>()?,
        },
        Value::Object(doc) => from_day_map(doc)?,
        _ => {
            return Err(ArtifactError::Shape {
                expected: "an object or array",
            })
        }
    };
    for day in &hours.days {
        validate_day_hours(day)?;
    }
    Ok(hours)
}

fn from_day_map(mut doc: Map<String, Value>) -> Result<StoreHours, ArtifactError> {
    let days = match doc.remove("days") {
        Some(Value::Object(days)) => days,
        None => return Ok(StoreHours::new()),
        Some(_) => {
            return Err(ArtifactError::Shape {
                expected: "a \"days\" object",
            })
        }
    };

    let mut hours = StoreHours::new();
    for (day, entry) in days {
        let field = |name: &'static str| {
            entry
                .get(name)
                .and_then(Value::as_str)
                .ok_or(ArtifactError::Shape {
                    expected: "\"open\" and \"close\" strings",
                })
        };
        hours = hours.with_day(DayHours::new(day, field("open")?, field("close")?)?);
    }
    Ok(hours)
}

/// Loads a store hours file.
pub fn load_store_hours(path: impl AsRef<Path>) -> Result<StoreHours, ArtifactError> {
    parse_store_hours(&read_text(path.as_ref())?)
}

/// Saves store hours in document form, with derived `time_slots`.
pub fn save_store_hours(path: impl AsRef<Path>, hours: &StoreHours) -> Result<(), ArtifactError> {
    let days: Map<String, Value> = hours
        .days
        .iter()
        .map(|d| (d.day.clone(), json!({ "open": d.open, "close": d.close })))
        .collect();
    write_json(
        path.as_ref(),
        &json!({ "days": days, "time_slots": hours.slot_boundaries() }),
    )
}

// ---- compiled constraints ----

/// Parses a compiled constraint list.
pub fn parse_constraints(text: &str) -> Result<Vec<CompiledConstraint>, ArtifactError> {
    list_under(text, "constraints", "a \"constraints\" array")?
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(ArtifactError::from))
        .collect()
}

/// Loads compiled constraints, e.g. to re-solve without recompiling.
pub fn load_constraints(path: impl AsRef<Path>) -> Result<Vec<CompiledConstraint>, ArtifactError> {
    parse_constraints(&read_text(path.as_ref())?)
}

/// Saves compiled constraints as `{"constraints": [...]}`.
pub fn save_constraints(
    path: impl AsRef<Path>,
    constraints: &[CompiledConstraint],
) -> Result<(), ArtifactError> {
    write_json(path.as_ref(), &json!({ "constraints": constraints }))
}

// ---- schedules ----

/// Parses schedule records.
pub fn parse_records(text: &str) -> Result<Vec<AssignmentRecord>, ArtifactError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(text)?)
}

/// Loads schedule records.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<AssignmentRecord>, ArtifactError> {
    parse_records(&read_text(path.as_ref())?)
}

/// Saves a schedule's assignment records.
pub fn save_schedule(path: impl AsRef<Path>, schedule: &Schedule) -> Result<(), ArtifactError> {
    write_json(path.as_ref(), schedule.records())
}
