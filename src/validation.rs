//! Input validation.
//!
//! Two gates guard the pipeline:
//! - [`validate_rule`] checks a raw rule object against the rule schema
//!   before it reaches conflict detection or compilation. It is
//!   fail-fast: the first missing or mistyped field is reported.
//! - [`validate_employee`] and [`validate_day_hours`] check context
//!   inputs when a [`StoreContext`](crate::models::StoreContext) is built.
//!
//! Types are checked exactly. A numeric string for `priority` is a type
//! error, not a cast, and `1.0` is not an integer.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{DayHours, Employee, Rule, RuleType, SlotTime};

/// JSON type a required rule field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Mapping,
}

impl FieldType {
    /// Name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Mapping => "mapping",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.as_i64().is_some(),
            Self::Boolean => value.is_boolean(),
            Self::Mapping => value.is_object(),
        }
    }
}

/// Required rule fields, in the order they are checked.
pub const REQUIRED_FIELDS: [(&str, FieldType); 9] = [
    ("id", FieldType::String),
    ("name", FieldType::String),
    ("type", FieldType::String),
    ("scope", FieldType::String),
    ("priority", FieldType::Integer),
    ("hard", FieldType::Boolean),
    ("conditions", FieldType::Mapping),
    ("constraint", FieldType::Mapping),
    ("active", FieldType::Boolean),
];

/// A rule object that does not match the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("rule must be a JSON object")]
    NotAnObject,
    #[error("missing field {field}")]
    MissingField { field: &'static str },
    #[error("invalid type for {field}: expected {}", .expected.name())]
    InvalidType {
        field: &'static str,
        expected: FieldType,
    },
}

impl SchemaError {
    /// The offending field, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::NotAnObject => None,
            Self::MissingField { field } | Self::InvalidType { field, .. } => Some(field),
        }
    }
}

/// Invalid employee or store-hours input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("employee id required")]
    EmptyEmployeeId,
    #[error("employee '{0}' has no name")]
    EmptyEmployeeName(String),
    #[error("employee '{0}' needs at least one role")]
    NoRoles(String),
    #[error("duplicate employee id: {0}")]
    DuplicateEmployee(String),
    #[error("day name required")]
    EmptyDayName,
    #[error("duplicate day: {0}")]
    DuplicateDay(String),
    #[error("{day}: open time {open} must be before close time {close}")]
    OpenNotBeforeClose {
        day: String,
        open: SlotTime,
        close: SlotTime,
    },
    #[error("context has no days")]
    NoDays,
    #[error("context has no time slots")]
    NoSlots,
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
}

/// Rule schema validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl RuleValidator {
    /// Creates a validator.
    pub fn new() -> Self {
        Self
    }

    /// Checks a raw rule object and returns the typed rule.
    pub fn validate(&self, raw: &Value) -> Result<Rule, SchemaError> {
        validate_rule(raw)
    }
}

/// Validates a raw rule object.
///
/// Checks [`REQUIRED_FIELDS`] in order and returns the first missing or
/// mistyped field. Extra fields are ignored.
pub fn validate_rule(raw: &Value) -> Result<Rule, SchemaError> {
    let obj = raw.as_object().ok_or(SchemaError::NotAnObject)?;

    for (field, expected) in REQUIRED_FIELDS {
        let value = obj.get(field).ok_or(SchemaError::MissingField { field })?;
        if !expected.matches(value) {
            return Err(SchemaError::InvalidType { field, expected });
        }
    }

    // Every field below was type-checked above.
    let string = |field: &str| obj[field].as_str().unwrap_or_default().to_string();
    let mapping = |field: &str| obj[field].as_object().cloned().unwrap_or_else(Map::new);

    Ok(Rule {
        id: string("id"),
        name: string("name"),
        rule_type: RuleType::from(obj["type"].as_str().unwrap_or_default()),
        scope: string("scope"),
        priority: obj["priority"].as_i64().unwrap_or_default(),
        hard: obj["hard"].as_bool().unwrap_or_default(),
        active: obj["active"].as_bool().unwrap_or_default(),
        conditions: mapping("conditions"),
        constraint: mapping("constraint"),
    })
}

/// Validates an employee record.
pub fn validate_employee(employee: &Employee) -> Result<(), InputError> {
    if employee.id.is_empty() {
        return Err(InputError::EmptyEmployeeId);
    }
    if employee.name.is_empty() {
        return Err(InputError::EmptyEmployeeName(employee.id.clone()));
    }
    if employee.roles.is_empty() {
        return Err(InputError::NoRoles(employee.id.clone()));
    }
    Ok(())
}

/// Validates one day of store hours.
pub fn validate_day_hours(hours: &DayHours) -> Result<(), InputError> {
    if hours.day.is_empty() {
        return Err(InputError::EmptyDayName);
    }
    if hours.open >= hours.close {
        return Err(InputError::OpenNotBeforeClose {
            day: hours.day.clone(),
            open: hours.open,
            close: hours.close,
        });
    }
    Ok(())
}
