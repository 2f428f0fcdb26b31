//! Compiled (canonical) constraints.
//!
//! A [`CompiledConstraint`] is the solver-facing form of one active rule.
//! It keeps the rule's filter and parameters verbatim, so the compiled
//! list can be cached as an artifact and reused across solves, and tags
//! them with a closed [`ConstraintKind`].
//!
//! [`CompiledConstraint::lower`] turns the untyped filter and parameters
//! into a typed [`LoweredConstraint`]. The compiler lowers every
//! constraint it emits, so a malformed parameter is caught at
//! compilation; the solver lowers again because cached artifacts may
//! have been edited by hand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{Employee, SlotTime};

/// Canonical constraint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    /// Forbids slots before `start_time` and/or at or after `end_time`.
    TimeBound,
    /// Caps a sum of assignment variables (`max_hours`, in slots).
    SumLimit,
    /// Bounds the number of employees in each (day, slot) cell.
    SlotCoverage,
    /// Forbids every matching cell.
    Exclusion,
}

/// A compiled constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledConstraint {
    /// Source rule id.
    pub rule_id: String,
    /// Canonical kind.
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    /// Source rule scope.
    pub scope: String,
    /// Source rule conditions.
    pub filter: Map<String, Value>,
    /// Source rule parameters.
    pub params: Map<String, Value>,
    /// Whether the constraint must hold.
    pub hard: bool,
    /// Preference weight among soft constraints.
    pub priority: i64,
}

/// A parameter or filter value that cannot be lowered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("missing parameter '{param}'")]
    Missing { param: &'static str },
    #[error("parameter '{param}' must be {expected}")]
    InvalidType {
        param: &'static str,
        expected: &'static str,
    },
    #[error("parameter '{param}' is not a valid time: {value}")]
    InvalidTime { param: &'static str, value: String },
    #[error("start_time {start} is not before end_time {end}")]
    EmptyWindow { start: SlotTime, end: SlotTime },
    #[error("coverage min {min} exceeds max {max}")]
    MinExceedsMax { min: u32, max: u32 },
    #[error("filter key '{key}' must be a string")]
    InvalidFilter { key: &'static str },
}

/// Population a `SUM_LIMIT` is summed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    /// Each employee, across all days and slots.
    PerEmployee,
    /// Each employee, per day.
    PerEmployeeDay,
    /// All filtered employees together.
    Global,
}

impl LimitScope {
    /// Reads a rule scope. Unrecognized scopes sum per employee.
    pub fn from_scope(scope: &str) -> Self {
        match scope {
            "global" => Self::Global,
            "day" => Self::PerEmployeeDay,
            _ => Self::PerEmployee,
        }
    }
}

/// Typed view of a constraint filter.
///
/// Absent keys match everything. Keys other than these four are kept in
/// the artifact but do not restrict anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellFilter {
    pub role: Option<String>,
    pub employee_id: Option<String>,
    pub day: Option<String>,
    pub time: Option<SlotTime>,
}

impl CellFilter {
    /// Parses a filter map.
    pub fn from_map(filter: &Map<String, Value>) -> Result<Self, ParamError> {
        let time = match filter_str(filter, "time")? {
            Some(s) => Some(s.parse().map_err(|_| ParamError::InvalidTime {
                param: "time",
                value: s,
            })?),
            None => None,
        };
        Ok(Self {
            role: filter_str(filter, "role")?,
            employee_id: filter_str(filter, "employee_id")?,
            day: filter_str(filter, "day")?,
            time,
        })
    }

    /// Whether the employee part of the filter matches.
    pub fn matches_employee(&self, employee: &Employee) -> bool {
        self.role.as_deref().map_or(true, |r| employee.has_role(r))
            && self
                .employee_id
                .as_deref()
                .map_or(true, |id| employee.id == id)
    }

    /// Whether the cell part of the filter matches.
    pub fn matches_cell(&self, day: &str, slot: SlotTime) -> bool {
        self.day.as_deref().map_or(true, |d| d == day) && self.time.map_or(true, |t| t == slot)
    }
}

/// Solver primitive with typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    TimeBound {
        start: Option<SlotTime>,
        end: Option<SlotTime>,
    },
    SumLimit {
        max: u32,
        scope: LimitScope,
    },
    SlotCoverage {
        min: u32,
        max: Option<u32>,
    },
    /// `slots = None` excludes every slot of the matching cells.
    Exclusion {
        slots: Option<Vec<SlotTime>>,
    },
}

impl Primitive {
    /// Whether a `TIME_BOUND` forbids the given slot.
    pub fn forbids_slot(&self, slot: SlotTime) -> bool {
        match self {
            Self::TimeBound { start, end } => {
                start.map_or(false, |s| slot < s) || end.map_or(false, |e| slot >= e)
            }
            Self::Exclusion { slots } => slots.as_ref().map_or(true, |list| list.contains(&slot)),
            Self::SumLimit { .. } | Self::SlotCoverage { .. } => false,
        }
    }
}

/// A compiled constraint with typed filter and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweredConstraint {
    pub filter: CellFilter,
    pub primitive: Primitive,
}

impl CompiledConstraint {
    /// Lowers the untyped filter and parameters.
    pub fn lower(&self) -> Result<LoweredConstraint, ParamError> {
        let filter = CellFilter::from_map(&self.filter)?;
        let primitive = match self.kind {
            ConstraintKind::TimeBound => {
                let start = param_time(&self.params, "start_time")?;
                let end = param_time(&self.params, "end_time")?;
                match (start, end) {
                    (None, None) => return Err(ParamError::Missing { param: "start_time" }),
                    (Some(s), Some(e)) if s >= e => {
                        return Err(ParamError::EmptyWindow { start: s, end: e })
                    }
                    _ => Primitive::TimeBound { start, end },
                }
            }
            ConstraintKind::SumLimit => Primitive::SumLimit {
                max: param_count(&self.params, "max_hours")?
                    .ok_or(ParamError::Missing { param: "max_hours" })?,
                scope: LimitScope::from_scope(&self.scope),
            },
            ConstraintKind::SlotCoverage => {
                let min = param_count(&self.params, "min")?
                    .ok_or(ParamError::Missing { param: "min" })?;
                let max = param_count(&self.params, "max")?;
                if let Some(max) = max {
                    if min > max {
                        return Err(ParamError::MinExceedsMax { min, max });
                    }
                }
                Primitive::SlotCoverage { min, max }
            }
            ConstraintKind::Exclusion => Primitive::Exclusion {
                slots: param_time_list(&self.params, "slots")?,
            },
        };
        Ok(LoweredConstraint { filter, primitive })
    }
}

fn filter_str(filter: &Map<String, Value>, key: &'static str) -> Result<Option<String>, ParamError> {
    match filter.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParamError::InvalidFilter { key }),
    }
}

fn parse_time(param: &'static str, s: &str) -> Result<SlotTime, ParamError> {
    s.parse().map_err(|_| ParamError::InvalidTime {
        param,
        value: s.to_string(),
    })
}

fn param_time(params: &Map<String, Value>, param: &'static str) -> Result<Option<SlotTime>, ParamError> {
    match params.get(param) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_time(param, s).map(Some),
        Some(_) => Err(ParamError::InvalidType {
            param,
            expected: "a \"HH:MM\" string",
        }),
    }
}

fn param_time_list(
    params: &Map<String, Value>,
    param: &'static str,
) -> Result<Option<Vec<SlotTime>>, ParamError> {
    let invalid = ParamError::InvalidType {
        param,
        expected: "an array of \"HH:MM\" strings",
    };
    match params.get(param) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => parse_time(param, s),
                _ => Err(invalid.clone()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(invalid),
    }
}

fn param_count(params: &Map<String, Value>, param: &'static str) -> Result<Option<u32>, ParamError> {
    match params.get(param) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or(ParamError::InvalidType {
                param,
                expected: "a non-negative integer",
            }),
    }
}
