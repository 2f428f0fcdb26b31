//! Store context: who can work, on which days, in which slots.
//!
//! # Time Model
//! Slots are wall-clock times of day (`"HH:MM"`), stored as minutes since
//! midnight. Ordering is numeric, which matches lexicographic order of the
//! zero-padded strings, so "before/after" comparisons in constraints are
//! well-defined.
//!
//! Slots are derived from store hours as the sorted set of distinct
//! open/close boundaries across all days.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::Employee;
use crate::validation::{validate_day_hours, validate_employee, InputError};

/// A time of day with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime {
    minutes: u16,
}

impl SlotTime {
    /// Creates a slot time from hour and minute.
    ///
    /// Returns `None` when out of range.
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self {
            minutes: hour * 60 + minute,
        })
    }

    /// Minutes since midnight.
    #[inline]
    pub fn minutes(&self) -> u16 {
        self.minutes
    }
}

impl FromStr for SlotTime {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InputError::InvalidTime(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for SlotTime {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotTime> for String {
    fn from(value: SlotTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// Opening hours for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    /// Day name (e.g., "Mon").
    pub day: String,
    /// Opening time.
    pub open: SlotTime,
    /// Closing time.
    pub close: SlotTime,
}

impl DayHours {
    /// Creates day hours from `"HH:MM"` strings.
    pub fn new(day: impl Into<String>, open: &str, close: &str) -> Result<Self, InputError> {
        Ok(Self {
            day: day.into(),
            open: open.parse()?,
            close: close.parse()?,
        })
    }
}

/// Store opening hours for the week, in day order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreHours {
    pub days: Vec<DayHours>,
}

impl StoreHours {
    /// Creates empty store hours.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: appends a day.
    pub fn with_day(mut self, hours: DayHours) -> Self {
        self.days.push(hours);
        self
    }

    /// Sorted distinct open/close boundaries across all days.
    pub fn slot_boundaries(&self) -> Vec<SlotTime> {
        let mut slots: Vec<SlotTime> = self
            .days
            .iter()
            .flat_map(|d| [d.open, d.close])
            .collect();
        slots.sort();
        slots.dedup();
        slots
    }
}

/// Staffing requirement for a single (day, slot) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coverage {
    /// Minimum number of employees assigned.
    pub min: u32,
    /// Maximum number of employees assigned (`None` = unbounded).
    pub max: Option<u32>,
}

impl Coverage {
    /// No requirement.
    pub fn none() -> Self {
        Self::default()
    }

    /// At least `min` employees per cell.
    pub fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    /// Between `min` and `max` employees per cell.
    pub fn between(min: u32, max: u32) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Whether this requirement constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        self.min == 0 && self.max.is_none()
    }
}

/// Everything the solver needs besides the compiled constraints.
///
/// Immutable once built: employees keep input order, days keep input
/// order, slots are sorted and distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawContext")]
pub struct StoreContext {
    employees: Vec<Employee>,
    days: Vec<String>,
    slots: Vec<SlotTime>,
    coverage: Coverage,
}

/// Unchecked wire form of [`StoreContext`].
#[derive(Deserialize)]
struct RawContext {
    employees: Vec<Employee>,
    days: Vec<String>,
    slots: Vec<SlotTime>,
    #[serde(default)]
    coverage: Coverage,
}

impl TryFrom<RawContext> for StoreContext {
    type Error = InputError;

    fn try_from(raw: RawContext) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.employees, raw.days, raw.slots)?.with_coverage(raw.coverage))
    }
}

impl StoreContext {
    /// Creates a context from explicit days and slots.
    ///
    /// Slots are sorted and deduplicated. Fails on invalid employees,
    /// duplicate employee ids or days, or empty day/slot lists.
    pub fn new(
        employees: Vec<Employee>,
        days: Vec<String>,
        mut slots: Vec<SlotTime>,
    ) -> Result<Self, InputError> {
        let mut ids = HashSet::new();
        for e in &employees {
            validate_employee(e)?;
            if !ids.insert(e.id.as_str()) {
                return Err(InputError::DuplicateEmployee(e.id.clone()));
            }
        }

        let mut seen_days = HashSet::new();
        for d in &days {
            if d.is_empty() {
                return Err(InputError::EmptyDayName);
            }
            if !seen_days.insert(d.as_str()) {
                return Err(InputError::DuplicateDay(d.clone()));
            }
        }
        if days.is_empty() {
            return Err(InputError::NoDays);
        }

        slots.sort();
        slots.dedup();
        if slots.is_empty() {
            return Err(InputError::NoSlots);
        }

        Ok(Self {
            employees,
            days,
            slots,
            coverage: Coverage::none(),
        })
    }

    /// Creates a context from store hours, deriving days and slots.
    pub fn from_store_hours(
        employees: Vec<Employee>,
        hours: &StoreHours,
    ) -> Result<Self, InputError> {
        for h in &hours.days {
            validate_day_hours(h)?;
        }
        let days = hours.days.iter().map(|h| h.day.clone()).collect();
        Self::new(employees, days, hours.slot_boundaries())
    }

    /// Sets the per-cell coverage requirement.
    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    /// Employees in input order.
    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    /// Days in input order.
    pub fn days(&self) -> &[String] {
        &self.days
    }

    /// Slots in ascending time order.
    pub fn slots(&self) -> &[SlotTime] {
        &self.slots
    }

    /// Per-cell coverage requirement.
    pub fn coverage(&self) -> Coverage {
        self.coverage
    }

    /// Looks up an employee by id.
    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    /// Size of the decision-variable space: employees × days × slots.
    pub fn variable_count(&self) -> usize {
        self.employees.len() * self.days.len() * self.slots.len()
    }
}
