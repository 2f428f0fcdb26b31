//! Declarative scheduling rules.
//!
//! A rule is the authoring-side form of a constraint: a type tag, a
//! filter over who/when it applies to (`conditions`), and the parameters
//! of the restriction (`constraint`). Rules reach the pipeline as raw
//! JSON objects and become [`Rule`] values only after passing
//! [`validate_rule`](crate::validation::validate_rule).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Rule type tag.
///
/// Known types each have exactly one compilation branch. Any other tag is
/// carried as `Other` and skipped by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleType {
    /// Restricts the times of day an employee population may work.
    TimeWindow,
    /// Caps the number of assigned slots.
    Limit,
    /// Minimum/maximum staffing per (day, slot).
    Coverage,
    /// Marks cells an employee population cannot work.
    Availability,
    /// Unrecognized tag, kept verbatim.
    Other(String),
}

impl RuleType {
    /// Wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::TimeWindow => "TIME_WINDOW",
            Self::Limit => "LIMIT",
            Self::Coverage => "COVERAGE",
            Self::Availability => "AVAILABILITY",
            Self::Other(s) => s,
        }
    }

    /// Whether the compiler has a branch for this type.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for RuleType {
    fn from(s: &str) -> Self {
        match s {
            "TIME_WINDOW" => Self::TimeWindow,
            "LIMIT" => Self::Limit,
            "COVERAGE" => Self::Coverage,
            "AVAILABILITY" => Self::Availability,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for RuleType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<RuleType> for String {
    fn from(t: RuleType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated scheduling rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Rule type tag.
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// Population the rule applies to (e.g., "employee", "global", "day").
    pub scope: String,
    /// Preference weight; higher wins among soft rules.
    pub priority: i64,
    /// Hard rules must hold; soft rules are preferences.
    pub hard: bool,
    /// Inactive rules are skipped at compilation.
    pub active: bool,
    /// Filter keys to values (e.g., `role`, `employee_id`, `day`).
    pub conditions: Map<String, Value>,
    /// Parameters of the restriction (e.g., `start_time`, `max_hours`).
    pub constraint: Map<String, Value>,
}

impl Rule {
    /// Creates an active, hard rule with empty conditions and parameters.
    pub fn new(id: impl Into<String>, rule_type: RuleType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            rule_type,
            scope: "employee".to_string(),
            priority: 0,
            hard: true,
            active: true,
            conditions: Map::new(),
            constraint: Map::new(),
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the rule soft (a weighted preference).
    pub fn soft(mut self) -> Self {
        self.hard = false;
        self
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Adds a condition.
    pub fn with_condition(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    /// Adds a constraint parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraint.insert(key.into(), value.into());
        self
    }

    /// Raw JSON object form, as accepted by the validator.
    pub fn to_value(&self) -> Value {
        // Only string keys and JSON values inside; cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
