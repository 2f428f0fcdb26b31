//! Employee model.
//!
//! Employees are the assignable entities of a shift schedule. Each one
//! carries a unique identifier, a display name, and the role labels that
//! rule filters match against.

use serde::{Deserialize, Serialize};

/// An employee that can be assigned to (day, slot) cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique employee identifier (non-empty).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Role labels (e.g., "cashier", "manager"). Must be non-empty.
    pub roles: Vec<String>,
}

impl Employee {
    /// Creates an employee with no roles.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: Vec::new(),
        }
    }

    /// Adds a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Replaces the role list.
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Whether this employee holds the given role.
    #[inline]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
