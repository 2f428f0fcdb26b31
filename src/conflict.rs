//! Rule conflict detection.
//!
//! Two rules collide when they share a type and the same set of
//! conditions. Conditions are compared as a sorted list of
//! (key, canonical JSON value) pairs, so key order inside the
//! `conditions` object never matters.
//!
//! Rules are scanned in input order; the first rule seen for a key is
//! canonical and every later rule with the same key is reported against
//! it. Nothing is dropped here. Callers decide what to do with the report.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Rule, RuleType};

/// A later rule shadowed by an earlier one with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Rule that was seen first and stays authoritative.
    pub canonical: String,
    /// Rule that collides with it.
    pub shadowed: String,
    /// Position of the shadowed rule in the resolved slice.
    pub shadowed_index: usize,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conflict between {} and {}", self.canonical, self.shadowed)
    }
}

/// Result of a conflict pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// True iff at least one conflict was found.
    pub blocked: bool,
    /// Conflicts in detection order.
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    /// Human-readable conflict lines.
    pub fn messages(&self) -> Vec<String> {
        self.conflicts.iter().map(ToString::to_string).collect()
    }

    /// Ids of every non-canonical rule.
    pub fn shadowed_ids(&self) -> HashSet<&str> {
        self.conflicts.iter().map(|c| c.shadowed.as_str()).collect()
    }

    /// Input positions of every non-canonical rule.
    ///
    /// Ids are not required to be unique, so callers dropping shadowed
    /// rules should filter by position.
    pub fn shadowed_positions(&self) -> HashSet<usize> {
        self.conflicts.iter().map(|c| c.shadowed_index).collect()
    }
}

/// Conflict key: rule type plus sorted condition pairs.
type ConflictKey = (RuleType, Vec<(String, String)>);

fn conflict_key(rule: &Rule) -> ConflictKey {
    let mut pairs: Vec<(String, String)> = rule
        .conditions
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect();
    pairs.sort();
    (rule.rule_type.clone(), pairs)
}

/// Detects rules colliding on (type, conditions).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver;

impl ConflictResolver {
    /// Creates a resolver.
    pub fn new() -> Self {
        Self
    }

    /// Scans rules in order and reports every collision.
    pub fn resolve(&self, rules: &[Rule]) -> ConflictReport {
        let mut seen: HashMap<ConflictKey, &str> = HashMap::new();
        let mut conflicts = Vec::new();

        for (index, rule) in rules.iter().enumerate() {
            match seen.get(&conflict_key(rule)) {
                Some(&canonical) => {
                    warn!(canonical, shadowed = %rule.id, "rule conflict");
                    conflicts.push(Conflict {
                        canonical: canonical.to_string(),
                        shadowed: rule.id.clone(),
                        shadowed_index: index,
                    });
                }
                None => {
                    seen.insert(conflict_key(rule), rule.id.as_str());
                }
            }
        }

        ConflictReport {
            blocked: !conflicts.is_empty(),
            conflicts,
        }
    }
}
