//! Decision-variable space and constraint lowering for the search.
//!
//! Every (employee, day, slot) triple gets one boolean variable, indexed
//! in search order: employees sorted by id, then days in context order,
//! then slots ascending. Nothing is pruned at construction.
//!
//! Constraints become two things:
//! - **fixed** variables: hard `TIME_BOUND` and `EXCLUSION` cells are
//!   forced false before the search starts;
//! - **groups**: a set of variables whose true-count must lie in
//!   `[min, max]`. `SUM_LIMIT`, `SLOT_COVERAGE`, the context coverage
//!   requirement, and every soft forbidding constraint are groups.
//!
//! A group is *broken* once `count > max` or `count + open < min`, where
//! `open` is the number of its undecided, non-fixed variables. Both
//! conditions only get worse deeper in the tree, so a broken hard group
//! prunes the subtree and a broken soft group is a settled violation.

use crate::models::{
    CompiledConstraint, ConstraintKind, Coverage, LimitScope, LoweredConstraint, Primitive,
    SlotTime, StoreContext,
};

use super::SolveError;

/// Who a group belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    Hard,
    /// Index into [`SearchModel::soft`].
    Soft(usize),
}

/// Cardinality bound over a set of variables.
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub vars: Vec<usize>,
    pub min: u32,
    pub max: Option<u32>,
    pub owner: Owner,
}

impl Group {
    #[inline]
    pub fn is_broken(&self, count: u32, open: u32) -> bool {
        self.max.is_some_and(|m| count > m) || count + open < self.min
    }
}

/// A soft constraint and its objective weight.
#[derive(Debug, Clone)]
pub(crate) struct SoftConstraint {
    pub rule_id: String,
    pub kind: ConstraintKind,
    pub priority: i64,
    pub weight: i64,
}

/// Largest priority that still counts toward a soft weight.
///
/// Keeps the sum over any realistic number of soft constraints inside `i64`.
pub(crate) const MAX_SOFT_PRIORITY: i64 = i32::MAX as i64;

/// Objective weight of a satisfied soft constraint.
pub(crate) fn soft_weight(priority: i64) -> i64 {
    priority.clamp(0, MAX_SOFT_PRIORITY) + 1
}

/// Index arithmetic over the variable space.
#[derive(Debug, Clone)]
pub(crate) struct VariableSpace {
    /// Context employee indices, sorted by employee id.
    pub employee_order: Vec<usize>,
    pub days: usize,
    pub slots: usize,
}

impl VariableSpace {
    fn new(context: &StoreContext) -> Self {
        let employees = context.employees();
        let mut employee_order: Vec<usize> = (0..employees.len()).collect();
        employee_order.sort_by(|&a, &b| employees[a].id.cmp(&employees[b].id));
        Self {
            employee_order,
            days: context.days().len(),
            slots: context.slots().len(),
        }
    }

    /// Total number of variables.
    pub fn len(&self) -> usize {
        self.employee_order.len() * self.days * self.slots
    }

    /// Variable index for (employee position in search order, day, slot).
    #[inline]
    pub fn index(&self, e: usize, d: usize, s: usize) -> usize {
        (e * self.days + d) * self.slots + s
    }

    /// Inverse of [`index`](Self::index): (context employee index, day, slot).
    pub fn triple(&self, var: usize) -> (usize, usize, usize) {
        let s = var % self.slots;
        let d = (var / self.slots) % self.days;
        let e = var / (self.slots * self.days);
        (self.employee_order[e], d, s)
    }
}

/// Everything the search needs, derived once per solve.
#[derive(Debug, Clone)]
pub(crate) struct SearchModel {
    pub space: VariableSpace,
    /// `fixed[v]` = variable `v` is forced false.
    pub fixed: Vec<bool>,
    pub groups: Vec<Group>,
    /// Groups each variable participates in.
    pub var_groups: Vec<Vec<usize>>,
    pub soft: Vec<SoftConstraint>,
}

impl SearchModel {
    /// Builds the variable space and applies every constraint.
    pub fn build(
        context: &StoreContext,
        constraints: &[CompiledConstraint],
    ) -> Result<Self, SolveError> {
        let space = VariableSpace::new(context);
        let mut model = Self {
            fixed: vec![false; space.len()],
            groups: Vec::new(),
            var_groups: Vec::new(),
            soft: Vec::new(),
            space,
        };

        model.apply_coverage(context, None, context.coverage(), Owner::Hard);

        for c in constraints {
            let lowered = c.lower().map_err(|source| SolveError::MalformedConstraint {
                rule_id: c.rule_id.clone(),
                source,
            })?;
            let owner = if c.hard {
                Owner::Hard
            } else {
                model.soft.push(SoftConstraint {
                    rule_id: c.rule_id.clone(),
                    kind: c.kind,
                    priority: c.priority,
                    weight: soft_weight(c.priority),
                });
                Owner::Soft(model.soft.len() - 1)
            };
            model.apply(context, &lowered, owner);
        }

        let mut var_groups = vec![Vec::new(); model.space.len()];
        for (g, group) in model.groups.iter().enumerate() {
            for &v in &group.vars {
                var_groups[v].push(g);
            }
        }
        model.var_groups = var_groups;
        Ok(model)
    }

    /// Number of variables forced false.
    pub fn fixed_count(&self) -> usize {
        self.fixed.iter().filter(|&&f| f).count()
    }

    fn apply(&mut self, context: &StoreContext, c: &LoweredConstraint, owner: Owner) {
        match &c.primitive {
            Primitive::TimeBound { .. } | Primitive::Exclusion { .. } => {
                let forbidden = self.matching_vars(context, c, |slot| c.primitive.forbids_slot(slot));
                match owner {
                    Owner::Hard => {
                        for v in forbidden {
                            self.fixed[v] = true;
                        }
                    }
                    Owner::Soft(_) => self.push_group(forbidden, 0, Some(0), owner),
                }
            }
            Primitive::SumLimit { max, scope } => self.apply_sum_limit(context, c, *max, *scope, owner),
            Primitive::SlotCoverage { min, max } => self.apply_coverage(
                context,
                Some(c),
                Coverage {
                    min: *min,
                    max: *max,
                },
                owner,
            ),
        }
    }

    fn apply_sum_limit(
        &mut self,
        context: &StoreContext,
        c: &LoweredConstraint,
        max: u32,
        scope: LimitScope,
        owner: Owner,
    ) {
        let employees = context.employees();
        let days = context.days();
        let slots = context.slots();
        let order = self.space.employee_order.clone();
        let mut global = Vec::new();

        for (e_pos, &e) in order.iter().enumerate() {
            if !c.filter.matches_employee(&employees[e]) {
                continue;
            }
            let mut per_employee = Vec::new();
            for (d, day) in days.iter().enumerate() {
                let per_day: Vec<usize> = slots
                    .iter()
                    .enumerate()
                    .filter(|&(_, &slot)| c.filter.matches_cell(day, slot))
                    .map(|(s, _)| self.space.index(e_pos, d, s))
                    .collect();
                match scope {
                    LimitScope::PerEmployeeDay => {
                        self.push_group(per_day, 0, Some(max), owner);
                    }
                    LimitScope::PerEmployee => per_employee.extend(per_day),
                    LimitScope::Global => global.extend(per_day),
                }
            }
            if scope == LimitScope::PerEmployee {
                self.push_group(per_employee, 0, Some(max), owner);
            }
        }

        if scope == LimitScope::Global {
            self.push_group(global, 0, Some(max), owner);
        }
    }

    /// One group per matching (day, slot) cell, over matching employees.
    fn apply_coverage(
        &mut self,
        context: &StoreContext,
        c: Option<&LoweredConstraint>,
        coverage: Coverage,
        owner: Owner,
    ) {
        if coverage.is_unconstrained() {
            return;
        }
        let employees = context.employees();
        for (d, day) in context.days().iter().enumerate() {
            for (s, &slot) in context.slots().iter().enumerate() {
                if c.is_some_and(|c| !c.filter.matches_cell(day, slot)) {
                    continue;
                }
                let vars: Vec<usize> = self
                    .space
                    .employee_order
                    .iter()
                    .enumerate()
                    .filter(|&(_, &e)| c.map_or(true, |c| c.filter.matches_employee(&employees[e])))
                    .map(|(e_pos, _)| self.space.index(e_pos, d, s))
                    .collect();
                self.push_group(vars, coverage.min, coverage.max, owner);
            }
        }
    }

    fn matching_vars(
        &self,
        context: &StoreContext,
        c: &LoweredConstraint,
        slot_pred: impl Fn(SlotTime) -> bool,
    ) -> Vec<usize> {
        let employees = context.employees();
        let mut vars = Vec::new();
        for (e_pos, &e) in self.space.employee_order.iter().enumerate() {
            if !c.filter.matches_employee(&employees[e]) {
                continue;
            }
            for (d, day) in context.days().iter().enumerate() {
                for (s, &slot) in context.slots().iter().enumerate() {
                    if c.filter.matches_cell(day, slot) && slot_pred(slot) {
                        vars.push(self.space.index(e_pos, d, s));
                    }
                }
            }
        }
        vars
    }

    fn push_group(&mut self, vars: Vec<usize>, min: u32, max: Option<u32>, owner: Owner) {
        // An empty soft group is trivially satisfied; keep it so the
        // constraint still scores. Empty hard groups with min 0 are no-ops.
        if vars.is_empty() && min == 0 && owner == Owner::Hard {
            return;
        }
        self.groups.push(Group {
            vars,
            min,
            max,
            owner,
        });
    }
}
