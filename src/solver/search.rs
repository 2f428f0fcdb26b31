//! Depth-first branch-and-bound over the free decision variables.
//!
//! # Algorithm
//!
//! 1. Variables forced false by hard constraints are never branched on.
//! 2. Free variables are visited in index order (employee id, day, slot),
//!    trying `true` before `false`.
//! 3. Every assignment updates group counts incrementally; a broken hard
//!    group prunes the branch immediately.
//! 4. At each node an optimistic score is compared with the incumbent;
//!    branches that cannot beat it are cut.
//! 5. Complete assignments are offered to a shared incumbent that keeps
//!    the highest score, ties going to the earliest in search order.
//!
//! # Parallelism
//!
//! The first `split_depth` free variables are enumerated up front into
//! `2^split_depth` independent subtrees, numbered in the same order a
//! sequential search would visit them. Each subtree owns a copy of the
//! state; only the incumbent and the node counter are shared. Comparing
//! `(score, subtree index)` keeps the result identical to the sequential
//! search whenever the budget is not exhausted.
//!
//! # Coverage bound
//!
//! Each free variable is charged to one "primary" hard group with a
//! maximum (the tightest one containing it). Variables charged to the same
//! group can add at most that group's remaining slack, so
//! `assigned + unbounded_open + Σ min(primary_open[g], slack[g])` is a
//! valid upper bound on coverage.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::models::Score;

use super::model::{Owner, SearchModel};
use super::SolverConfig;

/// Nodes between deadline checks and incumbent refreshes.
const CHECK_INTERVAL: u64 = 256;

/// Upper limit on split depth (2^16 subtrees).
const MAX_SPLIT_DEPTH: usize = 16;

/// Best complete assignment found.
#[derive(Debug, Clone)]
pub(crate) struct Incumbent {
    pub score: Score,
    /// Subtree the assignment was found in.
    pub branch: usize,
    /// Value of every variable (fixed ones are false).
    pub values: Vec<bool>,
}

/// How the search ended.
#[derive(Debug, Clone)]
pub(crate) struct SearchOutcome {
    pub best: Option<Incumbent>,
    pub nodes: u64,
    /// Stopped by the node or time budget.
    pub exhausted: bool,
}

/// `(score, branch)` of an incumbent, cached per worker.
type Bound = Option<(Score, usize)>;

/// Whether a candidate from `branch` with optimistic score `ub` can still
/// replace the incumbent.
#[inline]
fn can_improve(ub: Score, branch: usize, bound: &Bound) -> bool {
    match *bound {
        None => true,
        Some((best, best_branch)) => ub > best || (ub == best && branch < best_branch),
    }
}

/// Incremental search state. Cloned once per subtree.
#[derive(Debug, Clone)]
struct State {
    values: Vec<bool>,
    count: Vec<u32>,
    open: Vec<u32>,
    soft_broken: Vec<u32>,
    hard_broken: u32,
    /// Sum of weights of soft constraints with no broken group.
    soft_alive: i64,
    assigned_true: u64,
    /// Undecided free variables per primary group.
    primary_open: Vec<u32>,
    /// Undecided free variables without a primary group.
    unbounded_open: u64,
    /// Σ over groups of `min(primary_open, slack)`.
    capped_open: u64,
}

impl State {
    fn root(model: &SearchModel, primary: &[Option<usize>]) -> Self {
        let n = model.space.len();
        let groups = model.groups.len();
        let mut state = Self {
            values: vec![false; n],
            count: vec![0; groups],
            open: vec![0; groups],
            soft_broken: vec![0; model.soft.len()],
            hard_broken: 0,
            soft_alive: model.soft.iter().map(|s| s.weight).sum(),
            assigned_true: 0,
            primary_open: vec![0; groups],
            unbounded_open: 0,
            capped_open: 0,
        };

        for (g, group) in model.groups.iter().enumerate() {
            state.open[g] = group.vars.iter().filter(|&&v| !model.fixed[v]).count() as u32;
        }
        for v in (0..n).filter(|&v| !model.fixed[v]) {
            match primary[v] {
                Some(g) => state.primary_open[g] += 1,
                None => state.unbounded_open += 1,
            }
        }
        for g in 0..groups {
            state.capped_open += state.cap_term(model, g);
            if state.is_broken(model, g) {
                state.mark_broken(model, model.groups[g].owner);
            }
        }
        state
    }

    #[inline]
    fn is_broken(&self, model: &SearchModel, g: usize) -> bool {
        model.groups[g].is_broken(self.count[g], self.open[g])
    }

    /// Contribution of group `g` to the coverage bound.
    #[inline]
    fn cap_term(&self, model: &SearchModel, g: usize) -> u64 {
        match model.groups[g].max {
            Some(max) => self.primary_open[g].min(max.saturating_sub(self.count[g])) as u64,
            None => 0,
        }
    }

    fn mark_broken(&mut self, model: &SearchModel, owner: Owner) {
        match owner {
            Owner::Hard => self.hard_broken += 1,
            Owner::Soft(i) => {
                self.soft_broken[i] += 1;
                if self.soft_broken[i] == 1 {
                    self.soft_alive -= model.soft[i].weight;
                }
            }
        }
    }

    fn mark_repaired(&mut self, model: &SearchModel, owner: Owner) {
        match owner {
            Owner::Hard => self.hard_broken -= 1,
            Owner::Soft(i) => {
                self.soft_broken[i] -= 1;
                if self.soft_broken[i] == 0 {
                    self.soft_alive += model.soft[i].weight;
                }
            }
        }
    }

    fn set(&mut self, model: &SearchModel, primary: &[Option<usize>], var: usize, value: bool) {
        self.values[var] = value;
        if value {
            self.assigned_true += 1;
        }
        if primary[var].is_none() {
            self.unbounded_open -= 1;
        }
        for &g in &model.var_groups[var] {
            let was = self.is_broken(model, g);
            self.capped_open -= self.cap_term(model, g);
            self.open[g] -= 1;
            if value {
                self.count[g] += 1;
            }
            if primary[var] == Some(g) {
                self.primary_open[g] -= 1;
            }
            self.capped_open += self.cap_term(model, g);
            if !was && self.is_broken(model, g) {
                self.mark_broken(model, model.groups[g].owner);
            }
        }
    }

    fn unset(&mut self, model: &SearchModel, primary: &[Option<usize>], var: usize) {
        let value = self.values[var];
        for &g in &model.var_groups[var] {
            let was = self.is_broken(model, g);
            self.capped_open -= self.cap_term(model, g);
            self.open[g] += 1;
            if value {
                self.count[g] -= 1;
            }
            if primary[var] == Some(g) {
                self.primary_open[g] += 1;
            }
            self.capped_open += self.cap_term(model, g);
            if was && !self.is_broken(model, g) {
                self.mark_repaired(model, model.groups[g].owner);
            }
        }
        if primary[var].is_none() {
            self.unbounded_open += 1;
        }
        if value {
            self.assigned_true -= 1;
        }
        self.values[var] = false;
    }

    fn score(&self) -> Score {
        Score {
            soft: self.soft_alive,
            coverage: self.assigned_true,
        }
    }

    fn upper_bound(&self) -> Score {
        Score {
            soft: self.soft_alive,
            coverage: self.assigned_true + self.unbounded_open + self.capped_open,
        }
    }
}

/// Picks for each free variable the hard group with the smallest maximum.
fn primary_groups(model: &SearchModel) -> Vec<Option<usize>> {
    (0..model.space.len())
        .map(|v| {
            if model.fixed[v] {
                return None;
            }
            model.var_groups[v]
                .iter()
                .copied()
                .filter(|&g| model.groups[g].owner == Owner::Hard)
                .filter_map(|g| model.groups[g].max.map(|m| (m, g)))
                .min()
                .map(|(_, g)| g)
        })
        .collect()
}

/// State shared by all subtree workers.
struct Search<'m> {
    model: &'m SearchModel,
    primary: Vec<Option<usize>>,
    free: Vec<usize>,
    best: Mutex<Option<Incumbent>>,
    nodes: AtomicU64,
    stop: AtomicBool,
    node_limit: u64,
    deadline: Option<Instant>,
}

impl<'m> Search<'m> {
    fn snapshot(&self) -> Bound {
        self.best
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|b| (b.score, b.branch))
    }

    fn offer(&self, state: &State, branch: usize, bound: &mut Bound) {
        let score = state.score();
        let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
        let replace = match best.as_ref() {
            None => true,
            Some(b) => score > b.score || (score == b.score && branch < b.branch),
        };
        if replace {
            *best = Some(Incumbent {
                score,
                branch,
                values: state.values.clone(),
            });
        }
        *bound = best.as_ref().map(|b| (b.score, b.branch));
    }

    /// Counts a node; returns false when the budget is spent.
    fn tick(&self, bound: &mut Bound) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return false;
        }
        let nodes = self.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        if nodes > self.node_limit {
            self.stop.store(true, Ordering::Relaxed);
            return false;
        }
        if nodes % CHECK_INTERVAL == 0 {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                self.stop.store(true, Ordering::Relaxed);
                return false;
            }
            *bound = self.snapshot();
        }
        true
    }

    fn explore(&self, root: &State, branch: usize, depth: usize) {
        let mut state = root.clone();
        for j in 0..depth {
            let value = (branch >> (depth - 1 - j)) & 1 == 0;
            state.set(self.model, &self.primary, self.free[j], value);
            if state.hard_broken > 0 {
                return;
            }
        }
        let mut bound = self.snapshot();
        self.dfs(&mut state, depth, branch, &mut bound);
    }

    fn dfs(&self, state: &mut State, pos: usize, branch: usize, bound: &mut Bound) {
        if !self.tick(bound) || !can_improve(state.upper_bound(), branch, bound) {
            return;
        }
        if pos == self.free.len() {
            self.offer(state, branch, bound);
            return;
        }

        let var = self.free[pos];
        for value in [true, false] {
            state.set(self.model, &self.primary, var, value);
            if state.hard_broken == 0 {
                self.dfs(state, pos + 1, branch, bound);
            }
            state.unset(self.model, &self.primary, var);
            if self.stop.load(Ordering::Relaxed) {
                return;
            }
        }
    }
}

#[cfg(feature = "parallel")]
fn for_each_branch(parallel: bool, branches: usize, f: impl Fn(usize) + Send + Sync) {
    use rayon::prelude::*;
    if parallel {
        (0..branches).into_par_iter().for_each(f);
    } else {
        (0..branches).for_each(f);
    }
}

#[cfg(not(feature = "parallel"))]
fn for_each_branch(_parallel: bool, branches: usize, f: impl Fn(usize)) {
    (0..branches).for_each(f);
}

/// Runs the search under the configured budget.
pub(crate) fn run(model: &SearchModel, config: &SolverConfig, started: Instant) -> SearchOutcome {
    let depth = if config.runs_parallel() {
        config.split_depth
    } else {
        0
    };
    run_split(model, config, started, depth)
}

/// Runs the search over `2^depth` subtrees; `depth` is capped by the
/// number of free variables.
fn run_split(
    model: &SearchModel,
    config: &SolverConfig,
    started: Instant,
    depth: usize,
) -> SearchOutcome {
    let primary = primary_groups(model);
    let free: Vec<usize> = (0..model.space.len()).filter(|&v| !model.fixed[v]).collect();
    let root = State::root(model, &primary);

    let parallel = config.runs_parallel();
    let depth = depth.min(free.len()).min(MAX_SPLIT_DEPTH);

    let search = Search {
        model,
        primary,
        free,
        best: Mutex::new(None),
        nodes: AtomicU64::new(0),
        stop: AtomicBool::new(false),
        node_limit: config.node_limit,
        deadline: config
            .time_limit_ms
            .map(|ms| started + Duration::from_millis(ms)),
    };

    if root.hard_broken == 0 {
        for_each_branch(parallel, 1 << depth, |branch| {
            search.explore(&root, branch, depth)
        });
    }

    SearchOutcome {
        nodes: search.nodes.load(Ordering::Relaxed).min(search.node_limit),
        exhausted: search.stop.load(Ordering::Relaxed),
        best: search
            .best
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompiledConstraint, ConstraintKind, Coverage, Employee, SlotTime, StoreContext};
    use serde_json::json;

    fn context(employees: usize, slots: &[&str]) -> StoreContext {
        StoreContext::new(
            (0..employees)
                .map(|i| Employee::new(format!("e{i}"), "x").with_role("staff"))
                .collect(),
            vec!["Mon".into()],
            slots.iter().map(|s| s.parse::<SlotTime>().unwrap()).collect(),
        )
        .unwrap()
    }

    fn limit(max: u32, hard: bool) -> CompiledConstraint {
        CompiledConstraint {
            rule_id: "limit".into(),
            kind: ConstraintKind::SumLimit,
            scope: "employee".into(),
            filter: Default::default(),
            params: json!({"max_hours": max}).as_object().cloned().unwrap(),
            hard,
            priority: 0,
        }
    }

    fn config() -> SolverConfig {
        SolverConfig::default().with_parallel(false)
    }

    #[test]
    fn test_unconstrained_assigns_everything() {
        let model = SearchModel::build(&context(2, &["09:00", "12:00"]), &[]).unwrap();
        let out = run(&model, &config(), Instant::now());
        let best = out.best.unwrap();
        assert!(!out.exhausted);
        assert_eq!(best.values, vec![true; 4]);
        assert_eq!(best.score.coverage, 4);
    }

    #[test]
    fn test_limit_bound_prunes_quickly() {
        let ctx = context(3, &["08:00", "09:00", "10:00", "11:00", "12:00", "13:00"]);
        let model = SearchModel::build(&ctx, &[limit(2, true)]).unwrap();
        let out = run(&model, &config(), Instant::now());
        assert!(!out.exhausted);
        let best = out.best.unwrap();
        assert_eq!(best.score.coverage, 6);
        // First-found tie-break: each employee takes the two earliest slots.
        assert!(best.values[0] && best.values[1] && !best.values[2]);
        assert!(out.nodes < 200, "explored {} nodes", out.nodes);
    }

    #[test]
    fn test_infeasible_root() {
        let ctx = context(1, &["09:00"]).with_coverage(Coverage::at_least(2));
        let model = SearchModel::build(&ctx, &[]).unwrap();
        let out = run(&model, &config(), Instant::now());
        assert!(out.best.is_none());
        assert!(!out.exhausted);
        assert_eq!(out.nodes, 0);
    }

    #[test]
    fn test_soft_limit_trades_coverage() {
        let mut soft = limit(1, false);
        soft.priority = 5;
        let model = SearchModel::build(&context(1, &["09:00", "12:00"]), &[soft]).unwrap();
        let best = run(&model, &config(), Instant::now()).best.unwrap();
        assert_eq!(best.score.soft, 6);
        assert_eq!(best.values, vec![true, false]);
    }

    #[test]
    fn test_node_budget_returns_best_so_far() {
        let ctx = context(4, &["08:00", "09:00", "10:00", "11:00"]);
        let mut soft = limit(1, false);
        soft.scope = "global".into();
        let model = SearchModel::build(&ctx, &[soft]).unwrap();
        let out = run(&model, &config().with_node_limit(20), Instant::now());
        assert!(out.exhausted);
        assert!(out.best.is_some());
        assert_eq!(out.nodes, 20);
    }

    #[test]
    fn test_split_search_matches_sequential() {
        let ctx = context(3, &["09:00", "12:00", "17:00"]).with_coverage(Coverage::between(1, 2));
        let model = SearchModel::build(&ctx, &[limit(2, true)]).unwrap();
        let seq = run(&model, &config(), Instant::now()).best.unwrap();
        for depth in [1, 3, 5] {
            let split = run_split(&model, &config(), Instant::now(), depth).best.unwrap();
            assert_eq!(seq.values, split.values, "depth {depth}");
            assert_eq!(seq.score, split.score);
        }
    }

    #[test]
    fn test_split_keeps_earliest_of_equal_scores() {
        // Every full assignment of one employee with limit 1 scores the
        // same; the subtree holding the first slot must win.
        let model = SearchModel::build(&context(1, &["09:00", "12:00", "17:00"]), &[limit(1, true)]).unwrap();
        let out = run_split(&model, &config(), Instant::now(), 2);
        let best = out.best.unwrap();
        assert_eq!(best.values, vec![true, false, false]);
        assert_eq!(best.branch, 1);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_search_matches_sequential() {
        let ctx = context(3, &["09:00", "12:00", "17:00"]).with_coverage(Coverage::between(1, 2));
        let model = SearchModel::build(&ctx, &[limit(2, true)]).unwrap();
        let seq = run(&model, &config(), Instant::now()).best.unwrap();
        let par = run(
            &model,
            &config().with_parallel(true).with_split_depth(3),
            Instant::now(),
        )
        .best
        .unwrap();
        assert_eq!(seq.values, par.values);
        assert_eq!(seq.score, par.score);
    }
}
