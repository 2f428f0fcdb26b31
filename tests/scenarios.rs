//! End-to-end scheduling scenarios.

use serde_json::{json, Value};
use shift_schedule::models::{
    Coverage, DayHours, Employee, SlotTime, SolveStatus, StoreContext, StoreHours,
};
use shift_schedule::pipeline::{ConflictPolicy, Pipeline, PipelineConfig};
use shift_schedule::solver::SolverConfig;
use shift_schedule::{AssignmentSolver, ConstraintCompiler, RuleValidator};

fn t(s: &str) -> SlotTime {
    s.parse().unwrap()
}

fn context(employees: &[(&str, &str)], days: &[&str], slots: &[&str]) -> StoreContext {
    StoreContext::new(
        employees
            .iter()
            .map(|(id, role)| Employee::new(*id, id.to_uppercase()).with_role(*role))
            .collect(),
        days.iter().map(|d| d.to_string()).collect(),
        slots.iter().map(|s| t(s)).collect(),
    )
    .unwrap()
}

fn rule(id: &str, rule_type: &str, conditions: Value, constraint: Value) -> Value {
    json!({
        "id": id,
        "name": id,
        "type": rule_type,
        "scope": "employee",
        "priority": 1,
        "hard": true,
        "active": true,
        "conditions": conditions,
        "constraint": constraint,
    })
}

fn sequential() -> Pipeline {
    Pipeline::with_config(
        PipelineConfig::default().with_solver(SolverConfig::default().with_parallel(false)),
    )
}

#[test]
fn test_unconstrained_employee_gets_every_slot() {
    let ctx = context(&[("e1", "cashier")], &["Mon"], &["09:00", "17:00"]);
    let report = sequential().run(&[], &ctx).unwrap();
    let schedule = report.schedule.unwrap();

    assert_eq!(schedule.status, SolveStatus::Optimal);
    assert!(schedule.is_assigned("e1", "Mon", t("09:00")));
    assert!(schedule.is_assigned("e1", "Mon", t("17:00")));
    assert_eq!(schedule.assignment_count(), 2);
}

#[test]
fn test_limit_with_required_coverage_splits_slots() {
    let ctx = context(&[("e1", "cashier"), ("e2", "cashier")], &["Mon"], &["09:00", "17:00"])
        .with_coverage(Coverage::at_least(1));
    let rules = vec![rule("one-slot", "LIMIT", json!({}), json!({"max_hours": 1}))];

    let schedule = sequential().run(&rules, &ctx).unwrap().schedule.unwrap();

    assert_eq!(schedule.status, SolveStatus::Optimal);
    assert_eq!(schedule.count_for_employee("e1"), 1);
    assert_eq!(schedule.count_for_employee("e2"), 1);
    assert_eq!(schedule.employees_at("Mon", t("09:00")).len(), 1);
    assert_eq!(schedule.employees_at("Mon", t("17:00")).len(), 1);
}

#[test]
fn test_time_window_for_absent_role_has_no_effect() {
    let ctx = context(&[("e1", "cashier")], &["Mon"], &["09:00"]);
    let bound = rule(
        "cooks-late",
        "TIME_WINDOW",
        json!({"role": "cook"}),
        json!({"start_time": "09:00"}),
    );

    let with = sequential().run(&[bound], &ctx).unwrap().schedule.unwrap();
    let without = sequential().run(&[], &ctx).unwrap().schedule.unwrap();

    assert_eq!(with.assignments, without.assignments);
    assert_eq!(with.status, without.status);
    assert_eq!(with.score, without.score);
}

#[test]
fn test_unfillable_coverage_is_infeasible_not_error() {
    let ctx = context(&[("e1", "cashier")], &["Mon"], &["09:00"]).with_coverage(Coverage::at_least(1));
    let rules = vec![rule("none", "LIMIT", json!({}), json!({"max_hours": 0}))];

    let schedule = sequential().run(&rules, &ctx).unwrap().schedule.unwrap();

    assert_eq!(schedule.status, SolveStatus::Infeasible);
    assert!(schedule.assignments.is_empty());
}

#[test]
fn test_start_time_blocks_earlier_slots_for_matching_role() {
    let ctx = context(
        &[("e1", "cashier"), ("e2", "cook")],
        &["Mon", "Tue"],
        &["08:00", "10:00", "12:00", "16:00"],
    );
    let rules = vec![rule(
        "cashier-noon",
        "TIME_WINDOW",
        json!({"role": "cashier"}),
        json!({"start_time": "12:00"}),
    )];

    let schedule = sequential().run(&rules, &ctx).unwrap().schedule.unwrap();

    for record in schedule.slots_for_employee("e1") {
        assert!(record.time >= t("12:00"), "e1 assigned at {}", record.time);
    }
    assert_eq!(schedule.count_for_employee("e1"), 4);
    assert_eq!(schedule.count_for_employee("e2"), 8);
}

#[test]
fn test_coverage_rule_caps_and_requires_staff() {
    let ctx = context(
        &[("e1", "cashier"), ("e2", "cashier"), ("e3", "cashier")],
        &["Mon"],
        &["09:00", "13:00"],
    );
    let rules = vec![
        rule("two-max", "COVERAGE", json!({}), json!({"min": 1, "max": 2})),
        rule("short", "LIMIT", json!({"employee_id": "e1"}), json!({"max_hours": 0})),
    ];

    let schedule = sequential().run(&rules, &ctx).unwrap().schedule.unwrap();

    assert_eq!(schedule.status, SolveStatus::Optimal);
    assert_eq!(schedule.count_for_employee("e1"), 0);
    assert_eq!(schedule.employees_at("Mon", t("09:00")).len(), 2);
    assert_eq!(schedule.employees_at("Mon", t("13:00")).len(), 2);
}

#[test]
fn test_availability_excludes_listed_slots() {
    let ctx = context(&[("e1", "cashier")], &["Mon", "Tue"], &["09:00", "13:00"]);
    let rules = vec![
        rule("off-tue", "AVAILABILITY", json!({"employee_id": "e1", "day": "Tue"}), json!({})),
        rule(
            "no-mornings",
            "AVAILABILITY",
            json!({"employee_id": "e1"}),
            json!({"slots": ["09:00"]}),
        ),
    ];

    let schedule = sequential().run(&rules, &ctx).unwrap().schedule.unwrap();

    assert_eq!(schedule.assignment_count(), 1);
    assert!(schedule.is_assigned("e1", "Mon", t("13:00")));
}

#[test]
fn test_soft_limit_outweighs_coverage() {
    let ctx = context(&[("e1", "cashier")], &["Mon"], &["09:00", "17:00"]);
    let mut soft = rule("prefer-one", "LIMIT", json!({}), json!({"max_hours": 1}));
    soft["hard"] = json!(false);

    let schedule = sequential().run(&[soft], &ctx).unwrap().schedule.unwrap();

    assert_eq!(schedule.status, SolveStatus::Optimal);
    assert_eq!(schedule.assignment_count(), 1);
    assert!(schedule.is_assigned("e1", "Mon", t("09:00")));
    assert!(schedule.violations.is_empty());
}

#[test]
fn test_soft_constraint_violated_when_hard_forces_it() {
    let ctx = context(&[("e1", "cashier")], &["Mon"], &["09:00", "17:00"])
        .with_coverage(Coverage::at_least(1));
    let mut soft = rule("prefer-one", "LIMIT", json!({}), json!({"max_hours": 1}));
    soft["hard"] = json!(false);

    let schedule = sequential().run(&[soft], &ctx).unwrap().schedule.unwrap();

    assert_eq!(schedule.assignment_count(), 2);
    assert_eq!(schedule.violations.len(), 1);
    assert_eq!(schedule.violations[0].rule_id, "prefer-one");
}

#[test]
fn test_day_scoped_limit() {
    let ctx = context(&[("e1", "cashier")], &["Mon", "Tue"], &["09:00", "13:00", "17:00"]);
    let mut daily = rule("daily", "LIMIT", json!({}), json!({"max_hours": 1}));
    daily["scope"] = json!("day");

    let schedule = sequential().run(&[daily], &ctx).unwrap().schedule.unwrap();

    assert_eq!(schedule.assignment_count(), 2);
    assert_eq!(
        schedule.slots_for_employee("e1").iter().filter(|r| r.day == "Mon").count(),
        1
    );
}

#[test]
fn test_global_limit_counts_all_employees() {
    let ctx = context(&[("e1", "cashier"), ("e2", "cashier")], &["Mon"], &["09:00", "17:00"]);
    let mut cap = rule("payroll", "LIMIT", json!({}), json!({"max_hours": 3}));
    cap["scope"] = json!("global");

    let schedule = sequential().run(&[cap], &ctx).unwrap().schedule.unwrap();

    assert_eq!(schedule.assignment_count(), 3);
}

#[test]
fn test_inactive_rule_is_ignored() {
    let ctx = context(&[("e1", "cashier")], &["Mon"], &["09:00", "17:00"]);
    let mut limit = rule("off", "LIMIT", json!({}), json!({"max_hours": 0}));
    limit["active"] = json!(false);

    let report = sequential().run(&[limit], &ctx).unwrap();
    assert!(report.constraints.is_empty());
    assert_eq!(report.schedule.unwrap().assignment_count(), 2);
}

#[test]
fn test_conflicting_rules_abort_when_configured() {
    let ctx = context(&[("e1", "cashier")], &["Mon"], &["09:00"]);
    let rules = vec![
        rule("a", "LIMIT", json!({"role": "cashier", "day": "Mon"}), json!({"max_hours": 1})),
        rule("b", "LIMIT", json!({"day": "Mon", "role": "cashier"}), json!({"max_hours": 2})),
    ];
    let pipeline = Pipeline::with_config(
        PipelineConfig::default().with_conflict_policy(ConflictPolicy::Abort),
    );

    let report = pipeline.run(&rules, &ctx).unwrap();
    assert_eq!(report.conflicts.messages(), vec!["Conflict between a and b".to_string()]);
    assert!(report.schedule.is_none());
}

#[test]
fn test_store_hours_drive_slots() {
    let hours = StoreHours::new()
        .with_day(DayHours::new("Mon", "09:00", "17:00").unwrap())
        .with_day(DayHours::new("Tue", "10:00", "17:00").unwrap());
    let ctx = StoreContext::from_store_hours(
        vec![Employee::new("e1", "Ana").with_role("cashier")],
        &hours,
    )
    .unwrap();
    assert_eq!(ctx.slots(), &[t("09:00"), t("10:00"), t("17:00")]);

    let schedule = AssignmentSolver::new().solve(&ctx, &[]).unwrap();
    assert_eq!(schedule.assignment_count(), 6);
}

#[test]
fn test_stages_compose_manually() {
    let ctx = context(&[("e1", "cashier"), ("e2", "cook")], &["Mon"], &["09:00", "17:00"]);
    let raw = rule("cook-off", "AVAILABILITY", json!({"role": "cook"}), json!({}));

    let validated = RuleValidator::new().validate(&raw).unwrap();
    let constraints = ConstraintCompiler::new().compile(&[validated], &ctx).unwrap();
    let schedule = AssignmentSolver::new().solve(&ctx, &constraints).unwrap();

    assert_eq!(schedule.count_for_employee("e2"), 0);
    assert_eq!(schedule.count_for_employee("e1"), 2);
    assert_eq!(schedule.stats.variables, 4);
    assert_eq!(schedule.stats.fixed, 2);
}

#[test]
fn test_node_budget_reports_feasible_or_unknown() {
    let employees: Vec<(String, &str)> = (0..6).map(|i| (format!("e{i}"), "cashier")).collect();
    let refs: Vec<(&str, &str)> = employees.iter().map(|(id, r)| (id.as_str(), *r)).collect();
    let ctx = context(&refs, &["Mon", "Tue", "Wed"], &["08:00", "12:00", "16:00", "20:00"])
        .with_coverage(Coverage::between(1, 2));
    let mut soft = rule("fair", "LIMIT", json!({}), json!({"max_hours": 2}));
    soft["hard"] = json!(false);
    let constraints = ConstraintCompiler::new()
        .compile(&[RuleValidator::new().validate(&soft).unwrap()], &ctx)
        .unwrap();

    let solver = AssignmentSolver::with_config(
        SolverConfig::default().with_node_limit(50).with_parallel(false),
    );
    let schedule = solver.solve(&ctx, &constraints).unwrap();

    assert!(matches!(schedule.status, SolveStatus::Feasible | SolveStatus::Unknown));
    assert!(schedule.stats.nodes <= 51);
}
