//! Criterion benchmarks for the assignment solver.
//!
//! Uses synthetic stores (uniform roles, evenly spaced slots) to measure
//! search cost as the variable space grows.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use shift_schedule::models::{
    CompiledConstraint, Coverage, Employee, Rule, RuleType, SlotTime, StoreContext,
};
use shift_schedule::solver::SolverConfig;
use shift_schedule::{AssignmentSolver, ConstraintCompiler, Pipeline};

const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn store(employees: usize, days: usize, slots: u16) -> StoreContext {
    StoreContext::new(
        (0..employees)
            .map(|i| {
                let role = if i % 3 == 0 { "cook" } else { "cashier" };
                Employee::new(format!("e{i:02}"), format!("Employee {i}")).with_role(role)
            })
            .collect(),
        DAYS[..days].iter().map(|d| d.to_string()).collect(),
        (0..slots)
            .filter_map(|s| SlotTime::from_hm(8 + s * 2, 0))
            .collect(),
    )
    .unwrap()
}

fn rules() -> Vec<Rule> {
    vec![
        Rule::new("weekly-cap", RuleType::Limit).with_param("max_hours", 4),
        Rule::new("daily-cap", RuleType::Limit)
            .with_scope("day")
            .with_param("max_hours", 2),
        Rule::new("cooks-late", RuleType::TimeWindow)
            .with_condition("role", "cook")
            .with_param("start_time", "12:00"),
        Rule::new("light-mondays", RuleType::Limit)
            .soft()
            .with_priority(2)
            .with_condition("day", "Mon")
            .with_param("max_hours", 1),
    ]
}

fn compile(ctx: &StoreContext) -> Vec<CompiledConstraint> {
    ConstraintCompiler::new()
        .compile(&rules(), ctx)
        .unwrap()
}

fn bench_unconstrained(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_unconstrained");

    for &employees in &[4, 8, 16] {
        let ctx = store(employees, 5, 4);
        let solver = AssignmentSolver::with_config(SolverConfig::default().with_parallel(false));
        group.bench_with_input(BenchmarkId::from_parameter(employees), &ctx, |b, ctx| {
            b.iter(|| black_box(solver.solve(black_box(ctx), &[])))
        });
    }
    group.finish();
}

fn bench_limits_with_coverage(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_limits_coverage");
    group.sample_size(10);

    for &employees in &[4, 6, 8] {
        let ctx = store(employees, 3, 4).with_coverage(Coverage::between(1, 3));
        let constraints = compile(&ctx);
        let config = SolverConfig::default()
            .with_node_limit(200_000)
            .with_parallel(false);
        group.bench_with_input(
            BenchmarkId::from_parameter(employees),
            &(ctx, constraints, config),
            |b, (ctx, constraints, config)| {
                let solver = AssignmentSolver::with_config(config.clone());
                b.iter(|| black_box(solver.solve(black_box(ctx), black_box(constraints))))
            },
        );
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let ctx = store(6, 3, 3).with_coverage(Coverage::at_least(1));
    let raw: Vec<_> = rules()
        .iter()
        .map(Rule::to_value)
        .chain([json!({"id": "broken"})])
        .collect();
    let pipeline = Pipeline::new();

    c.bench_function("pipeline_run", |b| {
        b.iter(|| black_box(pipeline.run(black_box(&raw), black_box(&ctx))))
    });
}

criterion_group!(
    benches,
    bench_unconstrained,
    bench_limits_with_coverage,
    bench_pipeline
);
criterion_main!(benches);
