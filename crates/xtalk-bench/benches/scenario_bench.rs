//! Benchmarks for batch construction and fidelity reduction
//!
//! Run with: cargo bench -p xtalk-bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use xtalk_bench::{
    DdSequence, ExperimentConfig, FidelityEvaluator, InitialState, RawResult, ResolvedLayouts,
    ScenarioBuilder, ScenarioKind, ScenarioSelection, Session,
};
use xtalk_hal::Counts;
use xtalk_ir::InstructionDurations;

fn config(attacks: u32) -> ExperimentConfig {
    let unbuffered = (0..3 + 2 * attacks).collect();
    let buffered = (100..103 + 3 * attacks).collect();
    ExperimentConfig::new(
        attacks,
        unbuffered,
        buffered,
        InitialState::Plus,
        DdSequence::Xyxy,
    )
    .unwrap()
}

/// Benchmark building one attack sweep
fn bench_scenario_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario_build");

    for attacks in &[1u32, 2, 4] {
        let config = config(*attacks);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let builder = ScenarioBuilder::new(&config, &layouts, InstructionDurations::default());
        group.bench_with_input(
            BenchmarkId::new("attack_with_dd_and_spacing", attacks),
            &builder,
            |b, builder| {
                b.iter(|| builder.build(black_box(ScenarioKind::AttackWithDdAndSpacing)));
            },
        );
    }

    group.finish();
}

/// Benchmark building the full 182-circuit batch
fn bench_full_batch(c: &mut Criterion) {
    c.bench_function("full_batch", |b| {
        b.iter(|| {
            let mut session = Session::new(config(2)).unwrap();
            session.enable_all().unwrap();
            session.build().unwrap().len()
        });
    });
}

/// Benchmark scoring a full run
fn bench_evaluate(c: &mut Criterion) {
    let n = ScenarioSelection::all().num_circuits();
    let distributions = (0..n)
        .map(|i| {
            let mut counts = Counts::new();
            counts.insert("0000000", 900);
            counts.insert(format!("{:07b}", i % 128), 124);
            counts
        })
        .collect();
    let raw = RawResult::new(distributions);
    let evaluator = FidelityEvaluator::for_state(InitialState::Zero);

    c.bench_function("evaluate_182", |b| {
        b.iter(|| evaluator.evaluate(black_box(&raw)));
    });
}

criterion_group!(benches, bench_scenario_build, bench_full_batch, bench_evaluate);

criterion_main!(benches);
