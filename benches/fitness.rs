//! Benchmarks for fitness evaluation and search generations.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use dfa_evolve::{
    compute::evolution::{FitnessEvaluator, SearchRng, SearchSession},
    schema::{Alphabet, Automaton, PopulationConfig, SearchConfig},
};

const TARGETS: [&str; 12] = [
    "amo", "amas", "ama", "amamos", "amáis", "aman", "amaba", "amabas", "amábamos", "amaré",
    "he amado", "habré amado",
];

fn bench_evaluate_population(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_population");
    let alphabet = Alphabet::spanish();
    let evaluator = FitnessEvaluator::new(&TARGETS);

    for size in [20, 50, 100] {
        let mut rng = SearchRng::new(42);
        let population: Vec<Automaton> = (0..size)
            .map(|_| rng.random_automaton(6, &alphabet, false))
            .collect();

        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(
                BenchmarkId::new(label, size),
                &population,
                |b, population| {
                    b.iter(|| {
                        evaluator
                            .evaluate_population(black_box(population), parallel)
                            .unwrap()
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");

    for size in [20, 50] {
        let config = SearchConfig {
            population: PopulationConfig {
                size,
                max_generations: usize::MAX,
                state_count: Some(6),
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };
        let mut session = SearchSession::new(Alphabet::spanish(), &TARGETS, config).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(session.advance().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate_population, bench_generation);
criterion_main!(benches);
