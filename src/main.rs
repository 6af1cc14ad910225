//! dfa-evolve CLI - Learn an automaton from a JSON run file.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use dfa_evolve::{
    compute::{evaluate, evolution::SearchSession},
    schema::RunFile,
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json> [result.json]", args[0]);
        eprintln!();
        eprintln!("Learn a deterministic finite automaton from example strings.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json     Path to run file (targets, alphabet, search config)");
        eprintln!("  result.json  Optional path to write the search result");
        eprintln!();
        eprintln!("Example run file is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_run();
        return;
    }

    let run_path = PathBuf::from(&args[1]);
    let result_path = args.get(2).map(PathBuf::from);

    let run = RunFile::load(&run_path).unwrap_or_else(|e| {
        eprintln!("Error loading run file: {}", e);
        std::process::exit(1);
    });

    let targets = run.resolve_targets().unwrap_or_else(|e| {
        eprintln!("Error loading targets: {}", e);
        std::process::exit(1);
    });
    let alphabet = run.resolve_alphabet(&targets);

    let mut session =
        SearchSession::new(alphabet.clone(), &targets, run.search.clone()).unwrap_or_else(|e| {
            eprintln!("Error starting search: {}", e);
            std::process::exit(1);
        });

    let max_generations = run.search.population.max_generations;
    println!("DFA Evolutionary Search");
    println!("=======================");
    println!("Alphabet: {}", alphabet.iter().collect::<String>());
    println!("Targets: {}", targets.len());
    println!("Population: {}", run.search.population.size);
    println!("Max generations: {}", max_generations);
    println!();

    println!("Running search...");
    let start = Instant::now();
    let interval = (max_generations / 10).max(1);

    let result = session
        .run_with_callback(|progress| {
            // Print progress every 10%
            if progress.generation % interval == 0 {
                let elapsed = start.elapsed().as_secs_f32();
                println!(
                    "  Generation {}/{}: best={:.4}, avg={:.4}, diversity={:.3}, restarts={}, {:.1} gen/s",
                    progress.generation,
                    progress.total_generations,
                    progress.best_fitness,
                    progress.avg_fitness,
                    progress.diversity,
                    progress.restarts,
                    progress.generation as f32 / elapsed.max(1e-6)
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Search failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Result:");
    println!("  Best fitness: {:.4}", result.best_fitness);
    println!("  Found in generation: {}", result.best_generation);
    println!("  States: {}", result.best.state_count());
    println!("  Final states: {:?}", result.best.final_states());
    println!("  Stop reason: {:?}", result.stats.stop_reason);
    println!(
        "  Generations: {} ({} restarts)",
        result.stats.generations, result.stats.restarts
    );
    println!(
        "  Time: {:.2}s ({:.1} evaluations/s)",
        result.stats.elapsed_seconds, result.stats.evaluations_per_second
    );
    println!();

    let mut accepted = 0;
    println!("Targets:");
    for target in &targets {
        match evaluate(&result.best, target) {
            Ok(true) => {
                accepted += 1;
                println!("  [x] {}", target);
            }
            Ok(false) => println!("  [ ] {}", target),
            Err(e) => println!("  [!] {} ({})", target, e),
        }
    }
    println!("Accepted {}/{}", accepted, targets.len());

    if let Some(path) = result_path {
        let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
            eprintln!("Error serializing result: {}", e);
            std::process::exit(1);
        });
        fs::write(&path, json).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        });
        println!();
        println!("Result written to {}", path.display());
    }
}

fn print_example_run() {
    let run = RunFile::example();

    println!("Example run file (run.json):");
    println!(
        "{}",
        serde_json::to_string_pretty(&run).unwrap_or_else(|e| e.to_string())
    );
}
