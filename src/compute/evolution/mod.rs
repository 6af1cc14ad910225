//! Evolutionary search for automata that recognize a target sample.
//!
//! # Overview
//!
//! The search system consists of:
//!
//! - **Genome Operations** (`genome`): Seeded RNG, random automata, diversity
//! - **Fitness** (`fitness`): Weighted recall with validity and size penalties
//! - **Selection** (`selection`): Elitism plus diversity-aware tournaments
//! - **Crossover** (`crossover`): One-point, uniform and state-swap strategies
//! - **Mutation** (`mutation`): Rate-scaled transition, initial and final edits
//! - **Search** (`search`): The generational loop with partial restarts
//!
//! # Example
//!
//! ```rust,no_run
//! use dfa_evolve::compute::evolution::SearchSession;
//! use dfa_evolve::schema::{Alphabet, SearchConfig};
//!
//! let targets = ["amo", "amas", "ama"];
//! let mut session =
//!     SearchSession::new(Alphabet::from("amos"), &targets, SearchConfig::default()).unwrap();
//!
//! let result = session
//!     .run_with_callback(|progress| {
//!         println!(
//!             "Generation {}: best fitness = {:.3}",
//!             progress.generation, progress.best_fitness
//!         );
//!     })
//!     .unwrap();
//!
//! println!("Best fitness: {:.3}", result.best_fitness);
//! println!("Found in generation {}", result.best_generation);
//! ```

mod crossover;
mod fitness;
mod genome;
mod mutation;
mod search;
mod selection;

pub use crossover::{CrossoverStrategy, Recombinator};
pub use fitness::{FitnessEvaluator, FitnessScore, fitness, string_weight};
pub use genome::{SearchRng, diversity, population_diversity};
pub use mutation::Mutator;
pub use search::{SearchError, SearchSession};
pub use selection::{Selection, Selector};
