//! dfa-evolve - Learning deterministic finite automata by evolutionary search.
//!
//! Given a sample of strings known to belong to some language, this crate
//! searches for a small deterministic automaton that accepts them. The search
//! is a generational genetic algorithm with elitism, diversity-aware
//! tournament selection, three crossover strategies, adaptive mutation and
//! stagnation-triggered partial restarts.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: The automaton model, configuration and search result types
//! - `compute`: Automaton execution and the evolutionary search
//!
//! # Example
//!
//! ```rust
//! use dfa_evolve::{
//!     compute::{evaluate, evolution::SearchSession},
//!     schema::{Alphabet, PopulationConfig, SearchConfig},
//! };
//!
//! let config = SearchConfig {
//!     population: PopulationConfig {
//!         size: 10,
//!         max_generations: 5,
//!         ..Default::default()
//!     },
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let targets = ["amo", "amas", "ama"];
//! let mut session = SearchSession::new(Alphabet::from("amos"), &targets, config).unwrap();
//! let result = session.run().unwrap();
//!
//! for target in targets {
//!     let accepted = evaluate(&result.best, target).unwrap();
//!     println!("{target}: {accepted}");
//! }
//! assert!(result.stats.generations <= 5);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{SearchError, SearchSession};
pub use compute::{ExecutionError, evaluate, run};
pub use schema::{Alphabet, Automaton, SearchConfig, SearchResult};
