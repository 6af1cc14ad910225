//! Compute module - Automaton execution and evolutionary search.

mod execution;

pub mod evolution;

pub use execution::*;
