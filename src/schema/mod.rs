//! Schema module - Automaton model, configuration and search result types.

mod automaton;
mod config;
mod evolution;
mod run;

pub use automaton::*;
pub use config::*;
pub use evolution::*;
pub use run::*;
