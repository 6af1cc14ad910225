//! Search bookkeeping types: per-generation records, progress and results.

use serde::{Deserialize, Serialize};

use super::Automaton;

/// Statistics recorded once per generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation index, starting at 0.
    pub generation: usize,
    /// Best raw fitness seen so far in the run.
    pub best_fitness: f32,
    /// Mean raw fitness of this generation's population.
    pub avg_fitness: f32,
    /// Best raw fitness within this generation's population.
    pub generation_best: f32,
    /// Mean pairwise diversity of this generation's population.
    pub diversity: f32,
}

impl GenerationRecord {
    /// Derived error, `1 - best_fitness`.
    pub fn error(&self) -> f32 {
        1.0 - self.best_fitness
    }
}

/// Search history for plotting.
///
/// All series have one entry per recorded generation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchHistory {
    /// Best raw fitness so far, per generation. Non-decreasing.
    pub best_fitness: Vec<f32>,
    /// Average raw fitness per generation.
    pub avg_fitness: Vec<f32>,
    /// `1 - best_fitness` per generation.
    pub error: Vec<f32>,
    /// Population diversity per generation.
    pub diversity: Vec<f32>,
    /// Best raw fitness within each generation.
    pub generation_best: Vec<f32>,
}

impl SearchHistory {
    /// Append one generation.
    pub fn push(&mut self, record: &GenerationRecord) {
        self.best_fitness.push(record.best_fitness);
        self.avg_fitness.push(record.avg_fitness);
        self.error.push(record.error());
        self.diversity.push(record.diversity);
        self.generation_best.push(record.generation_best);
    }

    pub fn len(&self) -> usize {
        self.best_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fitness.is_empty()
    }

    /// The most recent generation's record.
    pub fn last(&self) -> Option<GenerationRecord> {
        let index = self.len().checked_sub(1)?;
        Some(GenerationRecord {
            generation: index,
            best_fitness: self.best_fitness[index],
            avg_fitness: self.avg_fitness[index],
            generation_best: self.generation_best[index],
            diversity: self.diversity[index],
        })
    }
}

/// Current phase of the search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SearchPhase {
    /// Improving, or not yet stagnant for long.
    #[default]
    Running,
    /// No improvement for at least the plateau threshold.
    Stagnating,
    /// A partial restart replaced the population this generation.
    Restarting,
    /// The search is over.
    Terminated,
}

/// Progress update delivered after each generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Generations completed.
    pub generation: usize,
    /// Generation cap.
    pub total_generations: usize,
    /// Best raw fitness seen so far.
    pub best_fitness: f32,
    /// Generation the best automaton was found in.
    pub best_generation: usize,
    /// Average raw fitness of the last evaluated population.
    pub avg_fitness: f32,
    /// Best raw fitness of the last evaluated population.
    pub generation_best: f32,
    /// Diversity of the last evaluated population.
    pub diversity: f32,
    /// Generations since last improvement.
    pub stagnation_count: usize,
    /// Partial restarts performed so far.
    pub restarts: usize,
    /// Current phase.
    pub phase: SearchPhase,
}

/// Final result of a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Best automaton found.
    pub best: Automaton,
    /// Raw fitness of `best`.
    pub best_fitness: f32,
    /// Generation `best` was found in.
    pub best_generation: usize,
    /// Statistics from the run.
    pub stats: SearchStats,
    /// Full history for analysis.
    pub history: SearchHistory,
}

/// Statistics from a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Generations evaluated.
    pub generations: usize,
    /// Total fitness evaluations performed.
    pub total_evaluations: u64,
    /// Partial restarts performed.
    pub restarts: usize,
    /// Average raw fitness of the final population.
    pub final_avg_fitness: f32,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason the search stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Best fitness exceeded the near-optimal threshold.
    NearOptimal,
    /// Still stagnant after spending every restart.
    RestartsExhausted,
    /// Reached maximum generations.
    MaxGenerations,
    /// Cancelled through the cancel handle.
    Cancelled,
    /// Wall-clock limit reached.
    TimeLimit,
}
