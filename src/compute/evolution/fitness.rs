//! Fitness scoring of automata against the target sample.
//!
//! The score combines four terms:
//!
//! - weighted recall over the targets, where longer and multi-word targets
//!   weigh more;
//! - a penalty for final states that no accepted target terminates in;
//! - a penalty growing with the state count relative to the sample size;
//! - a small bonus for being structurally distant from the rest of the
//!   population.
//!
//! Two values are reported per individual. The raw score leaves out the
//! diversity bonus and depends only on the automaton and the targets. The
//! composite score includes it and is only meaningful relative to the
//! population it was computed against.

use std::borrow::Borrow;
use std::collections::BTreeSet;

use log::error;
use rayon::prelude::*;

use crate::compute::{ExecutionError, run};
use crate::schema::{Automaton, StateId};

use super::genome::diversity;

const RECALL_WEIGHT: f32 = 0.95;
const VALIDITY_PENALTY_SCALE: f32 = 1.5;
const MAX_COMPLEXITY_PENALTY: f32 = 0.15;
const DIVERSITY_BONUS_WEIGHT: f32 = 0.05;

/// Scores of a single individual.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitnessScore {
    /// Score without the diversity bonus.
    pub raw: f32,
    /// Score with the diversity bonus.
    pub composite: f32,
    /// Weighted fraction of targets accepted.
    pub recall: f32,
}

/// Weight of a single target string.
pub fn string_weight(target: &str) -> f32 {
    let len = target.chars().count() as f32;
    let weight = 1.0 + (len / 20.0).min(0.5);
    if target.contains(' ') {
        weight * 1.2
    } else {
        weight
    }
}

/// Scores automata against a fixed target sample.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    targets: Vec<String>,
    weights: Vec<f32>,
    total_weight: f32,
}

impl FitnessEvaluator {
    /// Create a new fitness evaluator.
    pub fn new<S: AsRef<str>>(targets: &[S]) -> Self {
        let targets: Vec<String> = targets.iter().map(|t| t.as_ref().to_owned()).collect();
        let weights: Vec<f32> = targets.iter().map(|t| string_weight(t)).collect();
        let total_weight = weights.iter().sum();
        Self {
            targets,
            weights,
            total_weight,
        }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Raw fitness: the score with no diversity bonus.
    pub fn fitness(&self, automaton: &Automaton) -> Result<f32, ExecutionError> {
        Ok(self.evaluate::<Automaton>(automaton, &[])?.raw)
    }

    /// Score `automaton`, computing the diversity bonus against `population`.
    ///
    /// An empty population gives no bonus, so `raw == composite`.
    pub fn evaluate<A: Borrow<Automaton>>(
        &self,
        automaton: &Automaton,
        population: &[A],
    ) -> Result<FitnessScore, ExecutionError> {
        if self.targets.is_empty() {
            return Ok(FitnessScore::default());
        }

        let mut accepted_weight = 0.0f32;
        let mut accepting_states: BTreeSet<StateId> = BTreeSet::new();
        for (target, weight) in self.targets.iter().zip(&self.weights) {
            let terminal = run(automaton, target).inspect_err(|err| {
                error!("Execution failed on target {target:?}: {err}");
            })?;
            if let Some(state) = terminal
                && automaton.is_final(state)
            {
                accepted_weight += weight;
                accepting_states.insert(state);
            }
        }

        let recall = accepted_weight / self.total_weight.max(1.0);
        let validity_penalty = validity_penalty(automaton, &accepting_states);
        let complexity_penalty = (automaton.state_count() as f32
            / (4 * self.targets.len().max(1)) as f32)
            .min(MAX_COMPLEXITY_PENALTY);

        let base = RECALL_WEIGHT * recall - complexity_penalty - validity_penalty;
        let bonus = if population.is_empty() {
            0.0
        } else {
            let total: f32 = population
                .iter()
                .map(|other| diversity(automaton, other.borrow()))
                .sum();
            DIVERSITY_BONUS_WEIGHT * total / population.len() as f32
        };

        Ok(FitnessScore {
            raw: base.clamp(0.0, 1.0),
            composite: (base + bonus).clamp(0.0, 1.0),
            recall,
        })
    }

    /// Score every individual against the whole population.
    ///
    /// Results are in population order whether or not evaluation runs on the
    /// rayon pool.
    pub fn evaluate_population<A: Borrow<Automaton> + Sync>(
        &self,
        population: &[A],
        parallel: bool,
    ) -> Result<Vec<FitnessScore>, ExecutionError> {
        if parallel {
            population
                .par_iter()
                .map(|individual| self.evaluate(individual.borrow(), population))
                .collect()
        } else {
            population
                .iter()
                .map(|individual| self.evaluate(individual.borrow(), population))
                .collect()
        }
    }
}

/// Penalty for final states no accepted target ends in.
fn validity_penalty(automaton: &Automaton, accepting_states: &BTreeSet<StateId>) -> f32 {
    let finals = automaton.final_states();
    if finals.is_empty() {
        return 1.0;
    }
    let unused = finals.difference(accepting_states).count();
    (unused as f32 / finals.len() as f32 * VALIDITY_PENALTY_SCALE).clamp(0.0, 1.0)
}

/// Score `automaton` against `targets`, optionally with the diversity bonus
/// against `population`.
pub fn fitness<S: AsRef<str>>(
    automaton: &Automaton,
    targets: &[S],
    population: Option<&[Automaton]>,
) -> Result<f32, ExecutionError> {
    let evaluator = FitnessEvaluator::new(targets);
    let score = evaluator.evaluate(automaton, population.unwrap_or_default())?;
    Ok(score.composite)
}
