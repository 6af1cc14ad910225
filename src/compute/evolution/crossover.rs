//! Recombination of two parent automata.
//!
//! Parents may have different state sets after a partial restart, so only
//! *exchangeable* keys take part: keys defined in both parents whose incoming
//! target is a state of the receiving child. Children therefore stay total
//! and closed over their own states.

use rand::distributions::{Distribution, WeightedIndex};

use crate::schema::{Automaton, CrossoverConfig, StateId, TransitionKey};

use super::genome::SearchRng;

/// Crossover strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverStrategy {
    /// Swap every key at or after a random split point.
    OnePoint,
    /// Swap each key independently.
    Uniform,
    /// Rename transition targets between a few shared states.
    StateSwap,
}

const STRATEGIES: [CrossoverStrategy; 3] = [
    CrossoverStrategy::OnePoint,
    CrossoverStrategy::Uniform,
    CrossoverStrategy::StateSwap,
];

/// Produces two children from two parents.
pub struct Recombinator<'a> {
    config: &'a CrossoverConfig,
}

impl<'a> Recombinator<'a> {
    pub fn new(config: &'a CrossoverConfig) -> Self {
        Self { config }
    }

    /// Weighted choice of strategy.
    pub fn choose_strategy(&self, rng: &mut SearchRng) -> CrossoverStrategy {
        let weights = [
            self.config.one_point_weight,
            self.config.uniform_weight,
            self.config.state_swap_weight,
        ];
        WeightedIndex::new(weights)
            .map(|dist| STRATEGIES[dist.sample(rng.inner())])
            .unwrap_or(CrossoverStrategy::OnePoint)
    }

    /// Recombine with a randomly chosen strategy.
    pub fn recombine(
        &self,
        rng: &mut SearchRng,
        parent1: &Automaton,
        parent2: &Automaton,
    ) -> (Automaton, Automaton) {
        let strategy = self.choose_strategy(rng);
        self.recombine_with(rng, strategy, parent1, parent2)
    }

    /// Recombine with a fixed strategy, then maybe swap final-state sets.
    pub fn recombine_with(
        &self,
        rng: &mut SearchRng,
        strategy: CrossoverStrategy,
        parent1: &Automaton,
        parent2: &Automaton,
    ) -> (Automaton, Automaton) {
        let mut child1 = parent1.clone();
        let mut child2 = parent2.clone();

        match strategy {
            CrossoverStrategy::OnePoint => {
                let keys = exchangeable_keys(parent1, parent2);
                if keys.len() > 1 {
                    let split = 1 + rng.below(keys.len() - 1);
                    swap_targets(&mut child1, &mut child2, parent1, parent2, &keys[split..]);
                }
            }
            CrossoverStrategy::Uniform => {
                let keys = exchangeable_keys(parent1, parent2);
                let exchange = rng.uniform(self.config.uniform_exchange_range);
                let chosen: Vec<TransitionKey> = keys
                    .into_iter()
                    .filter(|_| rng.chance(exchange))
                    .collect();
                swap_targets(&mut child1, &mut child2, parent1, parent2, &chosen);
            }
            CrossoverStrategy::StateSwap => {
                let shared: Vec<StateId> = parent1
                    .states()
                    .intersection(parent2.states())
                    .copied()
                    .collect();
                if !shared.is_empty() {
                    let max_pairs = (shared.len() / 3).clamp(1, 3);
                    let pairs = 1 + rng.below(max_pairs);
                    for _ in 0..pairs {
                        let a = shared[rng.below(shared.len())];
                        let b = shared[rng.below(shared.len())];
                        rename_targets(&mut child1, a, b);
                        rename_targets(&mut child2, b, a);
                    }
                }
            }
        }

        if rng.chance(self.config.final_set_swap_chance)
            && parent2.final_states().is_subset(child1.states())
            && parent1.final_states().is_subset(child2.states())
        {
            std::mem::swap(&mut child1.finals, &mut child2.finals);
        }

        debug_assert!(child1.validate().is_ok());
        debug_assert!(child2.validate().is_ok());
        (child1, child2)
    }
}

/// Keys both parents define whose targets are valid in the other child.
fn exchangeable_keys(parent1: &Automaton, parent2: &Automaton) -> Vec<TransitionKey> {
    parent1
        .transitions()
        .iter()
        .filter_map(|(key, &target1)| {
            let target2 = parent2.target(key.0, key.1)?;
            (parent1.states().contains(&target2) && parent2.states().contains(&target1))
                .then_some(*key)
        })
        .collect()
}

fn swap_targets(
    child1: &mut Automaton,
    child2: &mut Automaton,
    parent1: &Automaton,
    parent2: &Automaton,
    keys: &[TransitionKey],
) {
    for key in keys {
        if let (Some(t1), Some(t2)) = (parent1.target(key.0, key.1), parent2.target(key.0, key.1)) {
            child1.transitions.insert(*key, t2);
            child2.transitions.insert(*key, t1);
        }
    }
}

/// Point every transition targeting `from` at `to`.
fn rename_targets(automaton: &mut Automaton, from: StateId, to: StateId) {
    for target in automaton.transitions.values_mut() {
        if *target == from {
            *target = to;
        }
    }
}
