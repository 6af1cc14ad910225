//! Structural mutation of a single automaton.

use rand::seq::index;

use crate::schema::{Automaton, MutationConfig, StateId, TransitionKey};

use super::genome::SearchRng;

/// Applies rate-scaled random edits to automata.
pub struct Mutator<'a> {
    config: &'a MutationConfig,
}

impl<'a> Mutator<'a> {
    pub fn new(config: &'a MutationConfig) -> Self {
        Self { config }
    }

    /// Return a mutated copy of `automaton`; the input is left untouched.
    ///
    /// Redirects `min(|T|, max(2, floor(|T| * rate)))` distinct transitions,
    /// then may reassign the initial state and toggle final-state
    /// membership. The final set is never left empty.
    pub fn mutate(&self, rng: &mut SearchRng, automaton: &Automaton, rate: f32) -> Automaton {
        let mut mutated = automaton.clone();
        let states: Vec<StateId> = mutated.states().iter().copied().collect();
        if states.is_empty() {
            return mutated;
        }

        let keys: Vec<TransitionKey> = mutated.transitions().keys().copied().collect();
        if !keys.is_empty() {
            let count = ((keys.len() as f32 * rate).floor() as usize)
                .max(2)
                .min(keys.len());
            for i in index::sample(rng.inner(), keys.len(), count) {
                let key = keys[i];
                let current = mutated.transitions[&key];
                let target = if rng.chance(self.config.any_target_chance) {
                    states[rng.below(states.len())]
                } else {
                    let others: Vec<StateId> =
                        states.iter().copied().filter(|&s| s != current).collect();
                    if others.is_empty() {
                        current
                    } else {
                        others[rng.below(others.len())]
                    }
                };
                mutated.transitions.insert(key, target);
            }
        }

        if rng.chance(self.config.initial_state_chance) {
            mutated.initial = states[rng.below(states.len())];
        }

        if rng.chance(self.config.final_toggle_chance) {
            for &state in &states {
                if rng.chance(self.config.final_toggle_per_state) && !mutated.remove_final(state) {
                    mutated.add_final(state);
                }
            }
            if mutated.final_states().is_empty() {
                mutated.add_final(states[rng.below(states.len())]);
            }
        }

        debug_assert!(mutated.validate().is_ok());
        mutated
    }
}
