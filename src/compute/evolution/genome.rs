//! Random automaton construction and structural distance.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

use rand::prelude::*;

use crate::schema::{Alphabet, Automaton, StateId};

/// Random number generator wrapper shared by every stochastic operator.
///
/// A search owns exactly one of these, so a fixed seed reproduces a run.
pub struct SearchRng {
    rng: StdRng,
}

impl SearchRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Bernoulli trial with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.rng.r#gen::<f32>() < p
    }

    /// Uniform index in `0..n`. `n` must be non-zero.
    pub fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Uniform value in `[lo, hi]`.
    pub fn uniform(&mut self, bounds: (f32, f32)) -> f32 {
        if bounds.0 >= bounds.1 {
            return bounds.0;
        }
        self.rng.gen_range(bounds.0..=bounds.1)
    }

    pub(crate) fn inner(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Build a random automaton over `alphabet` with states `0..num_states`.
    ///
    /// Every `(state, symbol)` pair gets an independent uniform target. The
    /// final set is a uniform subset of size `1..=max(1, n / 3)`.
    pub fn random_automaton(
        &mut self,
        num_states: usize,
        alphabet: &Alphabet,
        random_initial_state: bool,
    ) -> Automaton {
        let n = num_states.max(1);
        let states: BTreeSet<StateId> = (0..n).collect();

        let initial = if random_initial_state {
            self.below(n)
        } else {
            0
        };

        let mut transitions = BTreeMap::new();
        for &state in &states {
            for symbol in alphabet.iter() {
                transitions.insert((state, symbol), self.below(n));
            }
        }

        let final_count = self.rng.gen_range(1..=(n / 3).max(1));
        let pool: Vec<StateId> = states.iter().copied().collect();
        let finals: BTreeSet<StateId> = pool
            .choose_multiple(&mut self.rng, final_count)
            .copied()
            .collect();

        let automaton = Automaton {
            states,
            alphabet: alphabet.clone(),
            initial,
            finals,
            transitions,
        };
        debug_assert!(automaton.validate().is_ok());
        automaton
    }
}

/// Structural distance between two automata in `[0, 1]`.
///
/// The fraction of `(state, symbol)` keys, over the union of both transition
/// domains, whose target differs. A key defined in only one automaton counts
/// as differing. Either table being empty gives 1.0.
pub fn diversity(a: &Automaton, b: &Automaton) -> f32 {
    let (ta, tb) = (a.transitions(), b.transitions());
    if ta.is_empty() || tb.is_empty() {
        return 1.0;
    }

    let mut common = 0usize;
    let mut equal = 0usize;
    for (key, target) in ta {
        if let Some(other) = tb.get(key) {
            common += 1;
            if other == target {
                equal += 1;
            }
        }
    }

    let union = ta.len() + tb.len() - common;
    (union - equal) as f32 / union.max(1) as f32
}

/// Mean pairwise diversity over all unordered pairs; 0 for fewer than two.
pub fn population_diversity<A: Borrow<Automaton>>(population: &[A]) -> f32 {
    if population.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0f32;
    let mut count = 0usize;
    for i in 0..population.len() {
        for j in (i + 1)..population.len() {
            total += diversity(population[i].borrow(), population[j].borrow());
            count += 1;
        }
    }

    total / count as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_automaton_is_valid() {
        let mut rng = SearchRng::new(42);
        let alphabet = Alphabet::from("amos");

        for n in [0, 1, 2, 4, 9] {
            let automaton = rng.random_automaton(n, &alphabet, true);
            assert!(automaton.validate().is_ok());
            assert_eq!(automaton.state_count(), n.max(1));
            assert_eq!(automaton.transitions().len(), n.max(1) * alphabet.len());
            assert!(automaton.final_states().len() <= (n.max(1) / 3).max(1));
        }
    }

    #[test]
    fn test_fixed_initial_state() {
        let mut rng = SearchRng::new(7);
        let alphabet = Alphabet::from("ab");
        for _ in 0..10 {
            assert_eq!(rng.random_automaton(5, &alphabet, false).initial_state(), 0);
        }
    }

    #[test]
    fn test_same_seed_same_automaton() {
        let alphabet = Alphabet::from("amos");
        let a = SearchRng::new(3).random_automaton(4, &alphabet, false);
        let b = SearchRng::new(3).random_automaton(4, &alphabet, false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_diversity_self_is_zero() {
        let mut rng = SearchRng::new(42);
        let a = rng.random_automaton(4, &Alphabet::from("amos"), false);
        assert_eq!(diversity(&a, &a), 0.0);
    }

    #[test]
    fn test_diversity_symmetric() {
        let mut rng = SearchRng::new(42);
        let alphabet = Alphabet::from("amos");
        let a = rng.random_automaton(4, &alphabet, false);
        let b = rng.random_automaton(6, &alphabet, false);
        assert_eq!(diversity(&a, &b), diversity(&b, &a));
        assert!((0.0..=1.0).contains(&diversity(&a, &b)));
    }

    #[test]
    fn test_disjoint_tables_fully_diverse() {
        let mut rng = SearchRng::new(42);
        let a = rng.random_automaton(3, &Alphabet::from("ab"), false);
        let b = rng.random_automaton(3, &Alphabet::from("xy"), false);
        assert_eq!(diversity(&a, &b), 1.0);
    }

    #[test]
    fn test_empty_table_fully_diverse() {
        let mut rng = SearchRng::new(42);
        let a = rng.random_automaton(3, &Alphabet::default(), false);
        assert_eq!(diversity(&a, &a), 1.0);
    }

    #[test]
    fn test_population_diversity() {
        let mut rng = SearchRng::new(42);
        let alphabet = Alphabet::from("amos");
        let a = rng.random_automaton(4, &alphabet, false);

        assert_eq!(population_diversity::<Automaton>(&[]), 0.0);
        assert_eq!(population_diversity(&[a.clone()]), 0.0);
        assert_eq!(population_diversity(&[a.clone(), a.clone(), a.clone()]), 0.0);

        let b = rng.random_automaton(4, &alphabet, false);
        let expected = diversity(&a, &b) * 2.0 / 3.0;
        let actual = population_diversity(&[&a, &a, &b]);
        assert!((actual - expected).abs() < 1e-6);
    }
}
