//! Automaton execution.

use crate::schema::{Automaton, StateId};

/// Execution failures. These indicate a broken transition function, never a
/// rejected input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("No transition from state {state} on symbol {symbol:?}")]
    MissingTransition { state: StateId, symbol: char },
}

/// Walk `input` from the initial state.
///
/// Returns the state reached after the last symbol, or `None` if the input
/// contains a symbol outside the automaton's alphabet.
pub fn run(automaton: &Automaton, input: &str) -> Result<Option<StateId>, ExecutionError> {
    let mut state = automaton.initial_state();
    for symbol in input.chars() {
        if !automaton.alphabet().contains(symbol) {
            return Ok(None);
        }
        state = automaton
            .target(state, symbol)
            .ok_or(ExecutionError::MissingTransition { state, symbol })?;
    }
    Ok(Some(state))
}

/// Whether `automaton` accepts `input`.
pub fn evaluate(automaton: &Automaton, input: &str) -> Result<bool, ExecutionError> {
    Ok(run(automaton, input)?.is_some_and(|state| automaton.is_final(state)))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::schema::Alphabet;

    /// Accepts words over {a, m, o, s} ending in `o`.
    fn ends_in_o() -> Automaton {
        let alphabet = Alphabet::from("amos");
        let mut transitions = BTreeMap::new();
        for state in 0..2 {
            for symbol in alphabet.iter() {
                transitions.insert((state, symbol), usize::from(symbol == 'o'));
            }
        }
        Automaton::new(
            BTreeSet::from([0, 1]),
            alphabet,
            0,
            BTreeSet::from([1]),
            transitions,
        )
        .unwrap()
    }

    #[test]
    fn test_accepts_and_rejects() {
        let automaton = ends_in_o();
        assert!(evaluate(&automaton, "amo").unwrap());
        assert!(!evaluate(&automaton, "amas").unwrap());
        assert_eq!(run(&automaton, "amas").unwrap(), Some(0));
    }

    #[test]
    fn test_empty_input_uses_initial_state() {
        let automaton = ends_in_o();
        assert_eq!(run(&automaton, "").unwrap(), Some(0));
        assert!(!evaluate(&automaton, "").unwrap());
    }

    #[test]
    fn test_foreign_symbol_rejects() {
        let automaton = ends_in_o();
        assert_eq!(run(&automaton, "amó").unwrap(), None);
        assert!(!evaluate(&automaton, "xo").unwrap());
    }

    #[test]
    fn test_missing_transition_is_error() {
        let mut automaton = ends_in_o();
        automaton.transitions.remove(&(1, 's'));
        assert_eq!(
            evaluate(&automaton, "amos"),
            Err(ExecutionError::MissingTransition {
                state: 1,
                symbol: 's'
            })
        );
    }

    #[test]
    fn test_evaluate_is_pure() {
        let automaton = ends_in_o();
        let before = automaton.clone();
        for _ in 0..3 {
            assert!(evaluate(&automaton, "somo").unwrap());
        }
        assert_eq!(automaton, before);
    }
}
