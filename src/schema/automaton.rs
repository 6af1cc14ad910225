//! Deterministic finite automaton representation.
//!
//! Transitions are stored as an ordered map keyed by `(state, symbol)`, so
//! whole automata copy cheaply and iteration order is stable across runs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// State identifier.
pub type StateId = usize;

/// Key of a single transition.
pub type TransitionKey = (StateId, char);

/// A fixed, ordered set of input symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<char>", into = "Vec<char>")]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    /// Build an alphabet from any symbols; duplicates are dropped.
    pub fn new<I: IntoIterator<Item = char>>(symbols: I) -> Self {
        let mut symbols: Vec<char> = symbols.into_iter().collect();
        symbols.sort_unstable();
        symbols.dedup();
        Self { symbols }
    }

    /// Every symbol that appears in `words`.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        Self::new(words.iter().flat_map(|w| w.as_ref().chars()))
    }

    /// Lowercase Latin letters plus the Spanish accented vowels and `ñ`.
    pub fn spanish() -> Self {
        Self::new(('a'..='z').chain("áéíóúñ".chars()))
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.symbols.binary_search(&symbol).is_ok()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.symbols.iter().copied()
    }
}

impl From<Vec<char>> for Alphabet {
    fn from(symbols: Vec<char>) -> Self {
        Self::new(symbols)
    }
}

impl From<Alphabet> for Vec<char> {
    fn from(alphabet: Alphabet) -> Self {
        alphabet.symbols
    }
}

impl From<&str> for Alphabet {
    fn from(symbols: &str) -> Self {
        Self::new(symbols.chars())
    }
}

/// A deterministic finite automaton.
///
/// Every value of this type upholds:
/// - the initial state is a member of the state set;
/// - the final-state set is non-empty and contained in the state set;
/// - the transition function is total over states × alphabet, and every
///   target is a member of the state set.
///
/// Construction from raw parts goes through [`Automaton::new`], which checks
/// all of the above. The evolutionary operators in `compute::evolution`
/// build automata that satisfy them by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AutomatonParts", into = "AutomatonParts")]
pub struct Automaton {
    pub(crate) states: BTreeSet<StateId>,
    pub(crate) alphabet: Alphabet,
    pub(crate) initial: StateId,
    pub(crate) finals: BTreeSet<StateId>,
    pub(crate) transitions: BTreeMap<TransitionKey, StateId>,
}

/// Unchecked automaton parts, used at adapter boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomatonParts {
    pub states: BTreeSet<StateId>,
    pub alphabet: Alphabet,
    pub initial: StateId,
    pub finals: BTreeSet<StateId>,
    /// Transitions as `(state, symbol, target)` triples.
    pub transitions: Vec<(StateId, char, StateId)>,
}

impl Automaton {
    /// Build an automaton from its parts, rejecting structurally invalid input.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::{BTreeMap, BTreeSet};
    /// use dfa_evolve::schema::{Alphabet, Automaton};
    ///
    /// // Accepts strings with an odd number of `a`s.
    /// let automaton = Automaton::new(
    ///     BTreeSet::from([0, 1]),
    ///     Alphabet::from("a"),
    ///     0,
    ///     BTreeSet::from([1]),
    ///     BTreeMap::from([((0, 'a'), 1), ((1, 'a'), 0)]),
    /// )
    /// .unwrap();
    /// assert_eq!(automaton.state_count(), 2);
    /// ```
    pub fn new(
        states: BTreeSet<StateId>,
        alphabet: Alphabet,
        initial: StateId,
        finals: BTreeSet<StateId>,
        transitions: BTreeMap<TransitionKey, StateId>,
    ) -> Result<Self, AutomatonError> {
        let automaton = Self {
            states,
            alphabet,
            initial,
            finals,
            transitions,
        };
        automaton.validate()?;
        Ok(automaton)
    }

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), AutomatonError> {
        if self.states.is_empty() {
            return Err(AutomatonError::NoStates);
        }
        if !self.states.contains(&self.initial) {
            return Err(AutomatonError::InitialStateOutsideStates(self.initial));
        }
        if self.finals.is_empty() {
            return Err(AutomatonError::NoFinalStates);
        }
        if let Some(&state) = self.finals.iter().find(|s| !self.states.contains(s)) {
            return Err(AutomatonError::FinalStateOutsideStates(state));
        }
        for &state in &self.states {
            for symbol in self.alphabet.iter() {
                match self.transitions.get(&(state, symbol)) {
                    None => return Err(AutomatonError::MissingTransition { state, symbol }),
                    Some(target) if !self.states.contains(target) => {
                        return Err(AutomatonError::TargetOutsideStates {
                            state,
                            symbol,
                            target: *target,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        if self.transitions.len() != self.states.len() * self.alphabet.len() {
            return Err(AutomatonError::ExtraneousTransitions);
        }
        Ok(())
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    pub fn final_states(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.finals.contains(&state)
    }

    pub fn transitions(&self) -> &BTreeMap<TransitionKey, StateId> {
        &self.transitions
    }

    /// Target of `(state, symbol)`, if defined.
    pub fn target(&self, state: StateId, symbol: char) -> Option<StateId> {
        self.transitions.get(&(state, symbol)).copied()
    }

    /// Mark `state` final. Returns whether the set changed.
    pub(crate) fn add_final(&mut self, state: StateId) -> bool {
        self.finals.insert(state)
    }

    /// Unmark `state` as final. Returns whether the set changed.
    pub(crate) fn remove_final(&mut self, state: StateId) -> bool {
        self.finals.remove(&state)
    }
}

impl TryFrom<AutomatonParts> for Automaton {
    type Error = AutomatonError;

    fn try_from(parts: AutomatonParts) -> Result<Self, Self::Error> {
        let mut transitions = BTreeMap::new();
        for (state, symbol, target) in parts.transitions {
            if transitions.insert((state, symbol), target).is_some() {
                return Err(AutomatonError::DuplicateTransition { state, symbol });
            }
        }
        Self::new(
            parts.states,
            parts.alphabet,
            parts.initial,
            parts.finals,
            transitions,
        )
    }
}

impl From<Automaton> for AutomatonParts {
    fn from(automaton: Automaton) -> Self {
        Self {
            states: automaton.states,
            alphabet: automaton.alphabet,
            initial: automaton.initial,
            finals: automaton.finals,
            transitions: automaton
                .transitions
                .into_iter()
                .map(|((state, symbol), target)| (state, symbol, target))
                .collect(),
        }
    }
}

/// Structural validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutomatonError {
    #[error("Automaton has no states")]
    NoStates,
    #[error("Initial state {0} is not a member of the state set")]
    InitialStateOutsideStates(StateId),
    #[error("Automaton has no final states")]
    NoFinalStates,
    #[error("Final state {0} is not a member of the state set")]
    FinalStateOutsideStates(StateId),
    #[error("No transition defined for state {state} on symbol {symbol:?}")]
    MissingTransition { state: StateId, symbol: char },
    #[error("Transition ({state}, {symbol:?}) targets unknown state {target}")]
    TargetOutsideStates {
        state: StateId,
        symbol: char,
        target: StateId,
    },
    #[error("Transition ({state}, {symbol:?}) defined more than once")]
    DuplicateTransition { state: StateId, symbol: char },
    #[error("Transitions defined outside states × alphabet")]
    ExtraneousTransitions,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parity() -> Automaton {
        Automaton::new(
            BTreeSet::from([0, 1]),
            Alphabet::from("ab"),
            0,
            BTreeSet::from([1]),
            BTreeMap::from([((0, 'a'), 1), ((0, 'b'), 0), ((1, 'a'), 0), ((1, 'b'), 1)]),
        )
        .unwrap()
    }

    #[test]
    fn test_alphabet_dedup_and_order() {
        let alphabet = Alphabet::from("somasa");
        assert_eq!(alphabet.iter().collect::<String>(), "amos");
        assert!(alphabet.contains('m'));
        assert!(!alphabet.contains('x'));
    }

    #[test]
    fn test_alphabet_from_words() {
        let alphabet = Alphabet::from_words(&["amo", "amas"]);
        assert_eq!(alphabet.len(), 4);
    }

    #[test]
    fn test_valid_automaton() {
        let automaton = parity();
        assert!(automaton.validate().is_ok());
        assert_eq!(automaton.target(0, 'a'), Some(1));
        assert!(automaton.is_final(1));
    }

    #[test]
    fn test_rejects_initial_outside_states() {
        let result = Automaton::new(
            BTreeSet::from([0]),
            Alphabet::from("a"),
            3,
            BTreeSet::from([0]),
            BTreeMap::from([((0, 'a'), 0)]),
        );
        assert_eq!(result, Err(AutomatonError::InitialStateOutsideStates(3)));
    }

    #[test]
    fn test_rejects_empty_finals() {
        let result = Automaton::new(
            BTreeSet::from([0]),
            Alphabet::from("a"),
            0,
            BTreeSet::new(),
            BTreeMap::from([((0, 'a'), 0)]),
        );
        assert_eq!(result, Err(AutomatonError::NoFinalStates));
    }

    #[test]
    fn test_rejects_partial_transition_function() {
        let result = Automaton::new(
            BTreeSet::from([0, 1]),
            Alphabet::from("a"),
            0,
            BTreeSet::from([1]),
            BTreeMap::from([((0, 'a'), 1)]),
        );
        assert_eq!(
            result,
            Err(AutomatonError::MissingTransition {
                state: 1,
                symbol: 'a'
            })
        );
    }

    #[test]
    fn test_rejects_dangling_target() {
        let result = Automaton::new(
            BTreeSet::from([0]),
            Alphabet::from("a"),
            0,
            BTreeSet::from([0]),
            BTreeMap::from([((0, 'a'), 7)]),
        );
        assert!(matches!(
            result,
            Err(AutomatonError::TargetOutsideStates { target: 7, .. })
        ));
    }

    #[test]
    fn test_serialization_roundtrip_validates() {
        let automaton = parity();
        let json = serde_json::to_string(&automaton).unwrap();
        let parsed: Automaton = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, automaton);

        let broken = json.replace("\"initial\":0", "\"initial\":9");
        assert!(serde_json::from_str::<Automaton>(&broken).is_err());
    }
}
