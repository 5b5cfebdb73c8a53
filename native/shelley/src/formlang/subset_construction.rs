//! Subset construction algorithm for converting ε-NFA to DFA.

use crate::error::{Error, Result};
use crate::formlang::dfa::DFA;
use crate::formlang::epsilon_nfa::EpsilonNFA;
use crate::formlang::state::{StateId, StateSet};
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

/// Convert an epsilon-NFA to a DFA using the powerset construction.
///
/// Only subsets reachable from the start closure are materialized. Each DFA
/// state remembers the NFA subset it stands for (see [`DFA::nfa_states`]).
pub fn subset_construction(nfa: &EpsilonNFA) -> DFA {
    match bounded_subset_construction(nfa, usize::MAX) {
        Ok(dfa) => dfa,
        Err(err) => unreachable!("unbounded subset construction failed: {err}"),
    }
}

/// Like [`subset_construction`], but gives up once more than `max_states`
/// DFA states have been created.
pub fn bounded_subset_construction(nfa: &EpsilonNFA, max_states: usize) -> Result<DFA> {
    // Each DFA state corresponds to a (sorted) set of NFA states
    let mut state_mapping: IndexMap<Vec<StateId>, StateId> = IndexMap::new();
    let mut dfa = DFA::with_alphabet(nfa.alphabet().iter().cloned());
    let mut worklist: VecDeque<(StateId, StateSet)> = VecDeque::new();

    let initial_set = nfa.epsilon_closure(nfa.start_states());
    if initial_set.is_empty() {
        return Ok(dfa);
    }

    let initial = dfa.add_state();
    dfa.set_start_state(initial);
    if initial_set.intersects(nfa.final_states()) {
        dfa.add_final_state(initial);
    }
    state_mapping.insert(initial_set.to_vec(), initial);
    worklist.push_back((initial, initial_set));

    while let Some((current, current_set)) = worklist.pop_front() {
        for symbol in nfa.alphabet() {
            let next_set = nfa.move_on_symbol(&current_set, symbol);
            if next_set.is_empty() {
                // Left to the implicit sink
                continue;
            }

            let next_vec = next_set.to_vec();
            let next = match state_mapping.get(&next_vec) {
                Some(&existing) => existing,
                None => {
                    if state_mapping.len() >= max_states {
                        return Err(Error::StateLimitExceeded {
                            stage: "determinization",
                            limit: max_states,
                        });
                    }
                    let new_state = dfa.add_state();
                    if next_set.intersects(nfa.final_states()) {
                        dfa.add_final_state(new_state);
                    }
                    state_mapping.insert(next_vec, new_state);
                    worklist.push_back((new_state, next_set));
                    new_state
                }
            };

            dfa.add_transition(current, symbol.clone(), next);
        }
    }

    let inverse_mapping: HashMap<StateId, Vec<StateId>> = state_mapping
        .into_iter()
        .map(|(nfa_states, dfa_state)| (dfa_state, nfa_states))
        .collect();
    dfa.set_state_mapping(inverse_mapping);

    Ok(dfa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formlang::symbol::{Symbol, word};

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    #[test]
    fn test_subset_construction_basic() {
        // 0 -a-> 1, 0 -a-> 2, 1 -b-> 3(final), 2 -b-> 3(final)
        let mut nfa = EpsilonNFA::new();
        nfa.add_transition(0, sym("a"), 1);
        nfa.add_transition(0, sym("a"), 2);
        nfa.add_transition(1, sym("b"), 3);
        nfa.add_transition(2, sym("b"), 3);
        nfa.add_start_state(0);
        nfa.add_final_state(3);

        let dfa = subset_construction(&nfa);

        assert_eq!(dfa.num_states(), 3);
        assert!(dfa.accepts(&word(["a", "b"])));
        assert!(!dfa.accepts(&word(["a"])));
        assert_eq!(dfa.nfa_states(1), &[1, 2]);
    }

    #[test]
    fn test_subset_construction_with_epsilon() {
        // 0 -ε-> 1 -a-> 2(final)
        let mut nfa = EpsilonNFA::new();
        nfa.add_epsilon_transition(0, 1);
        nfa.add_transition(1, sym("a"), 2);
        nfa.add_start_state(0);
        nfa.add_final_state(2);

        let dfa = subset_construction(&nfa);

        let start = dfa.start_state().unwrap();
        assert_eq!(dfa.nfa_states(start), &[0, 1]);
        assert!(dfa.accepts(&word(["a"])));
    }

    #[test]
    fn test_empty_nfa() {
        let nfa = EpsilonNFA::with_alphabet(word(["a"]));
        let dfa = subset_construction(&nfa);
        assert!(dfa.start_state().is_none());
        assert!(dfa.alphabet().contains("a"));
    }

    #[test]
    fn test_state_limit() {
        // (a|b)* a (a|b): the DFA needs 4 states
        let mut nfa = EpsilonNFA::new();
        nfa.add_transition(0, sym("a"), 0);
        nfa.add_transition(0, sym("b"), 0);
        nfa.add_transition(0, sym("a"), 1);
        nfa.add_transition(1, sym("a"), 2);
        nfa.add_transition(1, sym("b"), 2);
        nfa.add_start_state(0);
        nfa.add_final_state(2);

        assert!(bounded_subset_construction(&nfa, 4).is_ok());
        assert!(matches!(
            bounded_subset_construction(&nfa, 2),
            Err(Error::StateLimitExceeded { limit: 2, .. })
        ));
    }
}
