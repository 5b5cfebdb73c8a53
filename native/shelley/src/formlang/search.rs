//! Witness searches over DFAs.

use crate::formlang::dfa::DFA;
use crate::formlang::state::{StateId, StateSet};
use crate::formlang::symbol::Symbol;
use std::collections::{HashMap, VecDeque};

impl DFA {
    /// Shortest word leading from the start state to a state satisfying `target`.
    ///
    /// Symbols are tried in sorted order, so among words of equal length the
    /// lexicographically smallest one is returned. For [`DFA::shortest_accepted`]
    /// the witness therefore depends only on the language, not on the shape of
    /// the automaton.
    pub fn shortest_word(&self, mut target: impl FnMut(StateId) -> bool) -> Option<Vec<Symbol>> {
        let start = self.start_state()?;
        if target(start) {
            return Some(Vec::new());
        }

        let mut visited = StateSet::singleton(start, self.num_states() as usize);
        let mut parents: HashMap<StateId, (StateId, &Symbol)> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(state) = queue.pop_front() {
            for symbol in self.alphabet() {
                let Some(next) = self.transition(state, symbol) else {
                    continue;
                };
                if !visited.insert(next) {
                    continue;
                }
                parents.insert(next, (state, symbol));
                if target(next) {
                    return Some(unwind(&parents, start, next));
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Shortest accepted word, if the language is not empty.
    pub fn shortest_accepted(&self) -> Option<Vec<Symbol>> {
        self.shortest_word(|state| self.is_final(state))
    }

    /// Index of the first symbol of `trace` this automaton cannot follow.
    ///
    /// Returns `None` when the trace is accepted and `Some(trace.len())` when the
    /// whole trace is read but ends in a non-accepting state. On a minimized DFA
    /// every dead state has been dropped, so the index is the first call after
    /// which no continuation can be accepted.
    pub fn divergence_index(&self, trace: &[Symbol]) -> Option<usize> {
        let Some(mut state) = self.start_state() else {
            return Some(0);
        };
        for (index, symbol) in trace.iter().enumerate() {
            match self.transition(state, symbol) {
                Some(next) => state = next,
                None => return Some(index),
            }
        }
        (!self.is_final(state)).then_some(trace.len())
    }
}

fn unwind(parents: &HashMap<StateId, (StateId, &Symbol)>, start: StateId, end: StateId) -> Vec<Symbol> {
    let mut word = Vec::new();
    let mut state = end;
    while state != start {
        let (previous, symbol) = parents[&state];
        word.push(symbol.clone());
        state = previous;
    }
    word.reverse();
    word
}
