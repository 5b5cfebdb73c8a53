//! Deterministic Finite Automaton (DFA) implementation with partition-refinement
//! minimization.
//!
//! Transition functions are partial: a missing `(state, symbol)` entry goes to an
//! implicit, non-accepting sink. [`DFA::complete`] materializes that sink when a
//! total function is needed (complement, macro encoding).

use crate::formlang::state::{StateId, StateSet};
use crate::formlang::symbol::Symbol;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// A Deterministic Finite Automaton.
#[derive(Debug, Clone, Default)]
pub struct DFA {
    num_states: StateId,
    /// Start state (None if the language is trivially empty)
    start_state: Option<StateId>,
    final_states: StateSet,
    /// Transitions: (source, symbol) -> destination
    transitions: HashMap<(StateId, Symbol), StateId>,
    /// All symbols, sorted
    alphabet: BTreeSet<Symbol>,
    /// Mapping from DFA states to original NFA states (if created via subset construction)
    state_mapping: Option<HashMap<StateId, Vec<StateId>>>,
}

impl DFA {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty DFA over a fixed alphabet.
    pub fn with_alphabet<I: IntoIterator<Item = Symbol>>(alphabet: I) -> Self {
        Self {
            alphabet: alphabet.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Add a new state and return its ID.
    pub fn add_state(&mut self) -> StateId {
        let id = self.num_states;
        self.num_states += 1;
        id
    }

    pub fn set_start_state(&mut self, state: StateId) {
        self.start_state = Some(state);
    }

    pub fn add_final_state(&mut self, state: StateId) {
        self.final_states.insert(state);
    }

    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.alphabet.insert(symbol);
    }

    pub fn add_transition(&mut self, source: StateId, symbol: Symbol, destination: StateId) {
        self.alphabet.insert(symbol.clone());
        self.transitions.insert((source, symbol), destination);
    }

    /// Get the transition from a state on a symbol.
    pub fn transition(&self, source: StateId, symbol: &Symbol) -> Option<StateId> {
        self.transitions.get(&(source, symbol.clone())).copied()
    }

    pub fn num_states(&self) -> StateId {
        self.num_states
    }

    pub fn start_state(&self) -> Option<StateId> {
        self.start_state
    }

    pub fn final_states(&self) -> &StateSet {
        &self.final_states
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.final_states.contains(state)
    }

    pub fn alphabet(&self) -> &BTreeSet<Symbol> {
        &self.alphabet
    }

    /// Set the state mapping from original NFA states.
    pub fn set_state_mapping(&mut self, mapping: HashMap<StateId, Vec<StateId>>) {
        self.state_mapping = Some(mapping);
    }

    pub fn state_mapping(&self) -> Option<&HashMap<StateId, Vec<StateId>>> {
        self.state_mapping.as_ref()
    }

    /// The NFA states a DFA state stands for, when known.
    pub fn nfa_states(&self, state: StateId) -> &[StateId] {
        self.state_mapping
            .as_ref()
            .and_then(|mapping| mapping.get(&state))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Run `word` from the start state; `None` once the walk falls into the sink.
    pub fn run(&self, word: &[Symbol]) -> Option<StateId> {
        word.iter()
            .try_fold(self.start_state?, |state, symbol| self.transition(state, symbol))
    }

    pub fn accepts(&self, word: &[Symbol]) -> bool {
        self.run(word).is_some_and(|state| self.is_final(state))
    }

    /// Check if the DFA is empty (accepts no strings).
    pub fn is_empty(&self) -> bool {
        if self.final_states.is_empty() {
            return true;
        }
        !self
            .find_reachable_states()
            .iter()
            .any(|state| self.final_states.contains(state))
    }

    /// Get all transitions as an iterator.
    pub fn transitions(&self) -> impl Iterator<Item = (StateId, &Symbol, StateId)> + '_ {
        self.transitions
            .iter()
            .map(|((src, sym), dst)| (*src, sym, *dst))
    }

    /// Make the transition function total over `alphabet ∪ extra`, adding a
    /// non-accepting sink state only when some transition is missing.
    pub fn complete<I: IntoIterator<Item = Symbol>>(&self, extra: I) -> DFA {
        let mut total = self.clone();
        total.alphabet.extend(extra);

        if total.start_state.is_none() {
            let start = total.add_state();
            total.set_start_state(start);
        }

        let missing: Vec<(StateId, Symbol)> = (0..total.num_states)
            .flat_map(|state| total.alphabet.iter().map(move |sym| (state, sym.clone())))
            .filter(|key| !total.transitions.contains_key(key))
            .collect();

        if !missing.is_empty() {
            let sink = total.add_state();
            for (state, symbol) in missing {
                total.transitions.insert((state, symbol), sink);
            }
            let alphabet: Vec<Symbol> = total.alphabet.iter().cloned().collect();
            for symbol in alphabet {
                total.transitions.insert((sink, symbol), sink);
            }
            if let Some(mapping) = total.state_mapping.as_mut() {
                mapping.insert(sink, Vec::new());
            }
        }

        total
    }

    /// Minimize the DFA.
    ///
    /// Unreachable and dead states are dropped first, so the result is the
    /// smallest partial DFA for the language; the implicit sink stands in for
    /// every dead state. Classes are then refined Moore-style, starting from
    /// {accepting, non-accepting}, until no class splits.
    pub fn minimize(&self) -> DFA {
        let live = self.find_live_states();

        let Some(start) = self.start_state.filter(|s| live.contains(*s)) else {
            return DFA::with_alphabet(self.alphabet.iter().cloned());
        };

        let states: Vec<StateId> = live.iter().collect();
        let mut classes: HashMap<StateId, usize> = HashMap::with_capacity(states.len());
        let mut num_classes = renumber(&states, &mut classes, |s| self.is_final(s));

        loop {
            let signatures: HashMap<StateId, (usize, Vec<Option<usize>>)> = states
                .iter()
                .map(|&s| {
                    let targets = self
                        .alphabet
                        .iter()
                        .map(|sym| {
                            self.transition(s, sym)
                                .and_then(|dst| classes.get(&dst).copied())
                        })
                        .collect();
                    (s, (classes[&s], targets))
                })
                .collect();
            let refined = renumber(&states, &mut classes, |s| signatures[&s].clone());
            if refined == num_classes {
                break;
            }
            num_classes = refined;
        }

        self.build_minimized_dfa(&states, &classes, num_classes, start)
    }

    /// Find all states reachable from the start state.
    fn find_reachable_states(&self) -> StateSet {
        let mut reachable = StateSet::with_capacity(self.num_states as usize);

        let Some(start) = self.start_state else {
            return reachable;
        };

        let mut queue = VecDeque::from([start]);
        while let Some(state) = queue.pop_front() {
            if !reachable.insert(state) {
                continue;
            }
            for symbol in &self.alphabet {
                if let Some(next) = self.transition(state, symbol) {
                    if !reachable.contains(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        reachable
    }

    /// Reachable states from which some accepting state is reachable.
    fn find_live_states(&self) -> StateSet {
        let reachable = self.find_reachable_states();

        let mut reverse: HashMap<StateId, Vec<StateId>> = HashMap::new();
        for (src, _, dst) in self.transitions() {
            if reachable.contains(src) {
                reverse.entry(dst).or_default().push(src);
            }
        }

        let mut live = StateSet::with_capacity(self.num_states as usize);
        let mut stack: Vec<StateId> = self
            .final_states
            .iter()
            .filter(|s| reachable.contains(*s))
            .collect();
        while let Some(state) = stack.pop() {
            if !live.insert(state) {
                continue;
            }
            if let Some(sources) = reverse.get(&state) {
                stack.extend(sources.iter().filter(|s| !live.contains(**s)));
            }
        }

        live
    }

    /// Build a minimized DFA from the final class assignment.
    fn build_minimized_dfa(
        &self,
        states: &[StateId],
        classes: &HashMap<StateId, usize>,
        num_classes: usize,
        start: StateId,
    ) -> DFA {
        let mut minimized = DFA::with_alphabet(self.alphabet.iter().cloned());
        for _ in 0..num_classes {
            minimized.add_state();
        }
        minimized.set_start_state(classes[&start] as StateId);

        let mut representatives: Vec<Option<StateId>> = vec![None; num_classes];
        for &state in states {
            let class = classes[&state];
            if representatives[class].is_none() {
                representatives[class] = Some(state);
            }
            if self.is_final(state) {
                minimized.add_final_state(class as StateId);
            }
        }

        for (class, representative) in representatives.iter().enumerate() {
            let Some(representative) = *representative else {
                continue;
            };
            for symbol in &self.alphabet {
                let target = self
                    .transition(representative, symbol)
                    .and_then(|dst| classes.get(&dst));
                if let Some(&new_dest) = target {
                    minimized
                        .transitions
                        .insert((class as StateId, symbol.clone()), new_dest as StateId);
                }
            }
        }

        if let Some(orig_mapping) = &self.state_mapping {
            let mut new_mapping: HashMap<StateId, Vec<StateId>> = HashMap::new();
            for &state in states {
                let merged = new_mapping.entry(classes[&state] as StateId).or_default();
                if let Some(nfa_states) = orig_mapping.get(&state) {
                    merged.extend(nfa_states.iter().copied());
                }
            }
            for nfa_states in new_mapping.values_mut() {
                nfa_states.sort_unstable();
                nfa_states.dedup();
            }
            minimized.state_mapping = Some(new_mapping);
        }

        minimized
    }
}

/// Reassign dense class ids in first-occurrence order of `key`, returning the
/// number of classes.
fn renumber<K, F>(states: &[StateId], classes: &mut HashMap<StateId, usize>, key: F) -> usize
where
    K: std::hash::Hash + Eq,
    F: Fn(StateId) -> K,
{
    let mut ids: IndexMap<K, usize> = IndexMap::new();
    for &state in states {
        let k = key(state);
        let next = ids.len();
        let id = *ids.entry(k).or_insert(next);
        classes.insert(state, id);
    }
    ids.len()
}
