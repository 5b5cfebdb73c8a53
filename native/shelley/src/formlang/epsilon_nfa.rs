//! Epsilon Non-deterministic Finite Automaton (ε-NFA) implementation.

use crate::formlang::state::{StateId, StateSet};
use crate::formlang::symbol::{Label, Symbol};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// An Epsilon Non-deterministic Finite Automaton.
#[derive(Debug, Clone, Default)]
pub struct EpsilonNFA {
    /// Number of states (states are numbered 0..num_states)
    num_states: StateId,
    start_states: StateSet,
    final_states: StateSet,
    /// Transitions: (source, label) -> set of destination states.
    /// Epsilon transitions use a `None` label.
    transitions: HashMap<(StateId, Label), StateSet>,
    /// All symbols (excluding epsilon), kept sorted so explorations are reproducible
    alphabet: BTreeSet<Symbol>,
    /// Cached epsilon closures for each state
    epsilon_closures: Option<Vec<StateSet>>,
}

impl EpsilonNFA {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an automaton whose alphabet already contains `alphabet`.
    pub fn with_alphabet<I: IntoIterator<Item = Symbol>>(alphabet: I) -> Self {
        Self {
            alphabet: alphabet.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Allocate a fresh state and return its ID.
    pub fn add_state(&mut self) -> StateId {
        let id = self.num_states;
        self.ensure_state(id);
        id
    }

    fn ensure_state(&mut self, state: StateId) {
        if state >= self.num_states {
            self.num_states = state + 1;
            self.epsilon_closures = None;
        }
    }

    /// Add a symbol to the alphabet without adding a transition.
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.alphabet.insert(symbol);
    }

    /// Add a transition from source to destination on the given label.
    pub fn add_labeled_transition(&mut self, source: StateId, label: Label, destination: StateId) {
        self.ensure_state(source);
        self.ensure_state(destination);

        if let Some(symbol) = &label {
            self.alphabet.insert(symbol.clone());
        }

        let capacity = self.num_states as usize;
        self.transitions
            .entry((source, label))
            .or_insert_with(|| StateSet::with_capacity(capacity))
            .insert(destination);

        self.epsilon_closures = None;
    }

    pub fn add_transition(&mut self, source: StateId, symbol: Symbol, destination: StateId) {
        self.add_labeled_transition(source, Some(symbol), destination);
    }

    pub fn add_epsilon_transition(&mut self, source: StateId, destination: StateId) {
        self.add_labeled_transition(source, None, destination);
    }

    pub fn add_start_state(&mut self, state: StateId) {
        self.ensure_state(state);
        self.start_states.insert(state);
    }

    pub fn add_final_state(&mut self, state: StateId) {
        self.ensure_state(state);
        self.final_states.insert(state);
    }

    pub fn num_states(&self) -> StateId {
        self.num_states
    }

    pub fn start_states(&self) -> &StateSet {
        &self.start_states
    }

    pub fn final_states(&self) -> &StateSet {
        &self.final_states
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.final_states.contains(state)
    }

    /// Get the alphabet (all symbols except epsilon), sorted.
    pub fn alphabet(&self) -> &BTreeSet<Symbol> {
        &self.alphabet
    }

    /// Destinations of `state` on `label`, if any.
    pub fn successors(&self, state: StateId, label: &Label) -> Option<&StateSet> {
        self.transitions.get(&(state, label.clone()))
    }

    fn epsilon_closure_single(&self, state: StateId) -> StateSet {
        let mut closure = StateSet::with_capacity(self.num_states as usize);
        let mut stack = vec![state];

        while let Some(s) = stack.pop() {
            if !closure.insert(s) {
                continue;
            }
            if let Some(destinations) = self.transitions.get(&(s, None)) {
                stack.extend(destinations.iter().filter(|d| !closure.contains(*d)));
            }
        }

        closure
    }

    /// Compute epsilon closures for all states (cached until the next mutation).
    pub fn compute_epsilon_closures(&mut self) {
        if self.epsilon_closures.is_some() {
            return;
        }
        let closures = (0..self.num_states)
            .map(|state| self.epsilon_closure_single(state))
            .collect();
        self.epsilon_closures = Some(closures);
    }

    /// Get the epsilon closure of a set of states.
    pub fn epsilon_closure(&self, states: &StateSet) -> StateSet {
        let mut closure = StateSet::with_capacity(self.num_states as usize);

        if let Some(cached) = &self.epsilon_closures {
            for state in states.iter() {
                if let Some(c) = cached.get(state as usize) {
                    closure.union_with(c);
                }
            }
            return closure;
        }

        let mut stack: Vec<StateId> = states.iter().collect();
        while let Some(s) = stack.pop() {
            if !closure.insert(s) {
                continue;
            }
            if let Some(destinations) = self.transitions.get(&(s, None)) {
                stack.extend(destinations.iter().filter(|d| !closure.contains(*d)));
            }
        }

        closure
    }

    /// The epsilon closure of the states reached from `states` on `symbol`.
    pub fn move_on_symbol(&self, states: &StateSet, symbol: &Symbol) -> StateSet {
        let mut reached = StateSet::with_capacity(self.num_states as usize);
        let label = Some(symbol.clone());

        for state in states.iter() {
            if let Some(destinations) = self.transitions.get(&(state, label.clone())) {
                reached.union_with(destinations);
            }
        }

        self.epsilon_closure(&reached)
    }

    /// Whether the automaton accepts `word`.
    pub fn accepts(&self, word: &[Symbol]) -> bool {
        let mut current = self.epsilon_closure(&self.start_states);
        for symbol in word {
            if current.is_empty() {
                return false;
            }
            current = self.move_on_symbol(&current, symbol);
        }
        current.intersects(&self.final_states)
    }

    /// Check if the NFA accepts no string at all.
    pub fn is_empty(&self) -> bool {
        !self
            .reachable_states()
            .iter()
            .any(|state| self.final_states.contains(state))
    }

    /// All states reachable from the start states, following every label.
    pub fn reachable_states(&self) -> StateSet {
        let mut visited = StateSet::with_capacity(self.num_states as usize);
        let mut queue: VecDeque<StateId> = self.start_states.iter().collect();

        while let Some(state) = queue.pop_front() {
            if !visited.insert(state) {
                continue;
            }
            for label in self.labels() {
                if let Some(destinations) = self.transitions.get(&(state, label)) {
                    queue.extend(destinations.iter().filter(|d| !visited.contains(*d)));
                }
            }
        }

        visited
    }

    /// Epsilon followed by every alphabet symbol, in order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        std::iter::once(None).chain(self.alphabet.iter().cloned().map(Some))
    }

    /// Get all transitions as an iterator.
    pub fn transitions(&self) -> impl Iterator<Item = (StateId, &Label, StateId)> + '_ {
        self.transitions
            .iter()
            .flat_map(|((src, label), dests)| dests.iter().map(move |dst| (*src, label, dst)))
    }

    /// Rename every symbol, keeping the state structure intact.
    pub fn map_symbols(&self, mut rename: impl FnMut(&Symbol) -> Symbol) -> EpsilonNFA {
        let mut renamed = EpsilonNFA::with_alphabet(self.alphabet.iter().map(&mut rename));
        renamed.num_states = self.num_states;
        renamed.start_states = self.start_states.clone();
        renamed.final_states = self.final_states.clone();
        for ((src, label), dests) in &self.transitions {
            let label = label.as_ref().map(&mut rename);
            renamed.transitions.insert((*src, label), dests.clone());
        }
        renamed
    }
}
