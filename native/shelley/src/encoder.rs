//! Encoding of integration rules into one micro automaton.
//!
//! Every macro step `m --e--> m'` is replaced by the calls of `triggers[e]`.
//! The encoded states remember where they came from so that a micro trace can
//! be mapped back to the macro events it implements.

use crate::config::Options;
use crate::error::Result;
use crate::formlang::{
    DFA, EpsilonNFA, Regex, StateId, StateInterner, Symbol, bounded_subset_construction,
    regex_to_nfa, subset_construction,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use tracing::debug;

/// A macro DFA state, together with the event that led into it (`None` only
/// for the initial state).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct MacroState {
    pub state: StateId,
    pub event: Option<Symbol>,
}

/// A point inside the trigger of `event`, which once finished lands in
/// macro state `macro_state`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct MicroState {
    pub macro_state: StateId,
    pub event: Symbol,
    pub trigger_state: StateId,
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum EncodedState {
    Macro(MacroState),
    Micro(MicroState),
}

impl EncodedState {
    pub fn as_macro(&self) -> Option<&MacroState> {
        match self {
            EncodedState::Macro(state) => Some(state),
            EncodedState::Micro(_) => None,
        }
    }
}

impl fmt::Display for EncodedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodedState::Macro(MacroState { state, event: None }) => write!(f, "M{state}"),
            EncodedState::Macro(MacroState {
                state,
                event: Some(event),
            }) => write!(f, "M{state}/{event}"),
            EncodedState::Micro(MicroState {
                macro_state,
                event,
                trigger_state,
            }) => write!(f, "m{macro_state}/{event}@{trigger_state}"),
        }
    }
}

/// The internal behavior of a composite device.
#[derive(Debug, Clone)]
pub struct MicroBehavior {
    nfa: EpsilonNFA,
    states: Vec<EncodedState>,
    dfa: DFA,
    macro_dfa: DFA,
}

impl MicroBehavior {
    /// The encoded automaton; state `i` stands for `states()[i]`.
    pub fn nfa(&self) -> &EpsilonNFA {
        &self.nfa
    }

    pub fn states(&self) -> &[EncodedState] {
        &self.states
    }

    /// The determinized encoding. Each of its states maps back to the encoded
    /// states it was built from.
    pub fn dfa(&self) -> &DFA {
        &self.dfa
    }

    /// The total, minimal macro DFA the encoding was built from.
    pub fn macro_dfa(&self) -> &DFA {
        &self.macro_dfa
    }

    pub fn accepts(&self, trace: &[Symbol]) -> bool {
        self.dfa.accepts(trace)
    }

    /// The distinct macro states inside a micro DFA state.
    pub fn macro_states(&self, dfa_state: StateId) -> BTreeSet<&MacroState> {
        self.dfa
            .nfa_states(dfa_state)
            .iter()
            .filter_map(|&id| self.states[id as usize].as_macro())
            .collect()
    }

    /// Replay `trace` through the encoded automaton and return the macro
    /// events completed along the first path that ends, after the whole
    /// trace, in a state satisfying `target`.
    ///
    /// The search is a breadth-first walk over `(position, state)` pairs, so
    /// it terminates on epsilon cycles and always prefers the path with the
    /// fewest epsilon moves.
    pub fn decode_path(
        &self,
        trace: &[Symbol],
        mut target: impl FnMut(StateId) -> bool,
    ) -> Option<Vec<Symbol>> {
        type Node = (usize, StateId);

        let mut parents: HashMap<Node, Option<Node>> = HashMap::new();
        let mut queue = VecDeque::new();
        for start in self.nfa.start_states().iter() {
            parents.insert((0, start), None);
            queue.push_back((0, start));
        }

        while let Some(node @ (position, state)) = queue.pop_front() {
            if position == trace.len() && target(state) {
                return Some(self.completed_events(&parents, node));
            }

            let mut successors = Vec::new();
            if let Some(next) = self.nfa.successors(state, &None) {
                successors.extend(next.iter().map(|s| (position, s)));
            }
            if let Some(symbol) = trace.get(position) {
                if let Some(next) = self.nfa.successors(state, &Some(symbol.clone())) {
                    successors.extend(next.iter().map(|s| (position + 1, s)));
                }
            }

            for successor in successors {
                if parents.contains_key(&successor) {
                    continue;
                }
                parents.insert(successor, Some(node));
                queue.push_back(successor);
            }
        }

        None
    }

    /// The macro trace implemented by an accepted micro trace.
    pub fn decode_macro_trace(&self, trace: &[Symbol]) -> Option<Vec<Symbol>> {
        self.decode_path(trace, |state| self.nfa.is_final(state))
    }

    /// Encoded id of a macro state, if the exploration reached it.
    pub fn macro_state_id(&self, macro_state: &MacroState) -> Option<StateId> {
        self.states
            .iter()
            .position(|state| state.as_macro() == Some(macro_state))
            .map(|index| index as StateId)
    }

    fn completed_events(
        &self,
        parents: &HashMap<(usize, StateId), Option<(usize, StateId)>>,
        end: (usize, StateId),
    ) -> Vec<Symbol> {
        let mut events = Vec::new();
        let mut node = Some(end);
        while let Some(current @ (_, state)) = node {
            if let Some(MacroState {
                event: Some(event), ..
            }) = self.states[state as usize].as_macro()
            {
                events.push(event.clone());
            }
            node = parents[&current];
        }
        events.reverse();
        events
    }
}

/// Build the micro behavior of a device.
///
/// `macro_nfa` is the device's external behavior, `triggers` the integration
/// rule of every event and `alphabet` the calls the subsystems offer. The
/// result's alphabet is `alphabet` together with every symbol the triggers use.
pub fn encode_behavior<I>(
    macro_nfa: &EpsilonNFA,
    triggers: &BTreeMap<String, Regex>,
    alphabet: I,
    options: &Options,
) -> Result<MicroBehavior>
where
    I: IntoIterator<Item = Symbol>,
{
    let macro_dfa = subset_construction(macro_nfa)
        .minimize()
        .complete(std::iter::empty());
    let trigger_dfas: BTreeMap<Symbol, DFA> = triggers
        .iter()
        .map(|(event, rule)| {
            let dfa = subset_construction(&regex_to_nfa(rule, [])).minimize();
            (Symbol::new(event), dfa)
        })
        .collect();

    let mut nfa = EpsilonNFA::with_alphabet(alphabet);
    for dfa in trigger_dfas.values() {
        for symbol in dfa.alphabet() {
            nfa.add_symbol(symbol.clone());
        }
    }

    let mut interner = StateInterner::new("encoding", options.max_states);
    let mut queue = VecDeque::new();

    let Some(macro_start) = macro_dfa.start_state() else {
        unreachable!("a completed DFA always has a start state");
    };
    let initial = EncodedState::Macro(MacroState {
        state: macro_start,
        event: None,
    });
    let (start, _) = interner.intern(initial.clone())?;
    nfa.add_start_state(start);
    queue.push_back((start, initial));

    while let Some((id, state)) = queue.pop_front() {
        let mut edges: Vec<(Option<Symbol>, EncodedState)> = Vec::new();
        match &state {
            EncodedState::Macro(MacroState { state: current, .. }) => {
                if macro_dfa.is_final(*current) {
                    nfa.add_final_state(id);
                }
                for event in macro_dfa.alphabet() {
                    let (Some(next), Some(trigger)) = (
                        macro_dfa.transition(*current, event),
                        trigger_dfas.get(event),
                    ) else {
                        continue;
                    };
                    let Some(trigger_start) = trigger.start_state() else {
                        continue;
                    };
                    edges.push((
                        None,
                        EncodedState::Micro(MicroState {
                            macro_state: next,
                            event: event.clone(),
                            trigger_state: trigger_start,
                        }),
                    ));
                }
            }
            EncodedState::Micro(micro) => {
                let trigger = &trigger_dfas[&micro.event];
                for symbol in trigger.alphabet() {
                    if let Some(next) = trigger.transition(micro.trigger_state, symbol) {
                        edges.push((
                            Some(symbol.clone()),
                            EncodedState::Micro(MicroState {
                                trigger_state: next,
                                ..micro.clone()
                            }),
                        ));
                    }
                }
                if trigger.is_final(micro.trigger_state) {
                    edges.push((
                        None,
                        EncodedState::Macro(MacroState {
                            state: micro.macro_state,
                            event: Some(micro.event.clone()),
                        }),
                    ));
                }
            }
        }

        for (label, target) in edges {
            let (target_id, fresh) = interner.intern(target.clone())?;
            nfa.add_labeled_transition(id, label, target_id);
            if fresh {
                queue.push_back((target_id, target));
            }
        }
    }

    nfa.compute_epsilon_closures();
    let dfa = bounded_subset_construction(&nfa, options.max_states)?;
    debug!(
        encoded_states = interner.len(),
        micro_dfa_states = dfa.num_states(),
        macro_dfa_states = macro_dfa.num_states(),
        "encoded micro behavior"
    );

    Ok(MicroBehavior {
        nfa,
        states: interner.into_values(),
        dfa,
        macro_dfa,
    })
}
