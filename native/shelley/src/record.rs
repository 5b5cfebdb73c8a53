//! A plain, serializable shape for automata.
//!
//! Persistence layers store [`AutomatonRecord`]s in whatever file format they
//! like; this module only converts between records and automata.

use crate::device::CheckedDevice;
use crate::error::{Error, Result};
use crate::formlang::{EpsilonNFA, Label, StateId, Symbol};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub src: StateId,
    /// `None` for an epsilon move.
    #[serde(rename = "char")]
    pub symbol: Option<Symbol>,
    pub dst: Vec<StateId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatonRecord {
    pub alphabet: BTreeSet<Symbol>,
    pub start_state: StateId,
    pub accepted_states: Vec<StateId>,
    pub transitions: Vec<TransitionRecord>,
}

impl EpsilonNFA {
    /// Record the reachable part of the automaton.
    ///
    /// States are renumbered in breadth-first order from the start state,
    /// following epsilon moves first and then symbols in sorted order. With
    /// several start states a fresh state `0` reaches each of them through an
    /// epsilon move.
    pub fn to_record(&self) -> AutomatonRecord {
        let starts = self.start_states().to_vec();
        let mut numbering: IndexMap<Option<StateId>, StateId> = IndexMap::new();
        let mut transitions = Vec::new();
        let mut queue = VecDeque::new();

        if let [start] = starts.as_slice() {
            numbering.insert(Some(*start), 0);
            queue.push_back(*start);
        } else {
            numbering.insert(None, 0);
            let mut dst = Vec::new();
            for &start in &starts {
                dst.push(number(&mut numbering, &mut queue, start));
            }
            if !dst.is_empty() {
                transitions.push(TransitionRecord {
                    src: 0,
                    symbol: None,
                    dst,
                });
            }
        }

        while let Some(state) = queue.pop_front() {
            let src = numbering[&Some(state)];
            for label in self.labels() {
                let Some(destinations) = self.successors(state, &label) else {
                    continue;
                };
                let mut dst: Vec<StateId> = destinations
                    .iter()
                    .map(|next| number(&mut numbering, &mut queue, next))
                    .collect();
                dst.sort_unstable();
                transitions.push(TransitionRecord {
                    src,
                    symbol: label,
                    dst,
                });
            }
        }

        let mut accepted_states: Vec<StateId> = numbering
            .iter()
            .filter_map(|(state, id)| state.filter(|s| self.is_final(*s)).map(|_| *id))
            .collect();
        accepted_states.sort_unstable();

        AutomatonRecord {
            alphabet: self.alphabet().clone(),
            start_state: 0,
            accepted_states,
            transitions,
        }
    }

    /// Rebuild an automaton from a record. Every symbol used by a transition
    /// must belong to the record's alphabet.
    pub fn from_record(record: &AutomatonRecord) -> Result<EpsilonNFA> {
        let mut nfa = EpsilonNFA::with_alphabet(record.alphabet.iter().cloned());
        nfa.add_start_state(record.start_state);
        for &state in &record.accepted_states {
            nfa.add_final_state(state);
        }
        for transition in &record.transitions {
            if let Some(symbol) = &transition.symbol {
                if !record.alphabet.contains(symbol) {
                    return Err(Error::InvalidRecord(format!(
                        "symbol `{symbol}` of state {} is not in the alphabet",
                        transition.src
                    )));
                }
            }
            if transition.dst.is_empty() {
                return Err(Error::InvalidRecord(format!(
                    "transition of state {} has no destination",
                    transition.src
                )));
            }
            let label: Label = transition.symbol.clone();
            for &dst in &transition.dst {
                nfa.add_labeled_transition(transition.src, label.clone(), dst);
            }
        }
        nfa.compute_epsilon_closures();
        Ok(nfa)
    }
}

fn number(
    numbering: &mut IndexMap<Option<StateId>, StateId>,
    queue: &mut VecDeque<StateId>,
    state: StateId,
) -> StateId {
    let next = numbering.len() as StateId;
    *numbering.entry(Some(state)).or_insert_with(|| {
        queue.push_back(state);
        next
    })
}

impl CheckedDevice {
    pub fn to_record(&self) -> AutomatonRecord {
        self.nfa().to_record()
    }

    pub fn from_record(record: &AutomatonRecord) -> Result<Self> {
        Ok(CheckedDevice::new(EpsilonNFA::from_record(record)?))
    }
}
