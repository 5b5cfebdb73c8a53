//! Verification that integration rules only use subsystems the way their own
//! contracts allow.

use crate::config::Options;
use crate::device::{Component, instantiate};
use crate::encoder::MicroBehavior;
use crate::error::Result;
use crate::formlang::{DFA, EpsilonNFA, Symbol, bounded_shuffle, bounded_subset_construction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// What one subsystem saw of a failing micro trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentError {
    /// The calls addressed to the subsystem, without the instance prefix.
    pub sub_trace: Vec<Symbol>,
    /// First call the subsystem rejects (see [`DFA::divergence_index`]).
    pub divergence_index: usize,
}

/// A micro trace the device requires but its subsystems cannot produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerIntegrationFailure {
    pub micro_trace: Vec<Symbol>,
    pub macro_trace: Vec<Symbol>,
    pub component_errors: BTreeMap<String, ComponentError>,
}

/// All interleavings of the subsystem behaviors, as one minimal DFA.
///
/// Components are folded left to right in the given order. With
/// `options.minimize_components` every operand is determinized and minimized
/// before each shuffle, which keeps intermediate automata small. No
/// components compose to the language of the empty word.
pub fn compose_components(components: &[Component<'_>], options: &Options) -> Result<DFA> {
    let mut composed: Option<EpsilonNFA> = None;
    for component in components {
        let next = if options.minimize_components {
            instantiate(&component.device.dfa().to_nfa(), component.instance)
        } else {
            component.nfa.clone()
        };
        composed = Some(match composed {
            None => next,
            Some(acc) => {
                let acc = if options.minimize_components {
                    bounded_subset_construction(&acc, options.max_states)?
                        .minimize()
                        .to_nfa()
                } else {
                    acc
                };
                bounded_shuffle(&acc, &next, options.max_states)?
            }
        });
        trace!(instance = component.instance, "shuffled component");
    }

    let Some(composed) = composed else {
        let mut idle = DFA::new();
        let state = idle.add_state();
        idle.set_start_state(state);
        idle.add_final_state(state);
        return Ok(idle);
    };
    let dfa = bounded_subset_construction(&composed, options.max_states)?.minimize();
    debug!(
        components = components.len(),
        states = dfa.num_states(),
        "composed subsystem behaviors"
    );
    Ok(dfa)
}

/// Split a micro trace into one sub-trace per instance, on the first
/// separator of every symbol. Symbols without an instance are dropped.
pub fn demultiplex(trace: &[Symbol]) -> BTreeMap<String, Vec<Symbol>> {
    let mut split: BTreeMap<String, Vec<Symbol>> = BTreeMap::new();
    for symbol in trace {
        if let Some((instance, operation)) = symbol.split_instance() {
            split
                .entry(instance.to_string())
                .or_default()
                .push(Symbol::new(operation));
        }
    }
    split
}

/// Check that every micro trace the device requires is an interleaving of
/// valid subsystem traces. Returns the shortest offending trace otherwise.
pub fn verify_integration(
    micro: &MicroBehavior,
    components: &[Component<'_>],
    options: &Options,
) -> Result<Option<TriggerIntegrationFailure>> {
    let all_possible = compose_components(components, options)?;
    let impossible = micro.dfa().subtract(&all_possible);
    let Some(micro_trace) = impossible.shortest_accepted() else {
        return Ok(None);
    };

    let Some(macro_trace) = micro.decode_macro_trace(&micro_trace) else {
        unreachable!("an accepted micro trace always decodes");
    };

    let mut sub_traces = demultiplex(&micro_trace);
    let mut component_errors = BTreeMap::new();
    for component in components {
        let sub_trace = sub_traces.remove(component.instance).unwrap_or_default();
        if let Some(divergence_index) = component.device.divergence_index(&sub_trace) {
            component_errors.insert(
                component.instance.to_string(),
                ComponentError {
                    sub_trace,
                    divergence_index,
                },
            );
        }
    }

    debug!(?micro_trace, ?macro_trace, "integration failure");
    Ok(Some(TriggerIntegrationFailure {
        micro_trace,
        macro_trace,
        component_errors,
    }))
}
