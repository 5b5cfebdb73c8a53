//! Detection of micro traces that implement more than one macro trace.

use crate::encoder::{MacroState, MicroBehavior};
use crate::formlang::Symbol;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A micro trace after which the device cannot tell which macro events ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityFailure {
    pub micro_trace: Vec<Symbol>,
    pub macro_traces: (Vec<Symbol>, Vec<Symbol>),
}

/// Find the shortest micro trace reaching a micro DFA state that holds two
/// distinct macro states.
pub fn find_ambiguity(micro: &MicroBehavior) -> Option<AmbiguityFailure> {
    let dfa = micro.dfa();
    let micro_trace = dfa.shortest_word(|state| micro.macro_states(state).len() > 1)?;

    let Some(state) = dfa.run(&micro_trace) else {
        unreachable!("the witness was found by walking the DFA");
    };
    let witnesses = micro.macro_states(state);
    let mut witnesses = witnesses.into_iter();
    let (Some(first), Some(second)) = (witnesses.next(), witnesses.next()) else {
        unreachable!("the witness state holds two macro states");
    };

    let decode = |macro_state: &MacroState| {
        let Some(target) = micro.macro_state_id(macro_state) else {
            unreachable!("macro states of the DFA come from the encoding");
        };
        micro
            .decode_path(&micro_trace, |state| state == target)
            .unwrap_or_default()
    };
    let macro_traces = (decode(first), decode(second));

    debug!(?micro_trace, ?macro_traces, "ambiguous micro trace");
    Some(AmbiguityFailure {
        micro_trace,
        macro_traces,
    })
}
