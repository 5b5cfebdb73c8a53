//! Assembly options.

use serde::{Deserialize, Serialize};

/// Name of the reserved state every macro automaton starts in.
pub const DEFAULT_START_STATE: &str = "$START";

/// Default cap on the states any single exploration may create.
pub const DEFAULT_MAX_STATES: usize = 100_000;

/// Knobs for [`crate::AssembledDevice::make_with`].
///
/// Hosts usually deserialize this from their own configuration; every field
/// has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Upper bound on the states created by one determinization, shuffle,
    /// encoding or formula exploration.
    pub max_states: usize,
    /// Minimize every subsystem (and every partial composition) before
    /// shuffling it with the next one. Does not change verdicts or
    /// counterexamples, only the size of intermediate automata.
    pub minimize_components: bool,
    /// Name of the reserved macro start state; must not be an event name.
    pub start_state_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_states: DEFAULT_MAX_STATES,
            minimize_components: true,
            start_state_name: DEFAULT_START_STATE.to_string(),
        }
    }
}
