//! Formal language toolkit used by the verifier.
//!
//! This module provides epsilon-NFA and DFA implementations with:
//! - Epsilon closure computation
//! - Subset construction (NFA to DFA conversion), optionally state-budgeted
//! - Partition-refinement DFA minimization
//! - Products, complement, containment and shuffle (free interleaving)
//! - Shortest-witness and divergence searches
//! - Regular expressions, Thompson construction and GNFA state elimination

mod dfa;
mod epsilon_nfa;
mod gnfa;
mod interner;
mod operations;
mod regex;
mod search;
mod state;
mod subset_construction;
mod symbol;

pub use dfa::DFA;
pub use epsilon_nfa::EpsilonNFA;
pub use gnfa::nfa_to_regex;
pub use interner::StateInterner;
pub use operations::{ProductMode, bounded_shuffle, shuffle};
pub use regex::{Regex, regex_to_nfa};
pub use state::{StateId, StateSet};
pub use subset_construction::{bounded_subset_construction, subset_construction};
pub use symbol::{INSTANCE_SEPARATOR, Label, Symbol, is_epsilon, word};
