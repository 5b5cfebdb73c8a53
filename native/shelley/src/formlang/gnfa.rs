//! Conversion from automata back to regular expressions by state elimination.

use crate::formlang::epsilon_nfa::EpsilonNFA;
use crate::formlang::regex::Regex;
use crate::formlang::state::StateId;
use crate::formlang::symbol::Label;
use std::collections::BTreeMap;

type Node = usize;

/// A generalized NFA: edges are labelled by regular expressions and a missing
/// edge stands for `∅`.
#[derive(Debug, Default)]
struct Gnfa {
    edges: BTreeMap<(Node, Node), Regex>,
}

impl Gnfa {
    fn add(&mut self, src: Node, dst: Node, label: Regex) {
        let current = self.edges.remove(&(src, dst)).unwrap_or(Regex::Nil);
        let merged = Regex::union(current, label);
        if merged != Regex::Nil {
            self.edges.insert((src, dst), merged);
        }
    }

    fn label(&self, src: Node, dst: Node) -> Regex {
        self.edges.get(&(src, dst)).cloned().unwrap_or(Regex::Nil)
    }

    /// Remove `node`, rerouting every path `i -> node -> j` through a direct
    /// edge `i -> j` labelled `r(i,node) · r(node,node)* · r(node,j)`.
    fn eliminate(&mut self, node: Node) {
        let self_loop = Regex::star(self.label(node, node));
        let incoming: Vec<(Node, Regex)> = self
            .edges
            .iter()
            .filter(|((src, dst), _)| *dst == node && *src != node)
            .map(|((src, _), label)| (*src, label.clone()))
            .collect();
        let outgoing: Vec<(Node, Regex)> = self
            .edges
            .iter()
            .filter(|((src, dst), _)| *src == node && *dst != node)
            .map(|((_, dst), label)| (*dst, label.clone()))
            .collect();

        self.edges.retain(|(src, dst), _| *src != node && *dst != node);

        for (src, into) in &incoming {
            let through = Regex::concat(into.clone(), self_loop.clone());
            for (dst, out) in &outgoing {
                self.add(*src, *dst, Regex::concat(through.clone(), out.clone()));
            }
        }
    }
}

/// Convert an automaton into an equivalent regular expression.
///
/// A fresh start node feeds every start state and every final state feeds a
/// fresh end node, both through `ε` edges. Original states are then eliminated
/// in ascending state-id order, which fixes the shape of the result; only the
/// language is meaningful. Returns `Nil` when nothing is accepted.
pub fn nfa_to_regex(nfa: &EpsilonNFA) -> Regex {
    let count = nfa.num_states() as Node;
    let (start, end) = (count, count + 1);

    // Parallel edges merge in the order they are added.
    let mut edges: Vec<(StateId, &Label, StateId)> = nfa.transitions().collect();
    edges.sort_unstable();

    let mut gnfa = Gnfa::default();
    for (src, label, dst) in edges {
        let label = label.clone().map_or(Regex::Empty, Regex::Char);
        gnfa.add(src as Node, dst as Node, label);
    }
    for state in nfa.start_states().iter() {
        gnfa.add(start, state as Node, Regex::Empty);
    }
    for state in nfa.final_states().iter() {
        gnfa.add(state as Node, end, Regex::Empty);
    }

    for node in 0..count {
        gnfa.eliminate(node);
    }

    gnfa.label(start, end)
}

impl From<&EpsilonNFA> for Regex {
    fn from(nfa: &EpsilonNFA) -> Self {
        nfa_to_regex(nfa)
    }
}
