//! Language operations: products, complement, containment and shuffle.

use crate::error::Result;
use crate::formlang::dfa::DFA;
use crate::formlang::epsilon_nfa::EpsilonNFA;
use crate::formlang::interner::StateInterner;
use crate::formlang::state::StateId;
use crate::formlang::symbol::Symbol;
use std::collections::VecDeque;

/// How a product automaton decides acceptance from its two components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductMode {
    Intersection,
    Union,
    /// Accepted by the left operand and rejected by the right one.
    Difference,
}

impl ProductMode {
    fn accepts(self, left: bool, right: bool) -> bool {
        match self {
            ProductMode::Intersection => left && right,
            ProductMode::Union => left || right,
            ProductMode::Difference => left && !right,
        }
    }

    /// Whether a pair whose left/right side fell into the sink can still accept.
    fn keeps(self, left: Option<StateId>, right: Option<StateId>) -> bool {
        match self {
            ProductMode::Intersection => left.is_some() && right.is_some(),
            ProductMode::Union => left.is_some() || right.is_some(),
            ProductMode::Difference => left.is_some(),
        }
    }
}

type Pair = (Option<StateId>, Option<StateId>);

impl DFA {
    /// Synchronous product over the union of both alphabets. A missing
    /// transition on either side counts as a move into that side's sink.
    pub fn product(&self, other: &DFA, mode: ProductMode) -> DFA {
        let alphabet = self.alphabet().union(other.alphabet()).cloned();
        let mut result = DFA::with_alphabet(alphabet);

        let start: Pair = (self.start_state(), other.start_state());
        if !mode.keeps(start.0, start.1) {
            return result;
        }

        let mut pairs = StateInterner::new("product", usize::MAX);
        let mut queue = VecDeque::new();
        let accepting = |(left, right): Pair| {
            mode.accepts(
                left.is_some_and(|s| self.is_final(s)),
                right.is_some_and(|s| other.is_final(s)),
            )
        };

        let intern = |pairs: &mut StateInterner<Pair>, pair: Pair| match pairs.intern(pair) {
            Ok(found) => found,
            Err(err) => unreachable!("unbounded product failed: {err}"),
        };

        let (start_id, _) = intern(&mut pairs, start);
        result.add_state();
        result.set_start_state(start_id);
        if accepting(start) {
            result.add_final_state(start_id);
        }
        queue.push_back((start_id, start));

        let symbols: Vec<_> = result.alphabet().iter().cloned().collect();
        while let Some((current, (left, right))) = queue.pop_front() {
            for symbol in &symbols {
                let next: Pair = (
                    left.and_then(|s| self.transition(s, symbol)),
                    right.and_then(|s| other.transition(s, symbol)),
                );
                if !mode.keeps(next.0, next.1) {
                    continue;
                }
                let (id, is_new) = intern(&mut pairs, next);
                if is_new {
                    result.add_state();
                    if accepting(next) {
                        result.add_final_state(id);
                    }
                    queue.push_back((id, next));
                }
                result.add_transition(current, symbol.clone(), id);
            }
        }

        result
    }

    pub fn intersection(&self, other: &DFA) -> DFA {
        self.product(other, ProductMode::Intersection)
    }

    pub fn union(&self, other: &DFA) -> DFA {
        self.product(other, ProductMode::Union)
    }

    /// Words accepted by `self` but not by `other` (`self ∩ ¬other`).
    pub fn subtract(&self, other: &DFA) -> DFA {
        self.product(other, ProductMode::Difference)
    }

    /// Complement relative to `Σ*`, where `Σ` is this alphabet extended by `extra`.
    pub fn complement<I: IntoIterator<Item = Symbol>>(&self, extra: I) -> DFA {
        let total = self.complete(extra);
        let mut flipped = DFA::with_alphabet(total.alphabet().iter().cloned());
        for state in 0..total.num_states() {
            flipped.add_state();
            if !total.is_final(state) {
                flipped.add_final_state(state);
            }
        }
        if let Some(start) = total.start_state() {
            flipped.set_start_state(start);
        }
        for (src, symbol, dst) in total.transitions() {
            flipped.add_transition(src, symbol.clone(), dst);
        }
        flipped
    }

    /// Whether every word of `other` is a word of `self`.
    pub fn contains(&self, other: &DFA) -> bool {
        other.subtract(self).is_empty()
    }

    pub fn is_equivalent(&self, other: &DFA) -> bool {
        self.contains(other) && other.contains(self)
    }

    /// View this DFA as an ε-free NFA with the same states.
    pub fn to_nfa(&self) -> EpsilonNFA {
        let mut nfa = EpsilonNFA::with_alphabet(self.alphabet().iter().cloned());
        for _ in 0..self.num_states() {
            nfa.add_state();
        }
        if let Some(start) = self.start_state() {
            nfa.add_start_state(start);
        }
        for state in self.final_states().iter() {
            nfa.add_final_state(state);
        }
        for (src, symbol, dst) in self.transitions() {
            nfa.add_transition(src, symbol.clone(), dst);
        }
        nfa
    }
}

/// Free interleaving of two automata.
///
/// A state is a pair of component states. Epsilon moves and symbols advance one
/// side at a time; a symbol known to both sides may advance either. A pair
/// accepts when both components accept.
pub fn shuffle(left: &EpsilonNFA, right: &EpsilonNFA) -> EpsilonNFA {
    match bounded_shuffle(left, right, usize::MAX) {
        Ok(nfa) => nfa,
        Err(err) => unreachable!("unbounded shuffle failed: {err}"),
    }
}

/// [`shuffle`] with a cap on the number of product states.
pub fn bounded_shuffle(
    left: &EpsilonNFA,
    right: &EpsilonNFA,
    max_states: usize,
) -> Result<EpsilonNFA> {
    let alphabet = left.alphabet().union(right.alphabet()).cloned();
    let mut result = EpsilonNFA::with_alphabet(alphabet);
    let mut pairs: StateInterner<(StateId, StateId)> = StateInterner::new("shuffle", max_states);
    let mut queue = VecDeque::new();

    let visit = |result: &mut EpsilonNFA,
                 pairs: &mut StateInterner<(StateId, StateId)>,
                 queue: &mut VecDeque<(StateId, (StateId, StateId))>,
                 pair: (StateId, StateId)|
     -> Result<StateId> {
        let (id, is_new) = pairs.intern(pair)?;
        if is_new {
            result.add_state();
            if left.is_final(pair.0) && right.is_final(pair.1) {
                result.add_final_state(id);
            }
            queue.push_back((id, pair));
        }
        Ok(id)
    };

    for l in left.start_states().iter() {
        for r in right.start_states().iter() {
            let id = visit(&mut result, &mut pairs, &mut queue, (l, r))?;
            result.add_start_state(id);
        }
    }

    while let Some((current, (l, r))) = queue.pop_front() {
        for label in left.labels() {
            let Some(targets) = left.successors(l, &label) else {
                continue;
            };
            for next in targets.iter() {
                let id = visit(&mut result, &mut pairs, &mut queue, (next, r))?;
                result.add_labeled_transition(current, label.clone(), id);
            }
        }
        for label in right.labels() {
            let Some(targets) = right.successors(r, &label) else {
                continue;
            };
            for next in targets.iter() {
                let id = visit(&mut result, &mut pairs, &mut queue, (l, next))?;
                result.add_labeled_transition(current, label.clone(), id);
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formlang::subset_construction::subset_construction;
    use crate::formlang::symbol::word;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    /// Accepts exactly the given word.
    fn literal(symbols: &[&str]) -> EpsilonNFA {
        let mut nfa = EpsilonNFA::new();
        let mut state = nfa.add_state();
        nfa.add_start_state(state);
        for s in symbols {
            let next = nfa.add_state();
            nfa.add_transition(state, sym(s), next);
            state = next;
        }
        nfa.add_final_state(state);
        nfa
    }

    fn dfa(symbols: &[&str]) -> DFA {
        subset_construction(&literal(symbols))
    }

    #[test]
    fn test_intersection_and_union() {
        let ab = dfa(&["a", "b"]);
        let a = dfa(&["a"]);

        let both = ab.union(&a);
        assert!(both.accepts(&word(["a"])));
        assert!(both.accepts(&word(["a", "b"])));
        assert!(ab.intersection(&a).is_empty());
        assert!(ab.intersection(&both).accepts(&word(["a", "b"])));
    }

    #[test]
    fn test_subtract_and_contains() {
        let ab = dfa(&["a", "b"]);
        let a = dfa(&["a"]);
        let either = ab.union(&a);

        let only_ab = either.subtract(&a);
        assert!(only_ab.accepts(&word(["a", "b"])));
        assert!(!only_ab.accepts(&word(["a"])));

        assert!(either.contains(&a));
        assert!(!a.contains(&either));
        assert!(only_ab.is_equivalent(&ab));
    }

    #[test]
    fn test_complement_over_extended_alphabet() {
        let a = dfa(&["a"]);
        let not_a = a.complement([sym("b")]);
        assert!(!not_a.accepts(&word(["a"])));
        assert!(not_a.accepts(&[]));
        assert!(not_a.accepts(&word(["b"])));
        assert!(not_a.accepts(&word(["a", "a"])));
        assert!(a.intersection(&not_a).is_empty());
    }

    #[test]
    fn test_shuffle_interleaves() {
        let ab = literal(&["a", "b"]);
        let c = literal(&["c"]);
        let mixed = shuffle(&ab, &c);

        for w in [["c", "a", "b"], ["a", "c", "b"], ["a", "b", "c"]] {
            assert!(mixed.accepts(&word(w)), "{w:?}");
        }
        assert!(!mixed.accepts(&word(["b", "a", "c"])));
        assert!(!mixed.accepts(&word(["a", "b"])));
    }

    #[test]
    fn test_shuffle_shared_symbol_advances_either_side() {
        let left = literal(&["a", "b"]);
        let right = literal(&["a"]);
        let mixed = shuffle(&left, &right);
        assert!(mixed.accepts(&word(["a", "a", "b"])));
        assert!(mixed.accepts(&word(["a", "b", "a"])));
        assert!(!mixed.accepts(&word(["a", "b"])));
    }

    #[test]
    fn test_shuffle_budget() {
        let left = literal(&["a", "b", "c"]);
        let right = literal(&["x", "y", "z"]);
        assert!(bounded_shuffle(&left, &right, 16).is_ok());
        assert!(bounded_shuffle(&left, &right, 15).is_err());
    }

    #[test]
    fn test_to_nfa_keeps_language() {
        let ab = dfa(&["a", "b"]);
        let nfa = ab.to_nfa();
        assert!(nfa.accepts(&word(["a", "b"])));
        assert!(!nfa.accepts(&word(["a"])));
    }
}
