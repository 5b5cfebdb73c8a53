//! Regular expressions over symbols.
//!
//! The variants can be built directly, but the lower-case constructors
//! ([`Regex::concat`], [`Regex::union`], [`Regex::star`]) apply the algebraic
//! identities of regular languages and should be preferred:
//!
//! - `∅` absorbs concatenation and is the identity of union,
//! - `ε` is the identity of concatenation,
//! - union is idempotent and its operands are kept in a canonical order,
//! - `∅* = ε* = ε` and `(r*)* = r*`.

use crate::formlang::epsilon_nfa::EpsilonNFA;
use crate::formlang::state::StateId;
use crate::formlang::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Regex {
    /// The empty language.
    Nil,
    /// The language holding only the empty word.
    Empty,
    Char(Symbol),
    Concat(Box<Regex>, Box<Regex>),
    Union(Box<Regex>, Box<Regex>),
    Star(Box<Regex>),
}

impl Regex {
    pub fn char(symbol: impl Into<Symbol>) -> Self {
        Regex::Char(symbol.into())
    }

    pub fn concat(left: Regex, right: Regex) -> Self {
        match (left, right) {
            (Regex::Nil, _) | (_, Regex::Nil) => Regex::Nil,
            (Regex::Empty, other) | (other, Regex::Empty) => other,
            (left, right) => Regex::Concat(Box::new(left), Box::new(right)),
        }
    }

    pub fn union(left: Regex, right: Regex) -> Self {
        match (left, right) {
            (Regex::Nil, other) | (other, Regex::Nil) => other,
            (left, right) if left == right => left,
            (Regex::Empty, Regex::Star(child)) | (Regex::Star(child), Regex::Empty) => {
                Regex::Star(child)
            }
            (left, right) if right < left => Regex::Union(Box::new(right), Box::new(left)),
            (left, right) => Regex::Union(Box::new(left), Box::new(right)),
        }
    }

    pub fn star(child: Regex) -> Self {
        match child {
            Regex::Nil | Regex::Empty => Regex::Empty,
            star @ Regex::Star(_) => star,
            child => Regex::Star(Box::new(child)),
        }
    }

    /// Concatenate a sequence, e.g. the calls `b.pressed; b.released;` of a rule.
    pub fn sequence<I: IntoIterator<Item = Regex>>(items: I) -> Self {
        items.into_iter().fold(Regex::Empty, Regex::concat)
    }

    /// Union of alternatives; `Nil` when there are none.
    pub fn choice<I: IntoIterator<Item = Regex>>(items: I) -> Self {
        items.into_iter().fold(Regex::Nil, Regex::union)
    }

    /// All symbols mentioned by this expression.
    pub fn chars(&self) -> BTreeSet<Symbol> {
        let mut chars = BTreeSet::new();
        self.collect_chars(&mut chars);
        chars
    }

    fn collect_chars(&self, chars: &mut BTreeSet<Symbol>) {
        match self {
            Regex::Nil | Regex::Empty => {}
            Regex::Char(symbol) => {
                chars.insert(symbol.clone());
            }
            Regex::Concat(left, right) | Regex::Union(left, right) => {
                left.collect_chars(chars);
                right.collect_chars(chars);
            }
            Regex::Star(child) => child.collect_chars(chars),
        }
    }

    /// Whether the empty word belongs to the language.
    pub fn accepts_empty(&self) -> bool {
        match self {
            Regex::Nil | Regex::Char(_) => false,
            Regex::Empty | Regex::Star(_) => true,
            Regex::Concat(left, right) => left.accepts_empty() && right.accepts_empty(),
            Regex::Union(left, right) => left.accepts_empty() || right.accepts_empty(),
        }
    }

    pub fn to_nfa<I: IntoIterator<Item = Symbol>>(&self, alphabet: I) -> EpsilonNFA {
        regex_to_nfa(self, alphabet)
    }
}

/// Thompson construction: one start state and one final state, joined by
/// epsilon edges following the structure of `regex`. The NFA alphabet is
/// `alphabet` extended with every symbol of the expression.
pub fn regex_to_nfa<I: IntoIterator<Item = Symbol>>(regex: &Regex, alphabet: I) -> EpsilonNFA {
    let mut nfa = EpsilonNFA::with_alphabet(alphabet);
    let (start, end) = build_fragment(regex, &mut nfa);
    nfa.add_start_state(start);
    nfa.add_final_state(end);
    nfa.compute_epsilon_closures();
    nfa
}

fn build_fragment(regex: &Regex, nfa: &mut EpsilonNFA) -> (StateId, StateId) {
    match regex {
        Regex::Nil => (nfa.add_state(), nfa.add_state()),
        Regex::Empty => {
            let (start, end) = (nfa.add_state(), nfa.add_state());
            nfa.add_epsilon_transition(start, end);
            (start, end)
        }
        Regex::Char(symbol) => {
            let (start, end) = (nfa.add_state(), nfa.add_state());
            nfa.add_transition(start, symbol.clone(), end);
            (start, end)
        }
        Regex::Concat(left, right) => {
            let (left_start, left_end) = build_fragment(left, nfa);
            let (right_start, right_end) = build_fragment(right, nfa);
            nfa.add_epsilon_transition(left_end, right_start);
            (left_start, right_end)
        }
        Regex::Union(left, right) => {
            let start = nfa.add_state();
            let (left_start, left_end) = build_fragment(left, nfa);
            let (right_start, right_end) = build_fragment(right, nfa);
            let end = nfa.add_state();
            nfa.add_epsilon_transition(start, left_start);
            nfa.add_epsilon_transition(start, right_start);
            nfa.add_epsilon_transition(left_end, end);
            nfa.add_epsilon_transition(right_end, end);
            (start, end)
        }
        Regex::Star(child) => {
            let start = nfa.add_state();
            let (child_start, child_end) = build_fragment(child, nfa);
            let end = nfa.add_state();
            nfa.add_epsilon_transition(start, child_start);
            nfa.add_epsilon_transition(start, end);
            nfa.add_epsilon_transition(child_end, child_start);
            nfa.add_epsilon_transition(child_end, end);
            (start, end)
        }
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_regex(self, f, 0)
    }
}

/// Precedence: 0 = union, 1 = concatenation, 2 = star operand.
fn write_regex(regex: &Regex, f: &mut fmt::Formatter<'_>, precedence: u8) -> fmt::Result {
    match regex {
        Regex::Nil => f.write_str("∅"),
        Regex::Empty => f.write_str("ε"),
        Regex::Char(symbol) => write!(f, "{symbol}"),
        Regex::Union(left, right) => {
            if precedence > 0 {
                f.write_str("(")?;
            }
            write_regex(left, f, 0)?;
            f.write_str(" + ")?;
            write_regex(right, f, 0)?;
            if precedence > 0 {
                f.write_str(")")?;
            }
            Ok(())
        }
        Regex::Concat(left, right) => {
            if precedence > 1 {
                f.write_str("(")?;
            }
            write_regex(left, f, 1)?;
            f.write_str(" · ")?;
            write_regex(right, f, 1)?;
            if precedence > 1 {
                f.write_str(")")?;
            }
            Ok(())
        }
        Regex::Star(child) => {
            write_regex(child, f, 2)?;
            f.write_str("*")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formlang::symbol::word;

    fn c(s: &str) -> Regex {
        Regex::char(s)
    }

    #[test]
    fn test_simplification() {
        assert_eq!(Regex::concat(Regex::Nil, c("a")), Regex::Nil);
        assert_eq!(Regex::concat(Regex::Empty, c("a")), c("a"));
        assert_eq!(Regex::union(Regex::Nil, c("a")), c("a"));
        assert_eq!(Regex::union(c("a"), c("a")), c("a"));
        assert_eq!(Regex::union(c("b"), c("a")), Regex::union(c("a"), c("b")));
        assert_eq!(Regex::star(Regex::Nil), Regex::Empty);
        assert_eq!(Regex::star(Regex::star(c("a"))), Regex::star(c("a")));
        assert_eq!(
            Regex::union(Regex::Empty, Regex::star(c("a"))),
            Regex::star(c("a"))
        );
        assert_eq!(Regex::sequence([]), Regex::Empty);
        assert_eq!(Regex::choice([]), Regex::Nil);
    }

    #[test]
    fn test_chars_and_empty_word() {
        let r = Regex::sequence([c("b.pressed"), Regex::star(c("b.released"))]);
        assert_eq!(
            r.chars().into_iter().collect::<Vec<_>>(),
            word(["b.pressed", "b.released"])
        );
        assert!(!r.accepts_empty());
        assert!(Regex::star(r).accepts_empty());
    }

    #[test]
    fn test_regex_to_nfa() {
        // a (b + c)*
        let r = Regex::concat(c("a"), Regex::star(Regex::union(c("b"), c("c"))));
        let nfa = regex_to_nfa(&r, word(["d"]));

        assert!(nfa.alphabet().contains("d"));
        assert!(nfa.accepts(&word(["a"])));
        assert!(nfa.accepts(&word(["a", "c", "b", "b"])));
        assert!(!nfa.accepts(&word(["b"])));
        assert!(!nfa.accepts(&word(["a", "d"])));
    }

    #[test]
    fn test_nil_and_empty_nfas() {
        let nil = regex_to_nfa(&Regex::Nil, []);
        assert!(nil.is_empty());
        let empty = regex_to_nfa(&Regex::Empty, []);
        assert!(empty.accepts(&[]));
        assert!(!empty.accepts(&word(["a"])));
    }

    #[test]
    fn test_raw_variants_are_accepted() {
        let r = Regex::Union(
            Box::new(Regex::Nil),
            Box::new(Regex::Concat(Box::new(Regex::Empty), Box::new(c("a")))),
        );
        assert!(r.to_nfa([]).accepts(&word(["a"])));
    }

    #[test]
    fn test_display() {
        let r = Regex::concat(c("a"), Regex::star(Regex::union(c("b"), c("c"))));
        assert_eq!(r.to_string(), "a · (b + c)*");
        assert_eq!(Regex::Nil.to_string(), "∅");
    }

    #[test]
    fn test_serde_shape() {
        let r = Regex::concat(c("a"), Regex::Empty);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"Char":"a"}"#);
        let back: Regex = serde_json::from_str(r#"{"Star":{"Char":"x"}}"#).unwrap();
        assert_eq!(back, Regex::star(c("x")));
    }
}
