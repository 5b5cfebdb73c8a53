//! Linear temporal logic over finite traces.
//!
//! [`Formula::holds_on`] evaluates a formula directly on a word.
//! [`Formula::to_dfa`] builds the equivalent automaton by progression over the
//! negation normal form: a state is a disjunction of clauses, each clause a set
//! of obligations on subformulas for the next position. There are finitely
//! many such sets, so the construction always terminates.

use crate::error::Result;
use crate::formlang::{DFA, StateInterner, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use tracing::trace;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Formula {
    True,
    False,
    /// The current symbol is this one.
    Action(Symbol),
    Not(Box<Formula>),
    And(BTreeSet<Formula>),
    Or(BTreeSet<Formula>),
    /// Strong next: there is a next position and it satisfies the operand.
    Next(Box<Formula>),
    Until(Box<Formula>, Box<Formula>),
    Eventually(Box<Formula>),
    Always(Box<Formula>),
}

impl Formula {
    pub fn action(symbol: impl Into<Symbol>) -> Self {
        Formula::Action(symbol.into())
    }

    pub fn not(formula: Formula) -> Self {
        match formula {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(inner) => *inner,
            formula => Formula::Not(Box::new(formula)),
        }
    }

    pub fn and(left: Formula, right: Formula) -> Self {
        Self::all([left, right])
    }

    pub fn or(left: Formula, right: Formula) -> Self {
        Self::any([left, right])
    }

    pub fn implies(premise: Formula, conclusion: Formula) -> Self {
        Self::or(Self::not(premise), conclusion)
    }

    /// Conjunction of every operand; `True` when there are none.
    pub fn all<I: IntoIterator<Item = Formula>>(operands: I) -> Self {
        let mut flat = BTreeSet::new();
        for operand in operands {
            match operand {
                Formula::True => {}
                Formula::False => return Formula::False,
                Formula::And(inner) => flat.extend(inner),
                operand => {
                    flat.insert(operand);
                }
            }
        }
        collapse(flat, Formula::True, Formula::And)
    }

    /// Disjunction of every operand; `False` when there are none.
    pub fn any<I: IntoIterator<Item = Formula>>(operands: I) -> Self {
        let mut flat = BTreeSet::new();
        for operand in operands {
            match operand {
                Formula::False => {}
                Formula::True => return Formula::True,
                Formula::Or(inner) => flat.extend(inner),
                operand => {
                    flat.insert(operand);
                }
            }
        }
        collapse(flat, Formula::False, Formula::Or)
    }

    pub fn next(formula: Formula) -> Self {
        Formula::Next(Box::new(formula))
    }

    pub fn until(hold: Formula, goal: Formula) -> Self {
        Formula::Until(Box::new(hold), Box::new(goal))
    }

    pub fn eventually(formula: Formula) -> Self {
        Formula::Eventually(Box::new(formula))
    }

    pub fn always(formula: Formula) -> Self {
        Formula::Always(Box::new(formula))
    }

    /// Whether the formula holds at the first position of `word`.
    pub fn holds_on(&self, word: &[Symbol]) -> bool {
        self.truth(word)[0]
    }

    /// Truth value at every position `0..=word.len()`; the last one is the
    /// empty remainder.
    fn truth(&self, word: &[Symbol]) -> Vec<bool> {
        let n = word.len();
        match self {
            Formula::True => vec![true; n + 1],
            Formula::False => vec![false; n + 1],
            Formula::Action(expected) => (0..=n).map(|i| word.get(i) == Some(expected)).collect(),
            Formula::Not(inner) => inner.truth(word).into_iter().map(|b| !b).collect(),
            Formula::And(operands) => operands.iter().fold(vec![true; n + 1], |acc, operand| {
                acc.into_iter().zip(operand.truth(word)).map(|(l, r)| l && r).collect()
            }),
            Formula::Or(operands) => operands.iter().fold(vec![false; n + 1], |acc, operand| {
                acc.into_iter().zip(operand.truth(word)).map(|(l, r)| l || r).collect()
            }),
            Formula::Next(inner) => {
                let inner = inner.truth(word);
                (0..=n).map(|i| i + 1 < n && inner[i + 1]).collect()
            }
            Formula::Until(hold, goal) => {
                let (hold, goal) = (hold.truth(word), goal.truth(word));
                backwards(n, false, |i, later| goal[i] || (hold[i] && later))
            }
            Formula::Eventually(inner) => {
                let inner = inner.truth(word);
                backwards(n, false, |i, later| inner[i] || later)
            }
            Formula::Always(inner) => {
                let inner = inner.truth(word);
                backwards(n, true, |i, later| inner[i] && later)
            }
        }
    }

    /// Symbols the formula mentions.
    pub fn actions(&self) -> BTreeSet<Symbol> {
        let mut actions = BTreeSet::new();
        self.collect_actions(&mut actions);
        actions
    }

    fn collect_actions(&self, actions: &mut BTreeSet<Symbol>) {
        match self {
            Formula::True | Formula::False => {}
            Formula::Action(symbol) => {
                actions.insert(symbol.clone());
            }
            Formula::Not(inner)
            | Formula::Next(inner)
            | Formula::Eventually(inner)
            | Formula::Always(inner) => inner.collect_actions(actions),
            Formula::And(operands) | Formula::Or(operands) => {
                for operand in operands {
                    operand.collect_actions(actions);
                }
            }
            Formula::Until(hold, goal) => {
                hold.collect_actions(actions);
                goal.collect_actions(actions);
            }
        }
    }

    /// Push negations down to actions, replacing `F`/`G` by their `U`/`R`
    /// encodings.
    fn normalize(&self, negated: bool) -> Nnf {
        let both = |operands: &BTreeSet<Formula>| -> Vec<Nnf> {
            operands.iter().map(|operand| operand.normalize(negated)).collect()
        };
        let boxed = |formula: &Formula, negated: bool| Box::new(formula.normalize(negated));
        match (self, negated) {
            (Formula::True, false) | (Formula::False, true) => Nnf::True,
            (Formula::True, true) | (Formula::False, false) => Nnf::False,
            (Formula::Action(symbol), false) => Nnf::Is(symbol.clone()),
            (Formula::Action(symbol), true) => Nnf::IsNot(symbol.clone()),
            (Formula::Not(inner), _) => inner.normalize(!negated),
            (Formula::And(operands), false) | (Formula::Or(operands), true) => {
                Nnf::And(both(operands))
            }
            (Formula::Or(operands), false) | (Formula::And(operands), true) => {
                Nnf::Or(both(operands))
            }
            (Formula::Next(inner), false) => Nnf::Next(boxed(inner, false)),
            (Formula::Next(inner), true) => Nnf::WeakNext(boxed(inner, true)),
            (Formula::Until(hold, goal), false) => {
                Nnf::Until(boxed(hold, false), boxed(goal, false))
            }
            (Formula::Until(hold, goal), true) => {
                Nnf::Release(boxed(hold, true), boxed(goal, true))
            }
            (Formula::Eventually(inner), false) => {
                Nnf::Until(Box::new(Nnf::True), boxed(inner, false))
            }
            (Formula::Eventually(inner), true) => {
                Nnf::Release(Box::new(Nnf::False), boxed(inner, true))
            }
            (Formula::Always(inner), false) => {
                Nnf::Release(Box::new(Nnf::False), boxed(inner, false))
            }
            (Formula::Always(inner), true) => {
                Nnf::Until(Box::new(Nnf::True), boxed(inner, true))
            }
        }
    }

    /// The total DFA over `alphabet` accepting exactly the words the formula
    /// holds on.
    pub fn to_dfa<I>(&self, alphabet: I, max_states: usize) -> Result<DFA>
    where
        I: IntoIterator<Item = Symbol>,
    {
        let root = self.normalize(false);
        let mut dfa = DFA::with_alphabet(alphabet);
        let symbols: Vec<Symbol> = dfa.alphabet().iter().cloned().collect();
        let mut interner = StateInterner::new("formula", max_states);
        let mut queue = VecDeque::new();

        let initial = Dnf::single(Obligation::Now(&root));
        let (start, _) = interner.intern(initial.clone())?;
        dfa.add_state();
        dfa.set_start_state(start);
        queue.push_back((start, initial));

        while let Some((id, state)) = queue.pop_front() {
            if state.at_end() {
                dfa.add_final_state(id);
            }
            for symbol in &symbols {
                let next = state.progress(symbol);
                let (next_id, fresh) = interner.intern(next.clone())?;
                if fresh {
                    dfa.add_state();
                    queue.push_back((next_id, next));
                }
                dfa.add_transition(id, symbol.clone(), next_id);
            }
        }

        trace!(formula = %self, states = interner.len(), "formula automaton");
        Ok(dfa)
    }
}

/// `values[i] = step(i, values[i + 1])`, seeded with `last` at position `n`.
fn backwards(n: usize, last: bool, mut step: impl FnMut(usize, bool) -> bool) -> Vec<bool> {
    let mut values = vec![last; n + 1];
    for i in (0..n).rev() {
        values[i] = step(i, values[i + 1]);
    }
    values
}

fn collapse(
    mut operands: BTreeSet<Formula>,
    identity: Formula,
    join: fn(BTreeSet<Formula>) -> Formula,
) -> Formula {
    match operands.len() {
        0 => identity,
        1 => operands.pop_first().unwrap_or(identity),
        _ => join(operands),
    }
}

/// Negation normal form. `WeakNext` holds when there is no next position and
/// `Release` is the dual of `Until`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
enum Nnf {
    True,
    False,
    Is(Symbol),
    IsNot(Symbol),
    And(Vec<Nnf>),
    Or(Vec<Nnf>),
    Next(Box<Nnf>),
    WeakNext(Box<Nnf>),
    Until(Box<Nnf>, Box<Nnf>),
    Release(Box<Nnf>, Box<Nnf>),
}

impl Nnf {
    fn at_end(&self) -> bool {
        match self {
            Nnf::True | Nnf::IsNot(_) | Nnf::WeakNext(_) | Nnf::Release(..) => true,
            Nnf::False | Nnf::Is(_) | Nnf::Next(_) | Nnf::Until(..) => false,
            Nnf::And(operands) => operands.iter().all(Nnf::at_end),
            Nnf::Or(operands) => operands.iter().any(Nnf::at_end),
        }
    }

    /// What the rest of the trace owes after `symbol` is read here.
    fn progress<'a>(&'a self, symbol: &Symbol) -> Dnf<'a> {
        match self {
            Nnf::True => Dnf::constant(true),
            Nnf::False => Dnf::constant(false),
            Nnf::Is(expected) => Dnf::constant(expected == symbol),
            Nnf::IsNot(expected) => Dnf::constant(expected != symbol),
            Nnf::And(operands) => operands
                .iter()
                .fold(Dnf::constant(true), |acc, operand| acc.and(&operand.progress(symbol))),
            Nnf::Or(operands) => operands
                .iter()
                .fold(Dnf::constant(false), |acc, operand| acc.or(operand.progress(symbol))),
            Nnf::Next(inner) => Dnf::single(Obligation::Strong(&**inner)),
            Nnf::WeakNext(inner) => Dnf::single(Obligation::Weak(&**inner)),
            Nnf::Until(hold, goal) => {
                let again = hold.progress(symbol).and(&Dnf::single(Obligation::Strong(self)));
                goal.progress(symbol).or(again)
            }
            Nnf::Release(hold, goal) => {
                let stop = hold.progress(symbol).or(Dnf::single(Obligation::Weak(self)));
                goal.progress(symbol).and(&stop)
            }
        }
    }
}

/// A subformula due at some position.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
enum Obligation<'a> {
    /// At the current position, which may be the end of the trace.
    Now(&'a Nnf),
    /// At the next position, which must exist.
    Strong(&'a Nnf),
    /// At the next position, if there is one.
    Weak(&'a Nnf),
}

impl<'a> Obligation<'a> {
    fn formula(&self) -> &'a Nnf {
        match self {
            Obligation::Now(f) | Obligation::Strong(f) | Obligation::Weak(f) => f,
        }
    }

    fn at_end(&self) -> bool {
        match self {
            Obligation::Now(f) => f.at_end(),
            Obligation::Strong(_) => false,
            Obligation::Weak(_) => true,
        }
    }
}

/// Disjunction of conjunctive clauses, kept free of subsumed clauses.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct Dnf<'a>(BTreeSet<BTreeSet<Obligation<'a>>>);

impl<'a> Dnf<'a> {
    fn constant(value: bool) -> Self {
        if value {
            Dnf(BTreeSet::from([BTreeSet::new()]))
        } else {
            Dnf(BTreeSet::new())
        }
    }

    fn single(obligation: Obligation<'a>) -> Self {
        Dnf(BTreeSet::from([BTreeSet::from([obligation])]))
    }

    fn or(mut self, other: Dnf<'a>) -> Self {
        self.0.extend(other.0);
        self.absorb()
    }

    fn and(self, other: &Dnf<'a>) -> Self {
        let mut clauses: BTreeSet<BTreeSet<Obligation<'a>>> = BTreeSet::new();
        for left in &self.0 {
            for right in &other.0 {
                clauses.insert(left.union(right).cloned().collect());
            }
        }
        Dnf(clauses).absorb()
    }

    /// Drop every clause that contains another one.
    fn absorb(self) -> Self {
        let kept = self
            .0
            .iter()
            .filter(|clause| {
                !self
                    .0
                    .iter()
                    .any(|other| other != *clause && other.is_subset(clause))
            })
            .cloned()
            .collect();
        Dnf(kept)
    }

    fn at_end(&self) -> bool {
        self.0
            .iter()
            .any(|clause| clause.iter().all(Obligation::at_end))
    }

    fn progress(&self, symbol: &Symbol) -> Dnf<'a> {
        let mut result = Dnf::constant(false);
        for clause in &self.0 {
            let mut conjunction = Dnf::constant(true);
            for obligation in clause {
                conjunction = conjunction.and(&obligation.formula().progress(symbol));
                if conjunction.0.is_empty() {
                    break;
                }
            }
            result = result.or(conjunction);
        }
        result
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, operands: &BTreeSet<Formula>, op: &str| {
            f.write_str("(")?;
            for (index, operand) in operands.iter().enumerate() {
                if index > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{operand}")?;
            }
            f.write_str(")")
        };
        match self {
            Formula::True => f.write_str("true"),
            Formula::False => f.write_str("false"),
            Formula::Action(symbol) => write!(f, "{symbol}"),
            Formula::Not(inner) => write!(f, "!{inner}"),
            Formula::And(operands) => join(f, operands, "&"),
            Formula::Or(operands) => join(f, operands, "|"),
            Formula::Next(inner) => write!(f, "X {inner}"),
            Formula::Until(hold, goal) => write!(f, "({hold} U {goal})"),
            Formula::Eventually(inner) => write!(f, "F {inner}"),
            Formula::Always(inner) => write!(f, "G {inner}"),
        }
    }
}
