//! Symbol types for automata transitions.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Separator between an instance name and an operation in a micro symbol.
pub const INSTANCE_SEPARATOR: char = '.';

/// An alphabet symbol, e.g. `pressed` or `b.pressed`.
///
/// Symbols are reference-counted strings so automata can share them freely.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(Arc<str>);

/// A transition label: `None` is an epsilon move.
pub type Label = Option<Symbol>;

impl Symbol {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Qualify this symbol with an instance name: `op` becomes `instance.op`.
    pub fn prefixed(&self, instance: &str) -> Self {
        Self::new(format!("{instance}{INSTANCE_SEPARATOR}{}", self.0))
    }

    /// Split `instance.op` on its first separator.
    pub fn split_instance(&self) -> Option<(&str, &str)> {
        self.0.split_once(INSTANCE_SEPARATOR)
    }
}

/// Check if a label is an epsilon transition.
#[inline]
pub fn is_epsilon(label: &Label) -> bool {
    label.is_none()
}

/// Build a word from anything string-like.
pub fn word<I, S>(symbols: I) -> Vec<Symbol>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols.into_iter().map(Symbol::new).collect()
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}
