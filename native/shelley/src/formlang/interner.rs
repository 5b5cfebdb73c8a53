//! Dense state ids for composite states found during an exploration.

use crate::error::{Error, Result};
use crate::formlang::state::StateId;
use indexmap::IndexMap;
use std::hash::Hash;

/// Maps composite state values (pairs, encoder states, formulas, ...) to
/// consecutive [`StateId`]s in discovery order, failing once a state budget is
/// exhausted.
#[derive(Debug, Clone)]
pub struct StateInterner<K> {
    ids: IndexMap<K, StateId>,
    stage: &'static str,
    max_states: usize,
}

impl<K: Hash + Eq> StateInterner<K> {
    pub fn new(stage: &'static str, max_states: usize) -> Self {
        Self {
            ids: IndexMap::new(),
            stage,
            max_states,
        }
    }

    /// Return the id of `key`, and whether it was newly created.
    pub fn intern(&mut self, key: K) -> Result<(StateId, bool)> {
        if let Some(&id) = self.ids.get(&key) {
            return Ok((id, false));
        }
        if self.ids.len() >= self.max_states {
            return Err(Error::StateLimitExceeded {
                stage: self.stage,
                limit: self.max_states,
            });
        }
        let id = self.ids.len() as StateId;
        self.ids.insert(key, id);
        Ok((id, true))
    }

    pub fn get(&self, id: StateId) -> Option<&K> {
        self.ids.get_index(id as usize).map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The interned values, indexed by state id.
    pub fn into_values(self) -> Vec<K> {
        self.ids.into_keys().collect()
    }
}
