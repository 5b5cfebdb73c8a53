//! PyO3 bindings for device assembly.
//!
//! Mirrors the Rust API closely enough for the Python front-end: regexes for
//! integration rules, checked devices for subsystems and assembled devices
//! for verdicts. Traces cross the boundary as lists of strings.

use crate::assembled::{AssembledDevice, Failure, Query};
use crate::config::Options;
use crate::device::{CheckedDevice, Device, build_external_behavior};
use crate::error::Error;
use crate::formlang::{Regex, Symbol, word};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::collections::{BTreeMap, HashMap};

impl From<Error> for PyErr {
    fn from(err: Error) -> Self {
        match err {
            Error::StateLimitExceeded { .. } => PyRuntimeError::new_err(err.to_string()),
            err => PyValueError::new_err(err.to_string()),
        }
    }
}

fn names(trace: &[Symbol]) -> Vec<String> {
    trace.iter().map(|symbol| symbol.to_string()).collect()
}

/// An integration rule over `instance.op` calls.
#[pyclass(
    name = "Regex",
    module = "shelley.rustylib",
    frozen,
    eq,
    hash,
    from_py_object
)]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PyRegex {
    regex: Regex,
}

#[pymethods]
impl PyRegex {
    #[staticmethod]
    fn nil() -> Self {
        Self { regex: Regex::Nil }
    }

    #[staticmethod]
    fn empty() -> Self {
        Self {
            regex: Regex::Empty,
        }
    }

    #[staticmethod]
    fn char(symbol: &str) -> Self {
        Self {
            regex: Regex::char(symbol),
        }
    }

    fn concat(&self, other: &PyRegex) -> Self {
        Self {
            regex: Regex::concat(self.regex.clone(), other.regex.clone()),
        }
    }

    fn union(&self, other: &PyRegex) -> Self {
        Self {
            regex: Regex::union(self.regex.clone(), other.regex.clone()),
        }
    }

    fn star(&self) -> Self {
        Self {
            regex: Regex::star(self.regex.clone()),
        }
    }

    /// Symbols mentioned by the expression, sorted.
    fn chars(&self) -> Vec<String> {
        self.regex.chars().iter().map(Symbol::to_string).collect()
    }

    fn __str__(&self) -> String {
        self.regex.to_string()
    }

    fn __repr__(&self) -> String {
        format!("Regex({})", self.regex)
    }
}

/// The external behavior of a verified device.
#[pyclass(
    name = "CheckedDevice",
    module = "shelley.rustylib",
    frozen,
    from_py_object
)]
#[derive(Clone)]
pub struct PyCheckedDevice {
    device: CheckedDevice,
}

#[pymethods]
impl PyCheckedDevice {
    #[new]
    #[pyo3(signature = (events, start_events, behavior, final_events = Vec::new()))]
    fn new(
        events: Vec<String>,
        start_events: Vec<String>,
        behavior: Vec<(String, String)>,
        final_events: Vec<String>,
    ) -> PyResult<Self> {
        let options = Options::default();
        let nfa = build_external_behavior(
            &behavior,
            &start_events,
            &final_events,
            &events,
            &options.start_state_name,
        )?;
        Ok(Self {
            device: CheckedDevice::new(nfa),
        })
    }

    #[getter]
    fn alphabet(&self) -> Vec<String> {
        self.device.alphabet().iter().map(Symbol::to_string).collect()
    }

    fn accepts(&self, trace: Vec<String>) -> bool {
        self.device.accepts(&word(trace))
    }

    fn divergence_index(&self, trace: Vec<String>) -> Option<usize> {
        self.device.divergence_index(&word(trace))
    }

    fn __repr__(&self) -> String {
        format!("CheckedDevice(alphabet={:?})", self.alphabet())
    }
}

/// A device checked against its subsystems.
#[pyclass(name = "AssembledDevice", module = "shelley.rustylib", frozen)]
pub struct PyAssembledDevice {
    assembled: AssembledDevice,
}

#[pymethods]
impl PyAssembledDevice {
    #[staticmethod]
    #[pyo3(signature = (
        events,
        start_events,
        behavior,
        known,
        final_events = Vec::new(),
        components = BTreeMap::new(),
        triggers = BTreeMap::new(),
        max_states = None,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn make(
        events: Vec<String>,
        start_events: Vec<String>,
        behavior: Vec<(String, String)>,
        known: HashMap<String, PyCheckedDevice>,
        final_events: Vec<String>,
        components: BTreeMap<String, String>,
        triggers: BTreeMap<String, PyRegex>,
        max_states: Option<usize>,
    ) -> PyResult<Self> {
        let device = Device {
            events,
            start_events,
            final_events,
            behavior,
            components,
            triggers: triggers
                .into_iter()
                .map(|(event, rule)| (event, rule.regex))
                .collect(),
        };
        let known: HashMap<String, CheckedDevice> = known
            .into_iter()
            .map(|(name, checked)| (name, checked.device))
            .collect();
        let mut options = Options::default();
        if let Some(max_states) = max_states {
            options.max_states = max_states;
        }
        let assembled = AssembledDevice::make_with(&device, &known, &options)?;
        Ok(Self { assembled })
    }

    #[getter]
    fn is_valid(&self) -> bool {
        self.assembled.is_valid()
    }

    /// The failure as a dictionary with a `kind` key, or `None`.
    #[getter]
    fn failure<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyDict>>> {
        let Some(failure) = self.assembled.failure() else {
            return Ok(None);
        };
        let dict = PyDict::new(py);
        match failure {
            Failure::Ambiguity(ambiguity) => {
                dict.set_item("kind", "ambiguity")?;
                dict.set_item("micro_trace", names(&ambiguity.micro_trace))?;
                let (first, second) = &ambiguity.macro_traces;
                dict.set_item("macro_traces", (names(first), names(second)))?;
            }
            Failure::TriggerIntegration(integration) => {
                dict.set_item("kind", "trigger_integration")?;
                dict.set_item("micro_trace", names(&integration.micro_trace))?;
                dict.set_item("macro_trace", names(&integration.macro_trace))?;
                let errors = PyDict::new(py);
                for (instance, error) in &integration.component_errors {
                    errors.set_item(
                        instance,
                        (names(&error.sub_trace), error.divergence_index),
                    )?;
                }
                dict.set_item("component_errors", errors)?;
            }
        }
        Ok(Some(dict))
    }

    #[getter]
    fn external(&self) -> PyCheckedDevice {
        PyCheckedDevice {
            device: self.assembled.external().clone(),
        }
    }

    fn accepts_external(&self, trace: Vec<String>) -> PyResult<bool> {
        Ok(self
            .assembled
            .external_model_check(&Query::Trace(word(trace)))?)
    }

    fn accepts_internal(&self, trace: Vec<String>) -> PyResult<bool> {
        Ok(self
            .assembled
            .internal_model_check(&Query::Trace(word(trace)))?)
    }

    /// Decode an accepted micro trace into the macro events it implements.
    fn decode_macro_trace<'py>(
        &self,
        py: Python<'py>,
        trace: Vec<String>,
    ) -> PyResult<Option<Bound<'py, PyList>>> {
        let Some(internal) = self.assembled.internal() else {
            return Ok(None);
        };
        internal
            .decode_macro_trace(&word(trace))
            .map(|events| PyList::new(py, names(&events)))
            .transpose()
    }
}

/// Register the `rustylib` module.
#[pymodule]
pub fn rustylib(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyRegex>()?;
    m.add_class::<PyCheckedDevice>()?;
    m.add_class::<PyAssembledDevice>()?;
    Ok(())
}
