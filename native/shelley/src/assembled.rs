//! Assembly of a device from its declaration and its subsystems.

use crate::ambiguity::{AmbiguityFailure, find_ambiguity};
use crate::config::Options;
use crate::device::{CheckedDevice, Device, DeviceLookup, build_components, check_device};
use crate::encoder::{MicroBehavior, encode_behavior};
use crate::error::{Error, Result};
use crate::formlang::{DFA, Symbol};
use crate::formula::Formula;
use crate::integration::{TriggerIntegrationFailure, verify_integration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, instrument};

/// Why a composite device was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    Ambiguity(AmbiguityFailure),
    TriggerIntegration(TriggerIntegrationFailure),
}

/// A property to check against the external or internal behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// The behavior accepts this exact trace.
    Trace(Vec<Symbol>),
    /// Every accepted trace satisfies this formula.
    Formula(Formula),
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Trace(trace) => {
                f.write_str("[")?;
                for (index, symbol) in trace.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{symbol}")?;
                }
                f.write_str("]")
            }
            Query::Formula(formula) => write!(f, "{formula}"),
        }
    }
}

/// Named queries expected to hold (`ok`) or not (`fail`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceTests {
    pub ok: BTreeMap<String, Query>,
    pub fail: BTreeMap<String, Query>,
}

/// Run every test through `checker`, stopping at the first wrong verdict.
pub fn check_traces<F>(mut checker: F, tests: &TraceTests) -> Result<()>
where
    F: FnMut(&Query) -> Result<bool>,
{
    for (name, query) in &tests.ok {
        if !checker(query)? {
            return Err(Error::UnacceptedValidTrace {
                name: name.clone(),
                query: query.to_string(),
            });
        }
    }
    for (name, query) in &tests.fail {
        if checker(query)? {
            return Err(Error::AcceptedInvalidTrace {
                name: name.clone(),
                query: query.to_string(),
            });
        }
    }
    Ok(())
}

/// A device together with the verdict on its integration rules.
#[derive(Debug, Clone)]
pub struct AssembledDevice {
    external: CheckedDevice,
    internal: Option<MicroBehavior>,
    failure: Option<Failure>,
    max_states: usize,
}

impl AssembledDevice {
    pub fn make<L>(device: &Device, known: &L) -> Result<Self>
    where
        L: DeviceLookup + ?Sized,
    {
        Self::make_with(device, known, &Options::default())
    }

    /// Check `device` and, if it has subsystems, verify its integration rules
    /// against the subsystems' own behaviors.
    ///
    /// Structural problems are errors. A device that is well formed but whose
    /// rules are ambiguous or misuse a subsystem is returned with a
    /// [`Failure`] instead.
    #[instrument(level = "debug", skip_all, fields(events = device.events.len()))]
    pub fn make_with<L>(device: &Device, known: &L, options: &Options) -> Result<Self>
    where
        L: DeviceLookup + ?Sized,
    {
        let external = check_device(device, options)?;
        let mut assembled = Self {
            external,
            internal: None,
            failure: None,
            max_states: options.max_states,
        };
        if device.components.is_empty() {
            debug!("base device");
            return Ok(assembled);
        }

        let components = build_components(&device.components, known)?;
        let alphabet = components
            .iter()
            .flat_map(|component| component.nfa.alphabet().iter().cloned());
        let micro = encode_behavior(
            assembled.external.nfa(),
            &device.triggers,
            alphabet,
            options,
        )?;

        assembled.failure = match find_ambiguity(&micro) {
            Some(ambiguity) => Some(Failure::Ambiguity(ambiguity)),
            None => verify_integration(&micro, &components, options)?
                .map(Failure::TriggerIntegration),
        };
        assembled.internal = Some(micro);

        match &assembled.failure {
            None => info!(components = components.len(), "device verified"),
            Some(failure) => info!(?failure, "device rejected"),
        }
        Ok(assembled)
    }

    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn external(&self) -> &CheckedDevice {
        &self.external
    }

    /// The micro behavior; `None` for base devices.
    pub fn internal(&self) -> Option<&MicroBehavior> {
        self.internal.as_ref()
    }

    pub fn external_model_check(&self, query: &Query) -> Result<bool> {
        model_check(self.external.dfa(), query, self.max_states)
    }

    /// Check the micro behavior. Base devices have none: every trace is
    /// rejected and every formula holds.
    pub fn internal_model_check(&self, query: &Query) -> Result<bool> {
        match &self.internal {
            Some(micro) => model_check(micro.dfa(), query, self.max_states),
            None => Ok(matches!(query, Query::Formula(_))),
        }
    }

    /// Shortest external trace on which `formula` fails.
    pub fn external_counterexample(&self, formula: &Formula) -> Result<Option<Vec<Symbol>>> {
        counterexample(self.external.dfa(), formula, self.max_states)
    }
}

fn model_check(dfa: &DFA, query: &Query, max_states: usize) -> Result<bool> {
    match query {
        Query::Trace(trace) => Ok(dfa.accepts(trace)),
        Query::Formula(formula) => Ok(counterexample(dfa, formula, max_states)?.is_none()),
    }
}

fn counterexample(dfa: &DFA, formula: &Formula, max_states: usize) -> Result<Option<Vec<Symbol>>> {
    let alphabet = dfa
        .alphabet()
        .iter()
        .chain(&formula.actions())
        .cloned()
        .collect::<Vec<_>>();
    let negation = Formula::not(formula.clone()).to_dfa(alphabet, max_states)?;
    Ok(dfa.intersection(&negation).shortest_accepted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::button;
    use crate::formlang::{Regex, word};
    use std::collections::HashMap;

    fn known() -> HashMap<String, CheckedDevice> {
        let button = check_device(&button(), &Options::default()).unwrap();
        HashMap::from([("Button".to_string(), button)])
    }

    fn smart_button() -> Device {
        Device {
            events: vec!["on".into()],
            start_events: vec!["on".into()],
            behavior: vec![("on".into(), "on".into())],
            components: BTreeMap::from([("b".into(), "Button".into())]),
            triggers: BTreeMap::from([(
                "on".into(),
                Regex::sequence([Regex::char("b.pressed"), Regex::char("b.released")]),
            )]),
            ..Device::default()
        }
    }

    #[test]
    fn test_base_device() {
        let assembled = AssembledDevice::make(&button(), &known()).unwrap();
        assert!(assembled.is_valid());
        assert!(assembled.internal().is_none());
        assert!(
            assembled
                .external_model_check(&Query::Trace(word(["pressed", "released"])))
                .unwrap()
        );
        assert!(
            !assembled
                .internal_model_check(&Query::Trace(word(["pressed"])))
                .unwrap()
        );
        assert!(
            assembled
                .internal_model_check(&Query::Formula(Formula::False))
                .unwrap()
        );
    }

    #[test]
    fn test_formula_checks() {
        let assembled = AssembledDevice::make(&button(), &known()).unwrap();
        let starts_pressed = Formula::action("pressed");
        assert!(
            assembled
                .external_model_check(&Query::Formula(starts_pressed))
                .unwrap()
        );

        let never_released = Formula::always(Formula::not(Formula::action("released")));
        assert_eq!(
            assembled.external_counterexample(&never_released).unwrap(),
            Some(word(["pressed", "released"]))
        );
    }

    #[test]
    fn test_composite_device() {
        let assembled = AssembledDevice::make(&smart_button(), &known()).unwrap();
        assert!(assembled.is_valid(), "{:?}", assembled.failure());
        let internal = assembled.internal().unwrap();
        assert!(internal.accepts(&word(["b.pressed", "b.released"])));
        assert!(!internal.accepts(&word(["b.released", "b.pressed"])));
    }

    #[test]
    fn test_missing_dependency() {
        let err = AssembledDevice::make(&smart_button(), &HashMap::<String, CheckedDevice>::new()).unwrap_err();
        assert_eq!(
            err,
            Error::DependencyNotFound {
                instance: "b".into(),
                type_name: "Button".into()
            }
        );
    }

    #[test]
    fn test_check_traces() {
        let assembled = AssembledDevice::make(&button(), &known()).unwrap();
        let mut tests = TraceTests::default();
        tests
            .ok
            .insert("press".into(), Query::Trace(word(["pressed"])));
        tests
            .fail
            .insert("release".into(), Query::Trace(word(["released"])));
        assert!(check_traces(|q| assembled.external_model_check(q), &tests).is_ok());

        tests
            .fail
            .insert("press twice".into(), Query::Trace(word(["pressed", "released", "pressed"])));
        let err = check_traces(|q| assembled.external_model_check(q), &tests).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Accepted invalid trace: press twice: [pressed, released, pressed]"
        );
    }
}
