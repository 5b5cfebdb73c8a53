//! Device declarations and their macro automata.

use crate::config::Options;
use crate::error::{Error, Result};
use crate::formlang::{
    DFA, EpsilonNFA, INSTANCE_SEPARATOR, Regex, StateId, Symbol, subset_construction,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::BuildHasher;

/// A device as produced by a front-end.
///
/// `behavior` lists the macro edges `(before, after)`. `components` maps
/// instance names to device types, and `triggers` maps every event to the
/// subsystem calls (`instance.op` symbols) that implement it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub events: Vec<String>,
    #[serde(default)]
    pub start_events: Vec<String>,
    #[serde(default)]
    pub final_events: Vec<String>,
    #[serde(default)]
    pub behavior: Vec<(String, String)>,
    #[serde(default)]
    pub components: BTreeMap<String, String>,
    #[serde(default)]
    pub triggers: BTreeMap<String, Regex>,
}

impl Device {
    /// Check the structural contract of the declaration.
    ///
    /// Devices without components and without triggers are base devices and
    /// need no integration rules; any other device must give a trigger for
    /// exactly its events, and each trigger may only call declared components.
    pub fn validate(&self, start_state_name: &str) -> Result<()> {
        let mut events = BTreeSet::new();
        for event in &self.events {
            if !events.insert(event.as_str()) {
                return Err(Error::DuplicateEvent {
                    event: event.clone(),
                });
            }
        }

        if self.start_events.is_empty() {
            return Err(Error::NoStartEvents);
        }
        if let Some(event) = self.start_events.iter().find(|e| !events.contains(e.as_str())) {
            return Err(Error::UnknownStartEvent {
                event: event.clone(),
            });
        }
        if let Some(event) = self.final_events.iter().find(|e| !events.contains(e.as_str())) {
            return Err(Error::UnknownFinalEvent {
                event: event.clone(),
            });
        }
        if let Some(event) = self
            .behavior
            .iter()
            .flat_map(|(src, dst)| [src, dst])
            .find(|e| !events.contains(e.as_str()))
        {
            return Err(Error::UnknownBehaviorEvent {
                event: event.clone(),
            });
        }
        if events.contains(start_state_name) {
            return Err(Error::ReservedStateName {
                name: start_state_name.to_string(),
            });
        }

        if self.components.is_empty() && self.triggers.is_empty() {
            return Ok(());
        }

        let triggered: BTreeSet<&str> = self.triggers.keys().map(String::as_str).collect();
        if triggered != events {
            return Err(Error::TriggerEventMismatch {
                missing: events.difference(&triggered).map(|e| e.to_string()).collect(),
                extra: triggered.difference(&events).map(|e| e.to_string()).collect(),
            });
        }

        if let Some(instance) = self
            .components
            .keys()
            .find(|instance| instance.contains(INSTANCE_SEPARATOR))
        {
            return Err(Error::InvalidInstanceName {
                instance: instance.clone(),
            });
        }

        for symbol in self.triggers.values().flat_map(Regex::chars) {
            let known = symbol
                .split_instance()
                .is_some_and(|(instance, _)| self.components.contains_key(instance));
            if !known {
                return Err(Error::UnknownSubsystem {
                    symbol: symbol.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// The validated external behavior of a device.
///
/// Other devices only ever see this automaton, never the declaration behind it.
#[derive(Debug, Clone)]
pub struct CheckedDevice {
    nfa: EpsilonNFA,
    dfa: DFA,
}

impl CheckedDevice {
    pub fn new(mut nfa: EpsilonNFA) -> Self {
        nfa.compute_epsilon_closures();
        let dfa = subset_construction(&nfa).minimize();
        Self { nfa, dfa }
    }

    pub fn nfa(&self) -> &EpsilonNFA {
        &self.nfa
    }

    /// The minimal DFA of the behavior.
    pub fn dfa(&self) -> &DFA {
        &self.dfa
    }

    pub fn alphabet(&self) -> &BTreeSet<Symbol> {
        self.nfa.alphabet()
    }

    pub fn accepts(&self, trace: &[Symbol]) -> bool {
        self.dfa.accepts(trace)
    }

    /// First call of `trace` this device cannot perform; `None` if accepted.
    pub fn divergence_index(&self, trace: &[Symbol]) -> Option<usize> {
        self.dfa.divergence_index(trace)
    }
}

/// Lookup of already verified devices by type name.
pub trait DeviceLookup {
    fn lookup(&self, type_name: &str) -> Option<&CheckedDevice>;
}

impl<S: BuildHasher> DeviceLookup for HashMap<String, CheckedDevice, S> {
    fn lookup(&self, type_name: &str) -> Option<&CheckedDevice> {
        self.get(type_name)
    }
}

impl DeviceLookup for BTreeMap<String, CheckedDevice> {
    fn lookup(&self, type_name: &str) -> Option<&CheckedDevice> {
        self.get(type_name)
    }
}

/// Build the macro automaton of a device.
///
/// There is one state per event plus a reserved start state. Each behavior
/// edge `(src, dst)` becomes a `dst`-labelled transition from `src` to `dst`,
/// and each start event `e` a transition from the start state to `e`. Every
/// event state accepts, unless `final_events` is non-empty, in which case
/// exactly those do.
pub fn build_external_behavior(
    behavior: &[(String, String)],
    start_events: &[String],
    final_events: &[String],
    events: &[String],
    start_state_name: &str,
) -> Result<EpsilonNFA> {
    if start_events.is_empty() {
        return Err(Error::NoStartEvents);
    }
    if events.iter().any(|e| e == start_state_name) {
        return Err(Error::ReservedStateName {
            name: start_state_name.to_string(),
        });
    }

    let mut nfa = EpsilonNFA::with_alphabet(events.iter().map(Symbol::new));
    let start = nfa.add_state();
    nfa.add_start_state(start);

    let mut states: BTreeMap<&str, StateId> = BTreeMap::new();
    for event in events {
        let id = nfa.add_state();
        states.insert(event.as_str(), id);
    }
    let state_of = |event: &String, missing: fn(String) -> Error| {
        states
            .get(event.as_str())
            .copied()
            .ok_or_else(|| missing(event.clone()))
    };

    for event in start_events {
        let target = state_of(event, |event| Error::UnknownStartEvent { event })?;
        nfa.add_transition(start, Symbol::new(event), target);
    }
    for (src, dst) in behavior {
        let from = state_of(src, |event| Error::UnknownBehaviorEvent { event })?;
        let to = state_of(dst, |event| Error::UnknownBehaviorEvent { event })?;
        nfa.add_transition(from, Symbol::new(dst), to);
    }

    let accepting: &[String] = if final_events.is_empty() {
        events
    } else {
        final_events
    };
    for event in accepting {
        let state = state_of(event, |event| Error::UnknownFinalEvent { event })?;
        nfa.add_final_state(state);
    }

    nfa.compute_epsilon_closures();
    Ok(nfa)
}

/// Check a device declaration and build its [`CheckedDevice`].
pub fn check_device(device: &Device, options: &Options) -> Result<CheckedDevice> {
    device.validate(&options.start_state_name)?;
    let nfa = build_external_behavior(
        &device.behavior,
        &device.start_events,
        &device.final_events,
        &device.events,
        &options.start_state_name,
    )?;
    Ok(CheckedDevice::new(nfa))
}

/// A subsystem instance inside a composite device.
#[derive(Debug, Clone)]
pub struct Component<'a> {
    pub instance: &'a str,
    pub device: &'a CheckedDevice,
    /// The device behavior with every symbol qualified by `instance`.
    pub nfa: EpsilonNFA,
}

/// Qualify every symbol of `nfa` with `prefix`: `op` becomes `prefix.op`.
pub fn instantiate(nfa: &EpsilonNFA, prefix: &str) -> EpsilonNFA {
    let mut instance = nfa.map_symbols(|symbol| symbol.prefixed(prefix));
    instance.compute_epsilon_closures();
    instance
}

/// Look up and instantiate every component, in instance-name order.
pub fn build_components<'a, L>(
    components: &'a BTreeMap<String, String>,
    known: &'a L,
) -> Result<Vec<Component<'a>>>
where
    L: DeviceLookup + ?Sized,
{
    components
        .iter()
        .map(|(instance, type_name)| {
            let device = known
                .lookup(type_name)
                .ok_or_else(|| Error::DependencyNotFound {
                    instance: instance.clone(),
                    type_name: type_name.clone(),
                })?;
            Ok(Component {
                instance,
                device,
                nfa: instantiate(device.nfa(), instance),
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DEFAULT_START_STATE;
    use crate::formlang::word;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn edges(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    pub(crate) fn button() -> Device {
        Device {
            events: strings(&["pressed", "released"]),
            start_events: strings(&["pressed"]),
            behavior: edges(&[("pressed", "released"), ("released", "pressed")]),
            ..Device::default()
        }
    }

    #[test]
    fn test_button_behavior() {
        let device = check_device(&button(), &Options::default()).unwrap();
        assert!(device.accepts(&word(["pressed", "released", "pressed"])));
        assert!(!device.accepts(&word(["released", "pressed"])));
        assert!(!device.accepts(&[]));
        assert_eq!(device.divergence_index(&word(["pressed", "pressed"])), Some(1));
    }

    #[test]
    fn test_final_events_restrict_acceptance() {
        let mut device = button();
        device.final_events = strings(&["released"]);
        let checked = check_device(&device, &Options::default()).unwrap();
        assert!(checked.accepts(&word(["pressed", "released"])));
        assert!(!checked.accepts(&word(["pressed"])));
    }

    #[test]
    fn test_build_requires_start_events() {
        let err = build_external_behavior(&[], &[], &[], &strings(&["a"]), DEFAULT_START_STATE);
        assert_eq!(err.unwrap_err(), Error::NoStartEvents);
    }

    #[test]
    fn test_build_rejects_reserved_name() {
        let events = strings(&["a", "$START"]);
        let err = build_external_behavior(&[], &strings(&["a"]), &[], &events, "$START");
        assert_eq!(
            err.unwrap_err(),
            Error::ReservedStateName {
                name: "$START".into()
            }
        );
    }

    #[test]
    fn test_validate_start_and_trigger_contracts() {
        let mut device = button();
        device.start_events = strings(&["held"]);
        assert_eq!(
            device.validate(DEFAULT_START_STATE),
            Err(Error::UnknownStartEvent {
                event: "held".into()
            })
        );

        let mut device = button();
        device
            .components
            .insert("b".into(), "Button".into());
        device
            .triggers
            .insert("pressed".into(), Regex::char("b.pressed"));
        device
            .triggers
            .insert("clicked".into(), Regex::char("b.pressed"));
        assert_eq!(
            device.validate(DEFAULT_START_STATE),
            Err(Error::TriggerEventMismatch {
                missing: strings(&["released"]),
                extra: strings(&["clicked"]),
            })
        );
    }

    #[test]
    fn test_validate_unknown_subsystem() {
        let mut device = button();
        device.components.insert("b".into(), "Button".into());
        device
            .triggers
            .insert("pressed".into(), Regex::char("b.pressed"));
        device
            .triggers
            .insert("released".into(), Regex::char("x.released"));
        assert_eq!(
            device.validate(DEFAULT_START_STATE),
            Err(Error::UnknownSubsystem {
                symbol: "x.released".into()
            })
        );
    }

    #[test]
    fn test_validate_rejects_qualified_instance_names() {
        let mut device = button();
        device.components.insert("x".into(), "Button".into());
        device.components.insert("x.y".into(), "Button".into());
        device
            .triggers
            .insert("pressed".into(), Regex::char("x.y.pressed"));
        device
            .triggers
            .insert("released".into(), Regex::char("x.released"));
        assert_eq!(
            device.validate(DEFAULT_START_STATE),
            Err(Error::InvalidInstanceName {
                instance: "x.y".into()
            })
        );
    }

    #[test]
    fn test_build_components() {
        let checked = check_device(&button(), &Options::default()).unwrap();
        let known: HashMap<String, CheckedDevice> =
            HashMap::from([("Button".to_string(), checked)]);

        let components = BTreeMap::from([
            ("b2".to_string(), "Button".to_string()),
            ("b1".to_string(), "Button".to_string()),
        ]);
        let built = build_components(&components, &known).unwrap();
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].instance, "b1");
        assert!(built[0].nfa.accepts(&word(["b1.pressed"])));
        assert!(!built[0].nfa.accepts(&word(["b2.pressed"])));

        let missing = BTreeMap::from([("t".to_string(), "Timer".to_string())]);
        assert_eq!(
            build_components(&missing, &known).unwrap_err(),
            Error::DependencyNotFound {
                instance: "t".into(),
                type_name: "Timer".into()
            }
        );
    }

    #[test]
    fn test_device_from_json() {
        let device: Device = serde_json::from_str(
            r#"{
                "events": ["on"],
                "start_events": ["on"],
                "behavior": [["on", "on"]],
                "components": {"b": "Button"},
                "triggers": {"on": {"Concat": [{"Char": "b.pressed"}, {"Char": "b.released"}]}}
            }"#,
        )
        .unwrap();
        assert_eq!(device.components["b"], "Button");
        assert_eq!(device.triggers["on"].chars().len(), 2);
        assert!(device.validate(DEFAULT_START_STATE).is_ok());
    }
}
