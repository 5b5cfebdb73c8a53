use shelley::formlang::{Regex, regex_to_nfa, word};
use shelley::{
    AssembledDevice, CheckedDevice, Device, Error, Failure, Formula, Options, Query, TraceTests,
    check_device, check_traces, encode_behavior, find_ambiguity,
};
use std::collections::{BTreeMap, HashMap};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn edges(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

fn calls(items: &[&str]) -> Regex {
    Regex::sequence(items.iter().map(|call| Regex::char(*call)))
}

fn button() -> Device {
    Device {
        events: strings(&["pressed", "released"]),
        start_events: strings(&["pressed"]),
        behavior: edges(&[("pressed", "released"), ("released", "pressed")]),
        ..Device::default()
    }
}

fn led() -> Device {
    Device {
        events: strings(&["on", "off"]),
        start_events: strings(&["on"]),
        behavior: edges(&[("on", "off"), ("off", "on")]),
        ..Device::default()
    }
}

fn timer() -> Device {
    Device {
        events: strings(&["started", "canceled", "timeout"]),
        start_events: strings(&["started"]),
        behavior: edges(&[
            ("started", "canceled"),
            ("started", "timeout"),
            ("canceled", "started"),
            ("timeout", "started"),
        ]),
        ..Device::default()
    }
}

fn known() -> HashMap<String, CheckedDevice> {
    let options = Options::default();
    [("Button", button()), ("Led", led()), ("Timer", timer())]
        .into_iter()
        .map(|(name, device)| (name.to_string(), check_device(&device, &options).unwrap()))
        .collect()
}

fn smart_button() -> Device {
    Device {
        events: strings(&["on"]),
        start_events: strings(&["on"]),
        behavior: edges(&[("on", "on")]),
        components: BTreeMap::from([("b".into(), "Button".into())]),
        triggers: BTreeMap::from([("on".into(), calls(&["b.pressed", "b.released"]))]),
        ..Device::default()
    }
}

fn desk_lamp(level1: &[&str]) -> Device {
    Device {
        events: strings(&["level1", "level2", "standby"]),
        start_events: strings(&["level1"]),
        behavior: edges(&[
            ("level1", "level2"),
            ("level1", "standby"),
            ("level2", "standby"),
            ("standby", "level1"),
        ]),
        components: BTreeMap::from([
            ("b".into(), "Button".into()),
            ("ledA".into(), "Led".into()),
            ("t".into(), "Timer".into()),
        ]),
        triggers: BTreeMap::from([
            ("level1".into(), calls(level1)),
            (
                "level2".into(),
                calls(&["b.pressed", "b.released", "t.canceled", "t.started"]),
            ),
            ("standby".into(), calls(&["t.timeout", "ledA.off"])),
        ]),
        ..Device::default()
    }
}

#[test]
fn button_is_a_valid_base_device() {
    let assembled = AssembledDevice::make(&button(), &known()).unwrap();
    assert!(assembled.is_valid());
    assert!(assembled.internal().is_none());

    let accepted = Query::Trace(word(["pressed", "released", "pressed"]));
    let rejected = Query::Trace(word(["released", "pressed"]));
    assert!(assembled.external_model_check(&accepted).unwrap());
    assert!(!assembled.external_model_check(&rejected).unwrap());
}

#[test]
fn button_nested_eventually_formula() {
    let assembled = AssembledDevice::make(&button(), &known()).unwrap();
    let pressed = Formula::eventually(Formula::action("pressed"));
    let nested = Formula::until(pressed.clone(), pressed);
    assert!(assembled.external_model_check(&Query::Formula(nested)).unwrap());

    let released = Formula::eventually(Formula::action("released"));
    let nested = Formula::until(released.clone(), released);
    assert_eq!(
        assembled.external_counterexample(&nested).unwrap(),
        Some(word(["pressed"]))
    );
}

#[test]
fn smart_button_follows_its_button() {
    let assembled = AssembledDevice::make(&smart_button(), &known()).unwrap();
    assert!(assembled.is_valid(), "{:?}", assembled.failure());

    let good = Query::Trace(word(["b.pressed", "b.released"]));
    let bad = Query::Trace(word(["b.released", "b.pressed"]));
    assert!(assembled.internal_model_check(&good).unwrap());
    assert!(!assembled.internal_model_check(&bad).unwrap());

    let tests = TraceTests {
        ok: BTreeMap::from([("reversed".to_string(), bad)]),
        fail: BTreeMap::new(),
    };
    let err = check_traces(|query| assembled.internal_model_check(query), &tests).unwrap_err();
    assert!(matches!(err, Error::UnacceptedValidTrace { ref name, .. } if name == "reversed"));
    assert!(err.to_string().starts_with("Unaccepted valid trace"));
}

#[test]
fn smart_button_external_formula() {
    let assembled = AssembledDevice::make(&smart_button(), &known()).unwrap();
    let only_on = Query::Formula(Formula::always(Formula::action("on")));
    assert!(assembled.external_model_check(&only_on).unwrap());

    let internal_response = Query::Formula(Formula::always(Formula::implies(
        Formula::action("b.pressed"),
        Formula::next(Formula::action("b.released")),
    )));
    assert!(assembled.internal_model_check(&internal_response).unwrap());
}

#[test]
fn shared_trigger_is_ambiguous() {
    let macro_behavior = Regex::union(
        Regex::char("level1"),
        Regex::star(Regex::concat(Regex::char("level1"), Regex::char("level2"))),
    );
    let triggers = BTreeMap::from([
        ("level1".to_string(), Regex::char("b.pressed")),
        ("level2".to_string(), Regex::char("b.pressed")),
    ]);
    let micro = encode_behavior(
        &regex_to_nfa(&macro_behavior, []),
        &triggers,
        [],
        &Options::default(),
    )
    .unwrap();

    let failure = find_ambiguity(&micro).unwrap();
    assert_eq!(failure.micro_trace, word(["b.pressed"]));
    let (first, second) = &failure.macro_traces;
    let traces = [first.clone(), second.clone()];
    assert!(traces.contains(&word(["level1"])));
    assert!(traces.contains(&word(["level2"])));
}

#[test]
fn ambiguous_device_is_rejected() {
    let device = Device {
        events: strings(&["single", "double"]),
        start_events: strings(&["single", "double"]),
        behavior: edges(&[
            ("single", "single"),
            ("single", "double"),
            ("double", "single"),
            ("double", "double"),
        ]),
        components: BTreeMap::from([("b".into(), "Button".into())]),
        triggers: BTreeMap::from([
            ("single".into(), calls(&["b.pressed", "b.released"])),
            (
                "double".into(),
                calls(&["b.pressed", "b.released", "b.pressed", "b.released"]),
            ),
        ]),
        ..Device::default()
    };
    let assembled = AssembledDevice::make(&device, &known()).unwrap();
    let Some(Failure::Ambiguity(failure)) = assembled.failure() else {
        panic!("expected an ambiguity, got {:?}", assembled.failure());
    };
    assert_eq!(
        failure.micro_trace,
        word(["b.pressed", "b.released", "b.pressed", "b.released"])
    );
    let (first, second) = &failure.macro_traces;
    let mut traces = vec![first.clone(), second.clone()];
    traces.sort();
    assert_eq!(traces, vec![word(["double"]), word(["single", "single"])]);
}

#[test]
fn desk_lamp_is_valid() {
    let device = desk_lamp(&["b.pressed", "b.released", "ledA.on", "t.started"]);
    for minimize_components in [true, false] {
        let options = Options {
            minimize_components,
            ..Options::default()
        };
        let assembled = AssembledDevice::make_with(&device, &known(), &options).unwrap();
        assert!(assembled.is_valid(), "{:?}", assembled.failure());
    }
}

#[test]
fn desk_lamp_misuses_its_button() {
    let device = desk_lamp(&["b.pressed", "b.pressed", "ledA.on", "t.started"]);
    let assembled = AssembledDevice::make(&device, &known()).unwrap();
    assert!(!assembled.is_valid());

    let Some(Failure::TriggerIntegration(failure)) = assembled.failure() else {
        panic!("expected an integration failure, got {:?}", assembled.failure());
    };
    assert_eq!(
        failure.micro_trace,
        word(["b.pressed", "b.pressed", "ledA.on", "t.started"])
    );
    assert_eq!(failure.macro_trace, word(["level1"]));
    assert_eq!(failure.component_errors.len(), 1);

    let button = &failure.component_errors["b"];
    assert_eq!(button.sub_trace, word(["pressed", "pressed"]));
    assert_eq!(button.divergence_index, 1);
}

#[test]
fn counterexample_does_not_depend_on_component_minimization() {
    let device = desk_lamp(&["b.pressed", "b.pressed", "ledA.on", "t.started"]);
    let failures: Vec<_> = [true, false]
        .into_iter()
        .map(|minimize_components| {
            let options = Options {
                minimize_components,
                ..Options::default()
            };
            AssembledDevice::make_with(&device, &known(), &options)
                .unwrap()
                .failure()
                .cloned()
        })
        .collect();
    assert!(failures[0].is_some());
    assert_eq!(failures[0], failures[1]);
}

#[test]
fn structural_errors() {
    let mut device = smart_button();
    device.components.insert("x".into(), "Switch".into());
    assert_eq!(
        AssembledDevice::make(&device, &known()).unwrap_err(),
        Error::DependencyNotFound {
            instance: "x".into(),
            type_name: "Switch".into()
        }
    );

    let mut device = smart_button();
    device.triggers.clear();
    assert!(matches!(
        AssembledDevice::make(&device, &known()),
        Err(Error::TriggerEventMismatch { .. })
    ));

    let device = desk_lamp(&["b.pressed", "b.released", "ledA.on", "t.started"]);
    let options = Options {
        max_states: 4,
        ..Options::default()
    };
    assert!(matches!(
        AssembledDevice::make_with(&device, &known(), &options),
        Err(Error::StateLimitExceeded { .. })
    ));
}

#[test]
fn device_round_trips_through_json() {
    let device = desk_lamp(&["b.pressed", "b.released", "ledA.on", "t.started"]);
    let json = serde_json::to_string(&device).unwrap();
    let back: Device = serde_json::from_str(&json).unwrap();
    assert_eq!(back, device);
}
