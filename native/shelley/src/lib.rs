//! Behavioral-contract assembly and verification for Shelley devices.
//!
//! A device declares its operations (events), the order they may happen in,
//! and, when it is built from subsystems, an integration rule for every event
//! describing the subsystem calls that implement it. [`AssembledDevice::make`]
//! builds the device's external behavior and, for composite devices, checks
//! that
//!
//! - no sequence of subsystem calls can be read as two different sequences
//!   of events (ambiguity), and
//! - every sequence of calls the rules require is one the subsystems accept
//!   when run side by side (integration).
//!
//! ```
//! use shelley::{AssembledDevice, CheckedDevice, Device, Query};
//! use shelley::formlang::word;
//! use std::collections::HashMap;
//!
//! let button = Device {
//!     events: vec!["pressed".into(), "released".into()],
//!     start_events: vec!["pressed".into()],
//!     behavior: vec![
//!         ("pressed".into(), "released".into()),
//!         ("released".into(), "pressed".into()),
//!     ],
//!     ..Device::default()
//! };
//! let assembled = AssembledDevice::make(&button, &HashMap::<String, CheckedDevice>::new()).unwrap();
//! assert!(assembled.is_valid());
//! assert!(assembled.external_model_check(&Query::Trace(word(["pressed"]))).unwrap());
//! ```

pub mod ambiguity;
pub mod assembled;
pub mod config;
pub mod device;
pub mod encoder;
pub mod error;
pub mod formlang;
pub mod formula;
pub mod integration;
pub mod record;

#[cfg(feature = "python")]
mod python_bindings;

pub use ambiguity::{AmbiguityFailure, find_ambiguity};
pub use assembled::{AssembledDevice, Failure, Query, TraceTests, check_traces};
pub use config::Options;
pub use device::{
    CheckedDevice, Component, Device, DeviceLookup, build_components, build_external_behavior,
    check_device, instantiate,
};
pub use encoder::{EncodedState, MacroState, MicroBehavior, MicroState, encode_behavior};
pub use error::{Error, Result};
pub use formlang::{DFA, EpsilonNFA, Regex, Symbol};
pub use formula::Formula;
pub use integration::{
    ComponentError, TriggerIntegrationFailure, compose_components, demultiplex, verify_integration,
};
pub use record::{AutomatonRecord, TransitionRecord};
