//! Error types for device assembly and verification.
//!
//! Verification verdicts (ambiguity, integration divergence) are not errors:
//! they are reported through [`crate::Failure`]. The variants here cover
//! malformed input, failed lookups, exhausted state budgets and rejected
//! trace checks.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A device must declare at least one start event.
    #[error("device declares no start events")]
    NoStartEvents,

    #[error("start event {event:?} is not a declared event")]
    UnknownStartEvent { event: String },

    #[error("final event {event:?} is not a declared event")]
    UnknownFinalEvent { event: String },

    /// A behavior edge mentions an undeclared event.
    #[error("behavior edge mentions undeclared event {event:?}")]
    UnknownBehaviorEvent { event: String },

    #[error("event {event:?} is declared more than once")]
    DuplicateEvent { event: String },

    /// The reserved start-state name clashes with an event name.
    #[error("start state name {name:?} collides with an event of the same name")]
    ReservedStateName { name: String },

    /// Trigger rules must be given for exactly the declared events.
    #[error("trigger rules do not match events (missing: {missing:?}, extra: {extra:?})")]
    TriggerEventMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// Instance names qualify subsystem calls and cannot contain the separator.
    #[error("component instance name {instance:?} contains '.'")]
    InvalidInstanceName { instance: String },

    /// A component's type is not among the known devices.
    #[error("dependency not found: component {instance:?} has undefined type {type_name:?}")]
    DependencyNotFound { instance: String, type_name: String },

    /// A trigger calls an instance that is not a declared component.
    #[error("system not defined: {symbol:?} does not call a declared component")]
    UnknownSubsystem { symbol: String },

    /// An exploration created more states than the configured budget allows.
    #[error("{stage} exceeded the state limit of {limit}")]
    StateLimitExceeded { stage: &'static str, limit: usize },

    #[error("Unaccepted valid trace: {name}: {query}")]
    UnacceptedValidTrace { name: String, query: String },

    #[error("Accepted invalid trace: {name}: {query}")]
    AcceptedInvalidTrace { name: String, query: String },

    /// A serialized automaton is not internally consistent.
    #[error("invalid automaton record: {0}")]
    InvalidRecord(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
