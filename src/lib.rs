//! A container-based epidemic simulation
//!
//! Episim replays the daily presence of persons in facilities and vehicles,
//! and lets the disease spread between persons who spend time in the same
//! container. Every simulated day runs the same steps:
//! * The restrictions of the day are taken from the policy schedule and
//!   frozen for the whole day.
//! * The presence events of the day are replayed. When a person leaves a
//!   container, every pair of that person and a remaining occupant may
//!   produce a transmission.
//! * Whoever is still inside a container leaves at the end of the day.
//! * Every person's disease state advances, including contact tracing and
//!   quarantine.
//! * The counts of the day are written to `infections.txt`; every
//!   transmission is written to `infectionEvents.txt`.
//!
//! The central object is the `Context`. It holds the module data, the
//! simulated clock and the queue of plans; the day loop is a chain of plans
//! scheduled one day apart.
pub mod config;
pub mod contact_model;
pub mod containers;
pub mod context;
pub mod error;
pub mod global_properties;
pub mod hashing;
pub mod infection_params;
pub mod log;
pub mod mobility;
pub mod people;
pub mod plan;
pub mod policy;
pub mod population_loader;
pub mod progression;
pub mod random;
pub mod report;
pub mod reporting;
pub mod runner;
pub mod simulation;

pub use context::Context;
pub use error::EpisimError;
pub use global_properties::ContextGlobalPropertiesExt;
pub use hashing::{HashMap, HashSet};
pub use crate::log::{debug, error, info, trace, warn};

// Re-exports for the macros.
pub use csv;
pub use paste;
pub use rand;
