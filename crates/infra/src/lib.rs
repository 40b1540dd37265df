//! Attune platform infrastructure
//!
//! CPAL-backed implementations of the core audio contracts (device
//! inventory, stream construction, graph building) plus the engine facade
//! consumed by UI layers.

pub mod audio;
pub mod service;

pub use service::{ApplyError, ApplyOutcome, EqService, ProfileRole};
