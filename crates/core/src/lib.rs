//! Attune core domain
//!
//! Platform-agnostic logic of the differential headphone EQ engine:
//! profile parsing, profile combination, biquad rendering, the device
//! inventory contract, graph lifecycle control and configuration.
//! Platform backends live in `attune-infra`.

pub mod domain;
