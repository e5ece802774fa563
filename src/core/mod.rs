//! Core of the decision collision resolver.
//!
//! Data flows strictly forward through these modules: ledger text →
//! [`record`] → [`collision`] → [`plan`] → [`patch`] → [`apply`]. The
//! remaining modules are shared primitives (config, errors, output,
//! telemetry, diffing, draft rendering).

pub mod apply;
pub mod collision;
pub mod config;
pub mod diff;
pub mod draft;
pub mod error;
pub mod output;
pub mod patch;
pub mod plan;
pub mod record;
pub mod telemetry;
