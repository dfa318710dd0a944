//! riskfuse: deterministic signal fusion and allocation risk enforcement.
//!
//! Hexagonal architecture: pure domain logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`], and a thin command
//! line front end in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod ports;
