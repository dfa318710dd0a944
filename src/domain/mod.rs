//! Core domain types and logic. Nothing here performs I/O except
//! [`universe::load_universe`], which goes through the data port.

pub mod allocation;
pub mod audit;
pub mod config_validation;
pub mod correlation;
pub mod enforcer;
pub mod error;
pub mod fundamentals;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod policy;
pub mod scoring;
pub mod screening;
pub mod snapshot;
pub mod universe;
