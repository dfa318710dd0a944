//! Concrete adapter implementations for ports.

pub mod classification_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
