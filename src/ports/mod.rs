//! Port traits at the boundary between the domain and its collaborators.

pub mod classification_port;
pub mod config_port;
pub mod data_port;
