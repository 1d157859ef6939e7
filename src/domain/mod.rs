//! Domain layer: protocol types, decision rules and port traits.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::DomainError;
