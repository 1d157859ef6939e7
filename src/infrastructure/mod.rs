//! Infrastructure layer module
//!
//! This module contains the adapters to external systems:
//! - Execution client JSON-RPC gateway
//! - Beacon status feed client
//! - Configuration management
//! - Logging infrastructure
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod beacon;
pub mod chain;
pub mod config;
pub mod logging;
