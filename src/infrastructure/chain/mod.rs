//! Execution client integration
//!
//! - `contracts`: ABI bindings for the protocol contracts
//! - `gateway`: the `ChainGateway` implementation over an alloy provider

pub mod contracts;
pub mod gateway;

pub use gateway::{ContractRegistry, JsonRpcChainGateway};
