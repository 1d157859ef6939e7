//! Domain models for the watchtower.

pub mod beacon;
pub mod config;
pub mod minipool;
pub mod transition;
pub mod units;

pub use beacon::{
    BusEvent, ClientMessage, FeedClientId, ServerMessage, ValidatorStatus, ValidatorStatusCode,
    BEACON_CLIENT_MESSAGE_TOPIC, GET_VALIDATOR_STATUS, VALIDATOR_STATUS,
};
pub use config::{BeaconConfig, ChainConfig, Config, ContractsConfig, LoggingConfig};
pub use minipool::{Address, MinipoolSet, MinipoolStatus, ValidatorPubkey};
pub use transition::{decide, is_actionable, TransitionAction, WatchtowerTransaction};
pub use units::{gwei_to_eth, gwei_to_wei, wei_to_eth};
