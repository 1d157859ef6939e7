//! Validator status feed payloads.
//!
//! Outbound requests and inbound reports exchanged with the beacon status
//! feed, plus the event type the feed client publishes onto the bus.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::minipool::ValidatorPubkey;

/// Bus topic carrying raw inbound feed messages.
pub const BEACON_CLIENT_MESSAGE_TOPIC: &str = "beacon.client.message";

/// Operation tag for a validator status request.
pub const GET_VALIDATOR_STATUS: &str = "get_validator_status";

/// Operation tag for a validator status report.
pub const VALIDATOR_STATUS: &str = "validator_status";

/// Outbound request sent to the status feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub message: String,
    pub pubkey: String,
}

impl ClientMessage {
    /// Request the current status of a validator.
    pub fn get_validator_status(pubkey: &ValidatorPubkey) -> Self {
        Self {
            message: GET_VALIDATOR_STATUS.to_string(),
            pubkey: pubkey.to_string(),
        }
    }
}

/// Inbound message delivered by the status feed.
///
/// Only `message`'s tag is guaranteed; the remaining fields default so that
/// messages of other kinds still decode and can be filtered on the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub message: String,
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub status: ValidatorStatus,
    /// Validator balance in gwei.
    #[serde(default)]
    pub balance: u64,
}

impl ServerMessage {
    pub fn is_validator_status(&self) -> bool {
        self.message == VALIDATOR_STATUS
    }
}

/// Status block of a validator status report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorStatus {
    #[serde(default)]
    pub code: String,
}

impl ValidatorStatus {
    pub fn code(&self) -> ValidatorStatusCode {
        ValidatorStatusCode::parse(&self.code)
    }
}

/// Beacon-chain validator lifecycle code.
///
/// Only `exited` and `withdrawable` drive transitions; every other code is
/// carried as `Other` and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidatorStatusCode {
    Exited,
    Withdrawable,
    Other(String),
}

impl ValidatorStatusCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "exited" => Self::Exited,
            "withdrawable" => Self::Withdrawable,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exited => "exited",
            Self::Withdrawable => "withdrawable",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ValidatorStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one status feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedClientId(pub Uuid);

impl FeedClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FeedClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FeedClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event routed through the in-process bus.
///
/// Payload bytes stay undecoded until the single consumer picks them up.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BusEvent {
    /// A raw message received from a status feed connection.
    BeaconClientMessage {
        client: FeedClientId,
        message: Vec<u8>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let msg = ClientMessage::get_validator_status(&ValidatorPubkey::new("0xAB12"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"message": "get_validator_status", "pubkey": "ab12"})
        );
    }

    #[test]
    fn test_server_message_decodes_status_report() {
        let raw = r#"{"message":"validator_status","pubkey":"ab12","status":{"code":"withdrawable"},"balance":32000000000}"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.is_validator_status());
        assert_eq!(msg.status.code(), ValidatorStatusCode::Withdrawable);
        assert_eq!(msg.balance, 32_000_000_000);
    }

    #[test]
    fn test_server_message_tolerates_other_kinds() {
        let msg: ServerMessage = serde_json::from_str(r#"{"message":"pong"}"#).unwrap();
        assert!(!msg.is_validator_status());
        assert_eq!(msg.status.code(), ValidatorStatusCode::Other(String::new()));
    }

    #[test]
    fn test_status_code_allow_list() {
        assert_eq!(ValidatorStatusCode::parse("exited"), ValidatorStatusCode::Exited);
        assert_eq!(
            ValidatorStatusCode::parse("withdrawable"),
            ValidatorStatusCode::Withdrawable
        );
        assert_eq!(
            ValidatorStatusCode::parse("active"),
            ValidatorStatusCode::Other("active".to_string())
        );
    }
}
