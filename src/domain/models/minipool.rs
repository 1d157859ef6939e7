//! Minipool identity and lifecycle types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub use alloy::primitives::Address;

/// Validator public key as reported by the status feed.
///
/// Stored as lower-case hex without a `0x` prefix so that feed messages and
/// on-chain reads resolve to the same map key regardless of formatting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ValidatorPubkey(String);

impl ValidatorPubkey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        Self(digits.to_ascii_lowercase())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ValidatorPubkey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ValidatorPubkey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<ValidatorPubkey> for String {
    fn from(value: ValidatorPubkey) -> Self {
        value.0
    }
}

impl fmt::Display for ValidatorPubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Managed minipool set keyed by validator pubkey.
pub type MinipoolSet = HashMap<ValidatorPubkey, Address>;

/// On-chain minipool lifecycle stage, as returned by `getStatus()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinipoolStatus {
    Initialised,
    PreLaunch,
    Staking,
    LoggedOut,
    Withdrawn,
    TimedOut,
    /// A stage this daemon does not know about.
    Unknown(u8),
}

impl From<u8> for MinipoolStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Initialised,
            1 => Self::PreLaunch,
            2 => Self::Staking,
            3 => Self::LoggedOut,
            4 => Self::Withdrawn,
            5 => Self::TimedOut,
            other => Self::Unknown(other),
        }
    }
}

impl MinipoolStatus {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Initialised => 0,
            Self::PreLaunch => 1,
            Self::Staking => 2,
            Self::LoggedOut => 3,
            Self::Withdrawn => 4,
            Self::TimedOut => 5,
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether a minipool in this stage is tracked by the watchtower.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Staking | Self::LoggedOut)
    }
}

impl fmt::Display for MinipoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialised => write!(f, "initialised"),
            Self::PreLaunch => write!(f, "prelaunch"),
            Self::Staking => write!(f, "staking"),
            Self::LoggedOut => write!(f, "logged_out"),
            Self::Withdrawn => write!(f, "withdrawn"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_ignores_case() {
        let lower: Address = "0x00000000000000000000000000000000000000ab".parse().unwrap();
        let upper: Address = "0x00000000000000000000000000000000000000AB".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower, Address::with_last_byte(0xab));
    }

    #[test]
    fn test_address_rejects_malformed() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz00000000000000000000000000000000000000".parse::<Address>().is_err());
    }

    #[test]
    fn test_pubkey_normalisation() {
        let a = ValidatorPubkey::new("0xABCDEF");
        let b = ValidatorPubkey::new("abcdef");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "abcdef");
        assert_eq!(ValidatorPubkey::from_bytes(&[0xab, 0x01]).as_str(), "ab01");
    }

    #[test]
    fn test_status_from_u8() {
        assert_eq!(MinipoolStatus::from(2), MinipoolStatus::Staking);
        assert_eq!(MinipoolStatus::from(3), MinipoolStatus::LoggedOut);
        assert_eq!(MinipoolStatus::from(42), MinipoolStatus::Unknown(42));
        assert_eq!(MinipoolStatus::from(42).as_u8(), 42);
    }

    #[test]
    fn test_active_statuses() {
        assert!(MinipoolStatus::Staking.is_active());
        assert!(MinipoolStatus::LoggedOut.is_active());
        assert!(!MinipoolStatus::PreLaunch.is_active());
        assert!(!MinipoolStatus::Withdrawn.is_active());
    }
}
