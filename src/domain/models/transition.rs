//! Minipool transition decision table.
//!
//! | on-chain stage | feed status              | action   |
//! |----------------|--------------------------|----------|
//! | staking        | exited or withdrawable   | logout   |
//! | logged-out     | withdrawable             | withdraw |
//! | logged-out     | exited                   | none     |
//! | anything else  | anything                 | none     |

use alloy::primitives::U256;
use std::fmt;

use super::beacon::ValidatorStatusCode;
use super::minipool::{Address, MinipoolStatus};
use super::units::gwei_to_wei;

/// Contract method that logs a minipool out.
pub const LOGOUT_METHOD: &str = "logoutMinipool";

/// Contract method that withdraws a logged-out minipool.
pub const WITHDRAW_METHOD: &str = "withdrawMinipool";

/// Action chosen for a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Logout,
    Withdraw,
    NoAction,
}

/// Whether a feed status can drive a transition at all.
pub fn is_actionable(code: &ValidatorStatusCode) -> bool {
    matches!(
        code,
        ValidatorStatusCode::Exited | ValidatorStatusCode::Withdrawable
    )
}

/// Decide the transition for a minipool given its on-chain stage and the
/// validator status reported by the feed.
pub fn decide(stage: MinipoolStatus, code: &ValidatorStatusCode) -> TransitionAction {
    match (stage, code) {
        (MinipoolStatus::Staking, ValidatorStatusCode::Exited | ValidatorStatusCode::Withdrawable) => {
            TransitionAction::Logout
        }
        (MinipoolStatus::LoggedOut, ValidatorStatusCode::Withdrawable) => TransitionAction::Withdraw,
        _ => TransitionAction::NoAction,
    }
}

/// A state-transition transaction against the watchtower contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchtowerTransaction {
    Logout { minipool: Address },
    Withdraw { minipool: Address, balance_wei: U256 },
}

impl WatchtowerTransaction {
    /// Build the transaction for an action, or `None` for `NoAction`.
    pub fn for_action(action: TransitionAction, minipool: Address, balance_gwei: u64) -> Option<Self> {
        match action {
            TransitionAction::Logout => Some(Self::Logout { minipool }),
            TransitionAction::Withdraw => Some(Self::Withdraw {
                minipool,
                balance_wei: gwei_to_wei(balance_gwei),
            }),
            TransitionAction::NoAction => None,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Logout { .. } => LOGOUT_METHOD,
            Self::Withdraw { .. } => WITHDRAW_METHOD,
        }
    }

    pub fn minipool(&self) -> Address {
        match self {
            Self::Logout { minipool } | Self::Withdraw { minipool, .. } => *minipool,
        }
    }
}

impl fmt::Display for WatchtowerTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logout { minipool } => write!(f, "{LOGOUT_METHOD}({minipool})"),
            Self::Withdraw {
                minipool,
                balance_wei,
            } => write!(f, "{WITHDRAW_METHOD}({minipool}, {balance_wei})"),
        }
    }
}
