//! Watchtower services
//!
//! - `trust_monitor`: periodic trust checks that start and stop supervision
//! - `pool_supervisor`: minipool discovery and status requests on a re-arming timer
//! - `transition_handler`: turns status reports into logout/withdraw transactions
//! - `watchtower`: shared context and process lifecycle

pub mod event_bus;
pub mod pool_supervisor;
pub mod transition_handler;
pub mod trust_monitor;
pub mod watchtower;

pub use event_bus::{EventBus, Subscriber};
pub use pool_supervisor::PoolSupervisor;
pub use transition_handler::{Discarded, HandleOutcome, TransitionHandler};
pub use trust_monitor::TrustMonitor;
pub use watchtower::{
    WatchtowerContext, WatchtowerHandle, WatchtowerProcess, WatchtowerStatus,
    DEFAULT_MINIPOOL_CHECK_INTERVAL, TRUST_CHECK_INTERVAL,
};
