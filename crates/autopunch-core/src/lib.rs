//! # autopunch-core
//!
//! Login-and-punch browser automation against a web time clock. Declare
//! fallback locator chains in YAML, run one deterministic cycle per punch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autopunch_core::{
//!     Config, CycleSpec, EokaSession, PunchAction, PunchSession, SystemClock,
//! };
//! use std::sync::Arc;
//!
//! # async fn run(reporter: &dyn autopunch_core::Reporter) -> autopunch_core::Result<()> {
//! let config = Config::load("autopunch.yaml")?;
//! let session = EokaSession::launch(&config.browser).await?;
//! let clock = Arc::new(SystemClock::new(config.schedule.timezone));
//! let punch = PunchSession::new(session, clock, CycleSpec::from_config(&config));
//! let outcome = punch.run(PunchAction::PunchIn, reporter).await;
//! println!("succeeded: {}", outcome.succeeded);
//! # Ok(())
//! # }
//! ```

pub mod config;

mod driver;
mod locator;
mod outcome;
mod punch;
mod resolver;
mod session;

pub use config::{Config, Params};
pub use driver::EokaSession;
pub use locator::{Locator, LocatorSet, Strategy};
pub use outcome::{ActionOutcome, FailureReason, PunchAction, Reporter};
pub use punch::{CycleSpec, LocatorSets, PunchSession, SessionState};
pub use resolver::{perform_click, resolve, Resolution, Resolved};
pub use session::{Clock, Element, Session, SystemClock};

/// Result type for autopunch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading or a punch cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("session error: {0}")]
    Session(String),

    #[error("no locator in set '{target}' matched")]
    LocatorSetExhausted { target: String },

    #[error("report error: {0}")]
    Report(String),
}
