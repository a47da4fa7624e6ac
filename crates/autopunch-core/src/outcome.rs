use crate::locator::Locator;
use chrono::DateTime;
use chrono_tz::Tz;
use std::fmt;

/// Which timestamped control a cycle clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchAction {
    PunchIn,
    PunchOut,
}

impl PunchAction {
    /// Visible label on the target page's button.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PunchIn => "Punch In",
            Self::PunchOut => "Punch Out",
        }
    }

    /// Stable identifier used in records and over HTTP.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::PunchIn => "punch-in",
            Self::PunchOut => "punch-out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "punch-in" | "punch_in" | "in" => Some(Self::PunchIn),
            "punch-out" | "punch_out" | "out" => Some(Self::PunchOut),
            _ => None,
        }
    }
}

impl fmt::Display for PunchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Why a cycle ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A login locator set (username, password or submit) was exhausted.
    LoginElementNotFound(String),
    /// The punch button's locator set was exhausted.
    ActionButtonNotFound,
    /// The underlying session failed (network, crash, launch).
    SessionError(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginElementNotFound(target) => {
                write!(f, "LoginElementNotFound: {target}")
            }
            Self::ActionButtonNotFound => write!(f, "ActionButtonNotFound"),
            Self::SessionError(msg) => write!(f, "SessionError: {msg}"),
        }
    }
}

/// Result record of one resolve-and-click cycle. Exactly one is produced
/// per run, whatever happens.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: PunchAction,
    pub succeeded: bool,
    /// The locator that won the fallback chain, when one did.
    pub locator_used: Option<Locator>,
    /// Captured immediately after the click dispatch on success, at failure
    /// time otherwise. Always in the configured timezone.
    pub timestamp: DateTime<Tz>,
    pub failure_reason: Option<FailureReason>,
}

/// Consumes one outcome record per run. Formatting and persistence live
/// behind this boundary.
pub trait Reporter: Send + Sync {
    fn record(&self, outcome: &ActionOutcome) -> crate::Result<()>;
}
