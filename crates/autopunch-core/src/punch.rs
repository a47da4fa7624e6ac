use crate::config::{Config, Credentials, TimingConfig};
use crate::locator::{Locator, LocatorSet};
use crate::outcome::{ActionOutcome, FailureReason, PunchAction, Reporter};
use crate::resolver::{perform_click, resolve};
use crate::session::{Clock, Session};
use crate::{Error, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};

/// The five logical targets one cycle resolves.
#[derive(Debug, Clone)]
pub struct LocatorSets {
    pub username: LocatorSet,
    pub password: LocatorSet,
    pub submit: LocatorSet,
    pub punch_in: LocatorSet,
    pub punch_out: LocatorSet,
}

/// Inputs one cycle needs, extracted from configuration so tests can build
/// them directly.
#[derive(Debug, Clone)]
pub struct CycleSpec {
    pub target_url: String,
    pub credentials: Credentials,
    pub locators: LocatorSets,
    pub timing: TimingConfig,
    /// Path template for a diagnostic screenshot on failure; `{timestamp}`
    /// is substituted.
    pub failure_screenshot: Option<String>,
}

impl CycleSpec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_url: config.target.url.clone(),
            credentials: config.credentials.clone(),
            locators: config.locators.build(),
            timing: config.timing.clone(),
            failure_screenshot: config.report.failure_screenshot.clone(),
        }
    }
}

/// Lifecycle of one login+click cycle. Exactly one terminal state is
/// reached per cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Authenticating,
    LocatingAction,
    Clicking,
    Recording,
    Completed,
    Failed(FailureReason),
}

/// One end-to-end login+action cycle against the target page.
///
/// Owns its browser session exclusively and releases it exactly once on
/// any terminal state. There are no retries inside a cycle; retry policy
/// belongs to the trigger.
pub struct PunchSession<S: Session> {
    session: S,
    clock: Arc<dyn Clock>,
    spec: CycleSpec,
    state: SessionState,
}

impl<S: Session> PunchSession<S> {
    pub fn new(session: S, clock: Arc<dyn Clock>, spec: CycleSpec) -> Self {
        Self {
            session,
            clock,
            spec,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run the cycle to a terminal state.
    ///
    /// Always yields exactly one [`ActionOutcome`]; every failure is
    /// converted at this boundary so the trigger has a uniform value to
    /// report and never sees a fault.
    pub async fn run(mut self, action: PunchAction, reporter: &dyn Reporter) -> ActionOutcome {
        let result = self.execute(action).await;

        if result.is_err() {
            self.capture_failure_screenshot().await;
        }

        // Release the browser before anything else; a release failure is
        // logged and never masks the primary outcome.
        if let Err(e) = self.session.close().await {
            warn!("browser release failed: {e}");
        }

        let mut outcome = match result {
            Ok((locator, timestamp)) => {
                self.state = SessionState::Recording;
                ActionOutcome {
                    action,
                    succeeded: true,
                    locator_used: Some(locator),
                    timestamp,
                    failure_reason: None,
                }
            }
            Err(e) => {
                let reason = self.classify(e);
                warn!("{action} cycle failed: {reason}");
                self.state = SessionState::Failed(reason.clone());
                ActionOutcome {
                    action,
                    succeeded: false,
                    locator_used: None,
                    timestamp: self.clock.now(),
                    failure_reason: Some(reason),
                }
            }
        };

        match reporter.record(&outcome) {
            Ok(()) => {
                if outcome.succeeded {
                    self.state = SessionState::Completed;
                }
            }
            Err(e) => {
                if outcome.succeeded {
                    let reason =
                        FailureReason::SessionError(format!("failed to record outcome: {e}"));
                    self.state = SessionState::Failed(reason.clone());
                    outcome.succeeded = false;
                    outcome.failure_reason = Some(reason);
                } else {
                    warn!("failed to record outcome: {e}");
                }
            }
        }

        outcome
    }

    async fn execute(&mut self, action: PunchAction) -> Result<(Locator, DateTime<Tz>)> {
        let timeout = self.spec.timing.locator_timeout();

        self.state = SessionState::Authenticating;
        info!("opening {}", self.spec.target_url);
        self.session.open(&self.spec.target_url).await?;
        self.session.sleep(self.spec.timing.after_open_ms).await;
        self.login().await?;

        self.state = SessionState::LocatingAction;
        let set = match action {
            PunchAction::PunchIn => &self.spec.locators.punch_in,
            PunchAction::PunchOut => &self.spec.locators.punch_out,
        };
        let found = resolve(&mut self.session, set, timeout).await?;

        self.state = SessionState::Clicking;
        perform_click(
            &mut self.session,
            &found.element,
            self.spec.timing.before_click_ms,
            self.spec.timing.after_click_ms,
        )
        .await?;
        let timestamp = self.clock.now();
        info!("{} clicked at {timestamp}", action.label());

        Ok((found.locator, timestamp))
    }

    async fn login(&mut self) -> Result<()> {
        let timeout = self.spec.timing.locator_timeout();

        let username = resolve(&mut self.session, &self.spec.locators.username, timeout).await?;
        self.session
            .fill(&username.element, &self.spec.credentials.username)
            .await?;

        let password = resolve(&mut self.session, &self.spec.locators.password, timeout).await?;
        self.session
            .fill(&password.element, &self.spec.credentials.password)
            .await?;

        // Submit is clicked exactly once; the redirect/render that follows
        // has no DOM signal to poll, hence the fixed post-login delay.
        let submit = resolve(&mut self.session, &self.spec.locators.submit, timeout).await?;
        self.session.click(&submit.element).await?;
        self.session.sleep(self.spec.timing.after_login_ms).await;

        Ok(())
    }

    fn classify(&self, error: Error) -> FailureReason {
        match error {
            Error::LocatorSetExhausted { target } => {
                if self.state == SessionState::LocatingAction {
                    FailureReason::ActionButtonNotFound
                } else {
                    FailureReason::LoginElementNotFound(target)
                }
            }
            other => FailureReason::SessionError(other.to_string()),
        }
    }

    async fn capture_failure_screenshot(&mut self) {
        let Some(template) = self.spec.failure_screenshot.clone() else {
            return;
        };
        let stamp = self.clock.now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let path = template.replace("{timestamp}", &stamp);
        match self.session.screenshot().await {
            Ok(data) => {
                if let Some(parent) = std::path::Path::new(&path).parent() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        warn!("failed to create screenshot directory: {e}");
                    }
                }
                match std::fs::write(&path, data) {
                    Ok(()) => info!("failure screenshot saved to {path}"),
                    Err(e) => warn!("failed to save failure screenshot: {e}"),
                }
            }
            Err(e) => warn!("failed to capture failure screenshot: {e}"),
        }
    }
}
