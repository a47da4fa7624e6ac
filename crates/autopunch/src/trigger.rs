use autopunch_core::{
    ActionOutcome, Clock, Config, CycleSpec, EokaSession, FailureReason, PunchAction,
    PunchSession, Reporter, SystemClock,
};
use autopunch_report::{FileReporter, Mailer, ReportStore};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A cycle is already in flight; the request was rejected, not queued.
#[derive(Debug)]
pub struct Busy;

/// Entry point both the scheduler and the HTTP server call.
///
/// Serializes cycles: whoever asks while one is running gets [`Busy`] back
/// immediately. Owns the retry policy and the notification mail.
pub struct PunchTrigger {
    config: Arc<Config>,
    spec: CycleSpec,
    clock: Arc<dyn Clock>,
    store: ReportStore,
    reporter: FileReporter,
    mailer: Option<Mailer>,
    running: Mutex<()>,
}

impl PunchTrigger {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let store = ReportStore::new(&config.report.dir);
        let reporter = FileReporter::new(store.clone(), &config.credentials.username);
        let mailer = match config.email {
            Some(ref email) => Some(Mailer::new(email.clone())?),
            None => None,
        };
        Ok(Self {
            spec: CycleSpec::from_config(&config),
            clock: Arc::new(SystemClock::new(config.schedule.timezone)),
            config,
            store,
            reporter,
            mailer,
            running: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Current time in the configured timezone.
    pub fn now(&self) -> chrono::DateTime<chrono_tz::Tz> {
        self.clock.now()
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Run one punch, retrying per config, and send any configured mail.
    pub async fn trigger(&self, action: PunchAction) -> Result<ActionOutcome, Busy> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("{action} rejected: a cycle is already running");
            return Err(Busy);
        };

        let (attempts, delay_ms) = match self.config.retry {
            Some(ref retry) => (retry.attempts, retry.delay_ms),
            None => (1, 0),
        };

        let mut outcome = self.run_cycle(action).await;
        for attempt in 2..=attempts {
            if outcome.succeeded {
                break;
            }
            info!("retry attempt {}/{} for {action}", attempt, attempts);
            if delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
            outcome = self.run_cycle(action).await;
        }

        self.notify(&outcome).await;
        Ok(outcome)
    }

    async fn run_cycle(&self, action: PunchAction) -> ActionOutcome {
        let session = match EokaSession::launch(&self.config.browser).await {
            Ok(session) => session,
            Err(e) => {
                warn!("browser launch failed: {e}");
                let outcome = ActionOutcome {
                    action,
                    succeeded: false,
                    locator_used: None,
                    timestamp: self.clock.now(),
                    failure_reason: Some(FailureReason::SessionError(e.to_string())),
                };
                if let Err(e) = self.reporter.record(&outcome) {
                    warn!("failed to record outcome: {e}");
                }
                return outcome;
            }
        };

        let punch = PunchSession::new(session, self.clock.clone(), self.spec.clone());
        punch.run(action, &self.reporter).await
    }

    /// Mail is best-effort: a delivery failure never changes the outcome.
    async fn notify(&self, outcome: &ActionOutcome) {
        let Some(ref mailer) = self.mailer else {
            return;
        };

        if !outcome.succeeded {
            if let Err(e) = mailer.send_error_report(outcome).await {
                warn!("error mail failed: {e}");
            }
            return;
        }

        // The daily summary goes out once the day is complete.
        if outcome.action == PunchAction::PunchOut {
            let date = outcome.timestamp.date_naive();
            match self.store.day(date) {
                Ok(records) => {
                    if let Err(e) = mailer.send_daily_report(date, &records).await {
                        warn!("daily report mail failed: {e}");
                    }
                }
                Err(e) => warn!("could not read day's records for the report: {e}"),
            }
        }
    }
}
