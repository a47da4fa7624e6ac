use async_trait::async_trait;
use autopunch_core::config::{Credentials, TimingConfig};
use autopunch_core::{
    resolve, ActionOutcome, Clock, CycleSpec, Element, Error, FailureReason, Locator, LocatorSet,
    LocatorSets, PunchAction, PunchSession, Reporter, Session,
};
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct JournalInner {
    opened: Vec<String>,
    find_calls: Vec<String>,
    fills: Vec<(String, String)>,
    clicks: Vec<String>,
    closes: u32,
}

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<JournalInner>>);

impl Journal {
    fn lock(&self) -> std::sync::MutexGuard<'_, JournalInner> {
        self.0.lock().unwrap()
    }
}

/// Session playing back a canned page: a map from locator pattern to the
/// elements it matches.
#[derive(Default)]
struct ScriptedSession {
    page: HashMap<String, Vec<Element>>,
    fail_open: bool,
    fail_click_on: Option<String>,
    journal: Journal,
}

impl ScriptedSession {
    fn new(page: HashMap<String, Vec<Element>>) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

fn el(path: &str, text: &str) -> Element {
    Element {
        path: path.to_string(),
        text: text.to_string(),
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn open(&mut self, url: &str) -> autopunch_core::Result<()> {
        if self.fail_open {
            return Err(Error::Session("net::ERR_NAME_NOT_RESOLVED".into()));
        }
        self.journal.lock().opened.push(url.to_string());
        Ok(())
    }

    async fn find_all(
        &mut self,
        locator: &Locator,
        _timeout: Duration,
    ) -> autopunch_core::Result<Vec<Element>> {
        self.journal.lock().find_calls.push(locator.pattern.clone());
        Ok(self.page.get(&locator.pattern).cloned().unwrap_or_default())
    }

    async fn fill(&mut self, element: &Element, value: &str) -> autopunch_core::Result<()> {
        self.journal
            .lock()
            .fills
            .push((element.path.clone(), value.to_string()));
        Ok(())
    }

    async fn scroll_into_view(&mut self, _element: &Element) -> autopunch_core::Result<()> {
        Ok(())
    }

    async fn click(&mut self, element: &Element) -> autopunch_core::Result<()> {
        if self.fail_click_on.as_deref() == Some(element.path.as_str()) {
            return Err(Error::Session("node detached from document".into()));
        }
        self.journal.lock().clicks.push(element.path.clone());
        Ok(())
    }

    async fn sleep(&mut self, _ms: u64) {}

    async fn screenshot(&mut self) -> autopunch_core::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn current_url(&mut self) -> autopunch_core::Result<String> {
        Ok("https://clock.example.com/dashboard".to_string())
    }

    async fn close(&mut self) -> autopunch_core::Result<()> {
        self.journal.lock().closes += 1;
        Ok(())
    }
}

struct FixedClock(DateTime<Tz>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.0
    }
}

fn fixed_clock() -> Arc<FixedClock> {
    let at = chrono_tz::Asia::Kolkata
        .with_ymd_and_hms(2025, 6, 2, 10, 0, 7)
        .unwrap();
    Arc::new(FixedClock(at))
}

#[derive(Default)]
struct MemoryReporter {
    records: Mutex<Vec<ActionOutcome>>,
    fail: bool,
}

impl Reporter for MemoryReporter {
    fn record(&self, outcome: &ActionOutcome) -> autopunch_core::Result<()> {
        if self.fail {
            return Err(Error::Report("disk full".into()));
        }
        self.records.lock().unwrap().push(outcome.clone());
        Ok(())
    }
}

fn zero_timing() -> TimingConfig {
    TimingConfig {
        locator_timeout_ms: 0,
        after_open_ms: 0,
        after_login_ms: 0,
        before_click_ms: 0,
        after_click_ms: 0,
    }
}

fn cycle_spec() -> CycleSpec {
    CycleSpec {
        target_url: "https://clock.example.com/login".to_string(),
        credentials: Credentials {
            username: "alice@example.com".to_string(),
            password: "secret".to_string(),
        },
        locators: LocatorSets {
            username: LocatorSet::new("username", vec![Locator::css("#email")]),
            password: LocatorSet::new("password", vec![Locator::css("#password")]),
            submit: LocatorSet::new("submit", vec![Locator::css("#login")]),
            punch_in: LocatorSet::new(
                "punch-in",
                vec![
                    Locator::css("button.mybtn").expect_text("Punch In"),
                    Locator::text("Punch In"),
                ],
            ),
            punch_out: LocatorSet::new(
                "punch-out",
                vec![Locator::css("button.mybtn").expect_text("Punch Out")],
            ),
        },
        timing: zero_timing(),
        failure_screenshot: None,
    }
}

/// Canned page where login and both punch buttons resolve.
fn full_page() -> HashMap<String, Vec<Element>> {
    HashMap::from([
        ("#email".to_string(), vec![el("#email", "")]),
        ("#password".to_string(), vec![el("#password", "")]),
        ("#login".to_string(), vec![el("#login", "Sign in")]),
        (
            "button.mybtn".to_string(),
            vec![
                el("main > button:nth-child(1)", "Punch In"),
                el("main > button:nth-child(2)", "Punch Out"),
            ],
        ),
    ])
}

#[tokio::test]
async fn first_matching_locator_wins_and_stops_the_chain() {
    let page = HashMap::from([("#b".to_string(), vec![el("#b", "go")])]);
    let mut session = ScriptedSession::new(page);
    let journal = session.journal();

    let set = LocatorSet::new(
        "submit",
        vec![Locator::css("#a"), Locator::css("#b"), Locator::css("#c")],
    );
    let found = resolve(&mut session, &set, Duration::ZERO).await.unwrap();

    assert_eq!(found.element.path, "#b");
    assert_eq!(found.locator, Locator::css("#b"));
    // "#c" is never attempted.
    assert_eq!(journal.lock().find_calls, vec!["#a", "#b"]);
}

#[tokio::test]
async fn exhausted_set_reports_its_target() {
    let mut session = ScriptedSession::new(HashMap::new());
    let journal = session.journal();
    let set = LocatorSet::new("punch-in", vec![Locator::css("#a"), Locator::text("Punch In")]);

    let err = resolve(&mut session, &set, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::LocatorSetExhausted { ref target } if target.as_str() == "punch-in"
    ));
    // Every locator was attempted before giving up.
    assert_eq!(journal.lock().find_calls, vec!["#a", "Punch In"]);
}

#[tokio::test]
async fn expect_text_picks_among_several_matches() {
    let mut session = ScriptedSession::new(full_page());
    let set = LocatorSet::new(
        "punch-out",
        vec![Locator::css("button.mybtn").expect_text("Punch Out")],
    );

    let found = resolve(&mut session, &set, Duration::ZERO).await.unwrap();
    assert_eq!(found.element.text, "Punch Out");
    assert_eq!(found.element.path, "main > button:nth-child(2)");
}

#[tokio::test]
async fn unsatisfied_text_constraint_falls_through_to_next_locator() {
    // The structural pattern matches, but neither button says "Clock In";
    // the chain moves on instead of clicking the wrong element.
    let mut page = full_page();
    page.insert("#fallback".to_string(), vec![el("#fallback", "Clock In")]);
    let mut session = ScriptedSession::new(page);
    let journal = session.journal();

    let set = LocatorSet::new(
        "punch-in",
        vec![
            Locator::css("button.mybtn").expect_text("Clock In"),
            Locator::css("#fallback"),
        ],
    );
    let found = resolve(&mut session, &set, Duration::ZERO).await.unwrap();
    assert_eq!(found.element.path, "#fallback");
    assert_eq!(journal.lock().find_calls, vec!["button.mybtn", "#fallback"]);
}

#[tokio::test]
async fn successful_cycle_logs_in_clicks_once_and_records() {
    let session = ScriptedSession::new(full_page());
    let journal = session.journal();
    let reporter = MemoryReporter::default();

    let punch = PunchSession::new(session, fixed_clock(), cycle_spec());
    let outcome = punch.run(PunchAction::PunchIn, &reporter).await;

    assert!(outcome.succeeded);
    assert!(outcome.failure_reason.is_none());
    assert_eq!(
        outcome.locator_used,
        Some(Locator::css("button.mybtn").expect_text("Punch In"))
    );
    assert_eq!(outcome.timestamp, fixed_clock().now());

    let journal = journal.lock();
    assert_eq!(journal.opened, vec!["https://clock.example.com/login"]);
    assert_eq!(
        journal.fills,
        vec![
            ("#email".to_string(), "alice@example.com".to_string()),
            ("#password".to_string(), "secret".to_string()),
        ]
    );
    assert_eq!(
        journal.clicks,
        vec!["#login", "main > button:nth-child(1)"]
    );
    assert_eq!(journal.closes, 1);

    let records = reporter.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].succeeded);
}

#[tokio::test]
async fn missing_punch_button_fails_with_action_button_not_found() {
    let mut page = full_page();
    page.remove("button.mybtn");
    let session = ScriptedSession::new(page);
    let journal = session.journal();
    let reporter = MemoryReporter::default();

    let punch = PunchSession::new(session, fixed_clock(), cycle_spec());
    let outcome = punch.run(PunchAction::PunchIn, &reporter).await;

    assert!(!outcome.succeeded);
    assert!(outcome.locator_used.is_none());
    let reason = outcome.failure_reason.unwrap();
    assert_eq!(reason, FailureReason::ActionButtonNotFound);
    assert_eq!(reason.to_string(), "ActionButtonNotFound");
    // The failed outcome is still recorded, and the browser still released.
    assert_eq!(reporter.records.lock().unwrap().len(), 1);
    assert_eq!(journal.lock().closes, 1);
}

#[tokio::test]
async fn missing_login_field_names_the_target() {
    let mut page = full_page();
    page.remove("#password");
    let session = ScriptedSession::new(page);
    let journal = session.journal();
    let reporter = MemoryReporter::default();

    let punch = PunchSession::new(session, fixed_clock(), cycle_spec());
    let outcome = punch.run(PunchAction::PunchOut, &reporter).await;

    assert_eq!(
        outcome.failure_reason,
        Some(FailureReason::LoginElementNotFound("password".to_string()))
    );
    assert_eq!(journal.lock().closes, 1);
}

#[tokio::test]
async fn navigation_failure_is_a_session_error() {
    let session = ScriptedSession {
        fail_open: true,
        ..ScriptedSession::new(full_page())
    };
    let journal = session.journal();
    let reporter = MemoryReporter::default();

    let punch = PunchSession::new(session, fixed_clock(), cycle_spec());
    let outcome = punch.run(PunchAction::PunchIn, &reporter).await;

    assert!(!outcome.succeeded);
    assert!(matches!(
        outcome.failure_reason,
        Some(FailureReason::SessionError(_))
    ));
    let journal = journal.lock();
    assert!(journal.fills.is_empty());
    assert_eq!(journal.closes, 1);
}

#[tokio::test]
async fn click_failure_is_a_session_error() {
    let session = ScriptedSession {
        fail_click_on: Some("main > button:nth-child(1)".to_string()),
        ..ScriptedSession::new(full_page())
    };
    let journal = session.journal();
    let reporter = MemoryReporter::default();

    let punch = PunchSession::new(session, fixed_clock(), cycle_spec());
    let outcome = punch.run(PunchAction::PunchIn, &reporter).await;

    assert!(!outcome.succeeded);
    match outcome.failure_reason {
        Some(FailureReason::SessionError(msg)) => assert!(msg.contains("detached")),
        other => panic!("unexpected reason: {other:?}"),
    }
    assert_eq!(journal.lock().closes, 1);
}

#[tokio::test]
async fn failure_screenshot_is_written_into_a_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir
        .path()
        .join("shots")
        .join("error-{timestamp}.png")
        .to_string_lossy()
        .into_owned();

    let mut page = full_page();
    page.remove("button.mybtn");
    let session = ScriptedSession::new(page);
    let reporter = MemoryReporter::default();

    let mut spec = cycle_spec();
    spec.failure_screenshot = Some(template);
    let punch = PunchSession::new(session, fixed_clock(), spec);
    let outcome = punch.run(PunchAction::PunchIn, &reporter).await;

    assert!(!outcome.succeeded);
    // "shots/" did not exist; it is created before the screenshot lands.
    let saved = dir.path().join("shots").join("error-2025-06-02_10-00-07.png");
    assert!(saved.exists());
}

#[tokio::test]
async fn recording_failure_downgrades_a_successful_cycle() {
    let session = ScriptedSession::new(full_page());
    let journal = session.journal();
    let reporter = MemoryReporter {
        fail: true,
        ..Default::default()
    };

    let punch = PunchSession::new(session, fixed_clock(), cycle_spec());
    let outcome = punch.run(PunchAction::PunchIn, &reporter).await;

    assert!(!outcome.succeeded);
    match outcome.failure_reason {
        Some(FailureReason::SessionError(msg)) => assert!(msg.contains("record")),
        other => panic!("unexpected reason: {other:?}"),
    }
    assert_eq!(journal.lock().closes, 1);
}
