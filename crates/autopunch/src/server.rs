use crate::trigger::{Busy, PunchTrigger};
use autopunch_core::{Config, PunchAction};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub trigger: Arc<PunchTrigger>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/run", post(run))
        .route("/logs", get(logs))
        .route("/schedule", get(schedule))
        .with_state(state)
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": &state.config.name,
        "target": &state.config.target.url,
        "schedule": {
            "timezone": state.config.schedule.timezone.name(),
            "punch_in": &state.config.schedule.punch_in,
            "punch_out": &state.config.schedule.punch_out,
        },
        "endpoints": ["/health", "/run", "/logs", "/schedule"],
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct RunQuery {
    action: String,
}

async fn run(State(state): State<AppState>, Query(query): Query<RunQuery>) -> impl IntoResponse {
    let Some(action) = PunchAction::parse(&query.action) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("unknown action '{}', expected punch-in or punch-out", query.action),
            })),
        );
    };

    match state.trigger.trigger(action).await {
        Err(Busy) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "a punch cycle is already running" })),
        ),
        Ok(outcome) => {
            let status = if outcome.succeeded {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                status,
                Json(json!({
                    "action": outcome.action.slug(),
                    "succeeded": outcome.succeeded,
                    "timestamp": outcome.timestamp.to_rfc3339(),
                    "locator": outcome.locator_used.map(|l| l.to_string()),
                    "failure_reason": outcome.failure_reason.map(|r| r.to_string()),
                })),
            )
        }
    }
}

#[derive(Deserialize)]
struct LogsQuery {
    date: Option<String>,
}

async fn logs(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> impl IntoResponse {
    let date = match query.date {
        Some(ref raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("invalid date '{raw}', expected YYYY-MM-DD") })),
                )
            }
        },
        None => state.trigger.today(),
    };

    let store = state.trigger.store();
    let (records, lines) = match (store.day(date), store.log_lines(date, 20)) {
        (Ok(records), Ok(lines)) => (records, lines),
        (Err(e), _) | (_, Err(e)) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    };

    let success_count = records.iter().filter(|r| r.succeeded).count();
    (
        StatusCode::OK,
        Json(json!({
            "date": date.to_string(),
            "report_count": records.len(),
            "success_count": success_count,
            "reports": records,
            "log_entries": lines,
        })),
    )
}

async fn schedule(State(state): State<AppState>) -> impl IntoResponse {
    let schedule = &state.config.schedule;
    let (Ok(punch_in), Ok(punch_out)) = (schedule.punch_in_at(), schedule.punch_out_at()) else {
        // Validated at load time.
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "invalid schedule" })),
        );
    };

    let now = state.trigger.now();
    (
        StatusCode::OK,
        Json(json!({
            "timezone": schedule.timezone.name(),
            "punch_in": {
                "at": &schedule.punch_in,
                "next": next_occurrence(now, punch_in).to_rfc3339(),
            },
            "punch_out": {
                "at": &schedule.punch_out,
                "next": next_occurrence(now, punch_out).to_rfc3339(),
            },
        })),
    )
}

/// Next time the wall clock reads `at`: today if still ahead, else tomorrow.
fn next_occurrence(now: DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive().and_time(at);
    if let Some(candidate) = tz.from_local_datetime(&today).earliest() {
        if candidate > now {
            return candidate;
        }
    }
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    tz.from_local_datetime(&tomorrow).earliest().unwrap_or(now)
}
