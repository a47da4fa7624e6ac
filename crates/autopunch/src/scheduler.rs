use crate::trigger::PunchTrigger;
use autopunch_core::config::ScheduleConfig;
use autopunch_core::PunchAction;
use chrono::{NaiveTime, Timelike};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

/// Six-field cron expression firing once a day at the given wall time.
fn daily_cron(at: NaiveTime) -> String {
    format!("0 {} {} * * *", at.minute(), at.hour())
}

/// Register both punches and start the scheduler. The returned handle must
/// stay alive for the jobs to keep firing.
pub async fn start(
    schedule: &ScheduleConfig,
    trigger: Arc<PunchTrigger>,
) -> anyhow::Result<JobScheduler> {
    let sched = JobScheduler::new().await?;

    let jobs = [
        (PunchAction::PunchIn, schedule.punch_in_at()?),
        (PunchAction::PunchOut, schedule.punch_out_at()?),
    ];
    for (action, at) in jobs {
        let expr = daily_cron(at);
        info!(
            "scheduling {action} daily at {} ({})",
            at.format("%H:%M"),
            schedule.timezone
        );
        let trigger = trigger.clone();
        let job = Job::new_async_tz(expr.as_str(), schedule.timezone, move |_uuid, _sched| {
            let trigger = trigger.clone();
            Box::pin(async move {
                info!("scheduled {action} firing");
                match trigger.trigger(action).await {
                    Ok(outcome) if outcome.succeeded => {
                        info!("scheduled {action} completed at {}", outcome.timestamp)
                    }
                    Ok(_) => warn!("scheduled {action} failed"),
                    Err(_) => warn!("scheduled {action} skipped: a cycle is already running"),
                }
            })
        })?;
        sched.add(job).await?;
    }

    sched.start().await?;
    Ok(sched)
}
