use crate::pdf;
use crate::store::{PunchRecord, ReportStore};
use crate::Result;
use autopunch_core::config::EmailConfig;
use autopunch_core::ActionOutcome;
use chrono::NaiveDate;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::info;

/// Sends the daily summary after punch-out and an alert when a cycle fails.
pub struct Mailer {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { config, transport })
    }

    pub async fn send_daily_report(&self, date: NaiveDate, records: &[PunchRecord]) -> Result<()> {
        let message = build_daily_report(&self.config, date, records)?;
        self.transport.send(message).await?;
        info!("daily report mail sent for {date}");
        Ok(())
    }

    pub async fn send_error_report(&self, outcome: &ActionOutcome) -> Result<()> {
        let message = build_error_report(&self.config, outcome)?;
        self.transport.send(message).await?;
        info!("error mail sent for failed {}", outcome.action);
        Ok(())
    }
}

pub(crate) fn build_daily_report(
    config: &EmailConfig,
    date: NaiveDate,
    records: &[PunchRecord],
) -> Result<Message> {
    let find = |action: &str| {
        ReportStore::first_success(records, action)
            .map(|r| r.timestamp.clone())
            .unwrap_or_else(|| "-".to_string())
    };
    let worked = match ReportStore::worked_time(records) {
        Some((hours, minutes)) => format!("{hours}h {minutes}m"),
        None => "-".to_string(),
    };
    let log = records
        .iter()
        .map(|r| r.log_line())
        .collect::<Vec<_>>()
        .join("\n");

    let body = format!(
        r#"<h2>Daily Punch Report - {date}</h2>
<table>
  <tr><td>Punch In</td><td>{punch_in}</td></tr>
  <tr><td>Punch Out</td><td>{punch_out}</td></tr>
  <tr><td>Total Hours</td><td>{worked}</td></tr>
</table>
<pre>{log}</pre>
"#,
        punch_in = find("punch-in"),
        punch_out = find("punch-out"),
    );

    let report = pdf::daily_report_pdf(date, records)?;
    Ok(Message::builder()
        .from(config.from.parse()?)
        .to(config.to.parse()?)
        .subject(format!("Daily Punch Report - {date}"))
        .multipart(with_pdf(
            body,
            format!("autopunch-report-{date}.pdf"),
            report,
        )?)?)
}

pub(crate) fn build_error_report(config: &EmailConfig, outcome: &ActionOutcome) -> Result<Message> {
    let reason = outcome
        .failure_reason
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let date = outcome.timestamp.date_naive();

    let body = format!(
        r#"<h2>AutoPunch Error - {date}</h2>
<p>The <b>{action}</b> cycle failed at {at}.</p>
<p>Reason: <code>{reason}</code></p>
"#,
        action = outcome.action,
        at = outcome.timestamp.format(crate::TIMESTAMP_FORMAT),
    );

    let report = pdf::error_report_pdf(outcome)?;
    Ok(Message::builder()
        .from(config.from.parse()?)
        .to(config.to.parse()?)
        .subject(format!("AutoPunch Error - {date}"))
        .multipart(with_pdf(
            body,
            format!("autopunch-error-{date}.pdf"),
            report,
        )?)?)
}

/// HTML body plus the PDF rendition of the same report.
fn with_pdf(html: String, filename: String, report: Vec<u8>) -> Result<MultiPart> {
    Ok(MultiPart::mixed()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html),
        )
        .singlepart(Attachment::new(filename).body(report, "application/pdf".parse()?)))
}
