//! # autopunch-report
//!
//! Persistence and notification for punch outcomes: one JSON report and one
//! plain-text punch log per day, plus optional SMTP mail (a daily summary
//! after punch-out, an alert on failure — each with a PDF rendition of the
//! report attached).

mod mail;
mod pdf;
mod store;

pub use mail::Mailer;
pub use pdf::{daily_report_pdf, error_report_pdf};
pub use store::{FileReporter, PunchRecord, ReportStore, TIMESTAMP_FORMAT};

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from record storage or mail delivery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("email error: {0}")]
    Email(#[from] lettre::error::Error),

    #[error("address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("content type error: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("timestamp error: {0}")]
    Timestamp(#[from] chrono::ParseError),
}
