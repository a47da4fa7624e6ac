use crate::store::{PunchRecord, ReportStore};
use crate::{Error, Result, TIMESTAMP_FORMAT};
use autopunch_core::ActionOutcome;
use chrono::NaiveDate;
use printpdf::{BuiltinFont, Mm, PdfDocument};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LINE_HEIGHT_MM: f32 = 7.0;

/// A4 text report written line by line from the top margin down, breaking
/// onto a new page when the bottom margin is reached.
struct ReportPdf {
    doc: printpdf::PdfDocumentReference,
    layer: printpdf::PdfLayerReference,
    font: printpdf::IndirectFontRef,
    bold: printpdf::IndirectFontRef,
    y: f32,
}

impl ReportPdf {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| Error::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);
        let mut pdf = Self {
            doc,
            layer,
            font,
            bold,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        };
        pdf.layer
            .use_text(title, 16.0, Mm(MARGIN_MM), Mm(pdf.y), &pdf.bold);
        pdf.advance();
        pdf.advance();
        Ok(pdf)
    }

    fn advance(&mut self) {
        self.y -= LINE_HEIGHT_MM;
        if self.y < MARGIN_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }

    fn line(&mut self, text: &str) {
        self.layer
            .use_text(text, 11.0, Mm(MARGIN_MM), Mm(self.y), &self.font);
        self.advance();
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| Error::Pdf(e.to_string()))
    }
}

/// Printable counterpart of the daily report mail: punch times, total
/// hours, then the day's punch log.
pub fn daily_report_pdf(date: NaiveDate, records: &[PunchRecord]) -> Result<Vec<u8>> {
    let mut pdf = ReportPdf::new(&format!("Daily Punch Report - {date}"))?;

    let time_of = |action: &str| {
        ReportStore::first_success(records, action)
            .map(|r| r.timestamp.clone())
            .unwrap_or_else(|| "-".to_string())
    };
    let worked = match ReportStore::worked_time(records) {
        Some((hours, minutes)) => format!("{hours}h {minutes}m"),
        None => "-".to_string(),
    };

    pdf.line(&format!("Punch In:    {}", time_of("punch-in")));
    pdf.line(&format!("Punch Out:   {}", time_of("punch-out")));
    pdf.line(&format!("Total Hours: {worked}"));
    pdf.advance();
    for record in records {
        pdf.line(&record.log_line());
    }

    pdf.finish()
}

/// Printable counterpart of the error alert mail.
pub fn error_report_pdf(outcome: &ActionOutcome) -> Result<Vec<u8>> {
    let date = outcome.timestamp.date_naive();
    let reason = outcome
        .failure_reason
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut pdf = ReportPdf::new(&format!("AutoPunch Error - {date}"))?;
    pdf.line(&format!("Action: {}", outcome.action));
    pdf.line(&format!("Time:   {}", outcome.timestamp.format(TIMESTAMP_FORMAT)));
    pdf.line(&format!("Reason: {reason}"));

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopunch_core::{FailureReason, PunchAction};
    use chrono::TimeZone;

    fn record(action: &str, timestamp: &str) -> PunchRecord {
        PunchRecord {
            action: action.to_string(),
            succeeded: true,
            timestamp: timestamp.to_string(),
            employee: "alice@example.com".to_string(),
            locator: None,
            failure_reason: None,
        }
    }

    #[test]
    fn test_daily_report_pdf_renders() {
        let records = vec![
            record("punch-in", "2025-06-02 10:00:07"),
            record("punch-out", "2025-06-02 18:30:07"),
        ];
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let bytes = daily_report_pdf(date, &records).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_daily_report_pdf_breaks_onto_new_pages() {
        // Enough log lines to overflow one A4 page.
        let records: Vec<PunchRecord> = (0..60)
            .map(|i| record("punch-in", &format!("2025-06-02 10:{:02}:00", i % 60)))
            .collect();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let bytes = daily_report_pdf(date, &records).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_error_report_pdf_renders() {
        let outcome = ActionOutcome {
            action: PunchAction::PunchOut,
            succeeded: false,
            locator_used: None,
            timestamp: chrono_tz::Asia::Kolkata
                .with_ymd_and_hms(2025, 6, 2, 18, 0, 3)
                .unwrap(),
            failure_reason: Some(FailureReason::ActionButtonNotFound),
        };
        let bytes = error_report_pdf(&outcome).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
