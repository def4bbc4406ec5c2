use chrono::{DateTime, Utc};
use dentcheck_atoms::media::ObjectStore;
use dentcheck_atoms::CoreError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// `reports/report-<submissionId>-<millis>.pdf`
pub fn report_key(submission_id: &str, generated_at: DateTime<Utc>) -> String {
    format!("reports/report-{}-{}.pdf", submission_id, generated_at.timestamp_millis())
}

/// Uploads finished report documents. Recording the returned URL on the
/// submission is left to the caller.
pub struct ReportPublisher<'a> {
    objects: &'a dyn ObjectStore,
}

impl<'a> ReportPublisher<'a> {
    pub fn new(objects: &'a dyn ObjectStore) -> Self {
        Self { objects }
    }

    pub async fn publish(
        &self,
        submission_id: &str,
        pdf: Vec<u8>,
        generated_at: DateTime<Utc>,
    ) -> Result<String, CoreError> {
        let key = report_key(submission_id, generated_at);
        let size = pdf.len();
        let url = self.objects.put(&key, pdf, PDF_CONTENT_TYPE).await?;
        tracing::info!("Published report for {} ({} bytes) at {}", submission_id, size, url);
        Ok(url)
    }
}
