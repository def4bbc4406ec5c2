use chrono::Utc;
use dentcheck_atoms::media::{fetch_with_retry, ObjectStore};
use dentcheck_atoms::responses::{error_response, json_response};
use dentcheck_atoms::submissions::{ensure_open, record_report, Submission, SubmissionStore};
use dentcheck_atoms::users::{require_admin, Actor};
use dentcheck_atoms::CoreError;
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;
use std::time::Duration;

use crate::layout::ReportSettings;
use crate::pdf::{render_report, ReportImages};
use crate::publisher::ReportPublisher;

#[derive(Debug, Serialize)]
pub struct GeneratedReport {
    pub message: String,
    pub report_url: String,
    pub submission: Submission,
}

/// Image bytes for the report, or `None` when the fetch failed.
async fn fetch_soft(objects: &dyn ObjectStore, location: Option<&str>, timeout: Duration) -> Option<Vec<u8>> {
    let location = location.filter(|l| !l.trim().is_empty())?;
    match fetch_with_retry(objects, location, timeout).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("Report image {} unavailable, leaving slot empty: {}", location, e);
            None
        }
    }
}

/// Fetch both report images concurrently. A slot whose image cannot be
/// fetched or decoded is left empty.
pub async fn fetch_report_images(objects: &dyn ObjectStore, submission: &Submission, timeout: Duration) -> ReportImages {
    let (original, annotated) = tokio::join!(
        fetch_soft(objects, Some(submission.original_image_url.as_str()), timeout),
        fetch_soft(objects, submission.annotated_image_url.as_deref(), timeout),
    );
    ReportImages::decode(original.as_deref(), annotated.as_deref())
}

/// Compose the report for a submission, upload it and record its URL.
///
/// The submission is only updated after the upload succeeds.
pub async fn generate_report(
    store: &dyn SubmissionStore,
    objects: &dyn ObjectStore,
    actor: &Actor,
    submission_id: &str,
    settings: &ReportSettings,
    fetch_timeout: Duration,
) -> Result<GeneratedReport, CoreError> {
    require_admin(actor)?;
    let submission = store.fetch(submission_id).await?;
    ensure_open(&submission)?;

    let images = fetch_report_images(objects, &submission, fetch_timeout).await;
    let generated_at = Utc::now();
    let pdf = render_report(&submission, &images, settings, generated_at)?;

    let report_url = ReportPublisher::new(objects)
        .publish(submission_id, pdf, generated_at)
        .await?;
    let submission = record_report(store, submission_id, &report_url).await?;

    Ok(GeneratedReport {
        message: "PDF generated and uploaded".to_string(),
        report_url,
        submission,
    })
}

/// HTTP Handler: POST /api/submissions/{id}/generate-pdf
pub async fn generate_report_handler(
    store: &dyn SubmissionStore,
    objects: &dyn ObjectStore,
    actor: &Actor,
    submission_id: &str,
    settings: &ReportSettings,
    fetch_timeout: Duration,
) -> Result<Response<Body>, Error> {
    tracing::info!(
        "📥 generate_report_handler: submission_id={}, user_id={}",
        submission_id,
        actor.user_id
    );

    match generate_report(store, objects, actor, submission_id, settings, fetch_timeout).await {
        Ok(report) => {
            tracing::info!("✅ Report ready for {}: {}", submission_id, report.report_url);
            json_response(StatusCode::OK, &report)
        }
        Err(e) => {
            tracing::error!(
                "❌ generate_report_handler failed: submission_id={}, error={}",
                submission_id,
                e
            );
            error_response(&e)
        }
    }
}
