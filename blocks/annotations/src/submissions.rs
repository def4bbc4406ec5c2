use base64::{engine::general_purpose::STANDARD, Engine as _};
use dentcheck_atoms::media::{content_type_for_extension, extension_of, fetch_with_retry, ObjectStore};
use dentcheck_atoms::responses::{error_response, json_response};
use dentcheck_atoms::shapes::{AnnotationSet, SurfaceSize};
use dentcheck_atoms::submissions::{ensure_open, record_annotation, Submission, SubmissionStore};
use dentcheck_atoms::users::{require_admin, Actor};
use dentcheck_atoms::CoreError;
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::export::{annotated_image_key, encode_png};
use crate::render::flatten_native;

/// Body of `PUT /api/submissions/{id}/annotate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotatePayload {
    /// Encoded annotation set.
    pub annotations: String,
    #[serde(default)]
    pub surface: Option<SurfaceSize>,
    /// Base64 flattened image exported by the editor.
    #[serde(default)]
    pub annotated_image: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
}

/// Persist the admin's annotations and the flattened image.
///
/// A blob that does not decode is a validation error and nothing is written.
/// When the editor did not send a flattened image but shapes exist, the
/// shapes are flattened here over the original at native resolution. Failing
/// to fetch the original only means no annotated image is recorded.
pub async fn save_annotation(
    store: &dyn SubmissionStore,
    objects: &dyn ObjectStore,
    actor: &Actor,
    submission_id: &str,
    payload: AnnotatePayload,
    fetch_timeout: Duration,
) -> Result<Submission, CoreError> {
    require_admin(actor)?;
    let submission = store.fetch(submission_id).await?;
    ensure_open(&submission)?;

    // Stored annotations are only replaced by a set that decodes. A blank
    // blob is an empty set.
    let annotations = if payload.annotations.trim().is_empty() {
        AnnotationSet::new()
    } else {
        AnnotationSet::try_decode(&payload.annotations)
            .map_err(|e| CoreError::Validation(format!("Annotations are malformed: {}", e)))?
    };

    let supplied = payload
        .annotated_image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let annotated_image_url = match supplied {
        Some(encoded) => {
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| CoreError::Validation(format!("Annotated image is not valid base64: {}", e)))?;
            let ext = payload
                .extension
                .as_deref()
                .map(|e| format!("annotated.{}", e.trim_start_matches('.')));
            let ext = extension_of(ext.as_deref(), "png");
            let key = annotated_image_key(submission_id, &ext);
            Some(objects.put(&key, bytes, content_type_for_extension(&ext)).await?)
        }
        None if !annotations.is_empty() => {
            flatten_on_server(objects, &submission, &annotations, payload.surface, fetch_timeout).await?
        }
        None => None,
    };

    let updated = record_annotation(store, submission_id, &annotations, payload.surface, annotated_image_url).await?;
    tracing::info!(
        "✅ Saved {} annotation(s) for submission {} (annotated image: {})",
        annotations.len(),
        submission_id,
        updated.annotated_image_url.is_some()
    );
    Ok(updated)
}

async fn flatten_on_server(
    objects: &dyn ObjectStore,
    submission: &Submission,
    annotations: &AnnotationSet,
    surface: Option<SurfaceSize>,
    fetch_timeout: Duration,
) -> Result<Option<String>, CoreError> {
    let bytes = match fetch_with_retry(objects, &submission.original_image_url, fetch_timeout).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                "Original image for {} unavailable, skipping flatten: {}",
                submission.submission_id,
                e
            );
            return Ok(None);
        }
    };

    let original = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(e) => {
            tracing::warn!("Original image for {} undecodable: {}", submission.submission_id, e);
            return Ok(None);
        }
    };

    let flattened = flatten_native(&original, annotations, surface);
    let png = encode_png(&flattened).map_err(|e| CoreError::Encoding(format!("PNG encode failed: {}", e)))?;
    let key = annotated_image_key(&submission.submission_id, "png");
    Ok(Some(objects.put(&key, png, "image/png").await?))
}

/// HTTP Handler: PUT /api/submissions/{id}/annotate
pub async fn annotate_handler(
    store: &dyn SubmissionStore,
    objects: &dyn ObjectStore,
    actor: &Actor,
    submission_id: &str,
    body: &[u8],
    fetch_timeout: Duration,
) -> Result<Response<Body>, Error> {
    tracing::info!(
        "📥 annotate_handler: submission_id={}, user_id={}, body_len={}",
        submission_id,
        actor.user_id,
        body.len()
    );

    let payload: AnnotatePayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&CoreError::from(e)),
    };

    match save_annotation(store, objects, actor, submission_id, payload, fetch_timeout).await {
        Ok(submission) => json_response(StatusCode::OK, &submission),
        Err(e) => {
            tracing::error!(
                "❌ annotate_handler failed: submission_id={}, error={}",
                submission_id,
                e
            );
            error_response(&e)
        }
    }
}
