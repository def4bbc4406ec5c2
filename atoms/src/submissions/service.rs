use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::model::{
    CreateSubmissionPayload, PatientDetails, Submission, SubmissionStatus, SubmissionUpdate,
};
use crate::error::CoreError;
use crate::media::{content_type_for_extension, extension_of, original_image_key, ObjectStore};
use crate::shapes::{AnnotationSet, SurfaceSize};
use crate::users::{can_view, require_admin, require_role, Actor, Role};

/// Persistence for submission records. Storage engine agnostic.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: &Submission) -> Result<(), CoreError>;

    /// Fails with `NotFound` when no record has this id.
    async fn fetch(&self, submission_id: &str) -> Result<Submission, CoreError>;

    async fn list(&self) -> Result<Vec<Submission>, CoreError>;

    /// Apply `update` and return the record as stored afterwards.
    async fn update(&self, submission_id: &str, update: SubmissionUpdate) -> Result<Submission, CoreError>;
}

/// Patient upload: store the photo, then record a `pending` submission.
pub async fn create_submission(
    store: &dyn SubmissionStore,
    objects: &dyn ObjectStore,
    actor: &Actor,
    payload: CreateSubmissionPayload,
) -> Result<Submission, CoreError> {
    require_role(actor, Role::Patient)?;

    let encoded = payload
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::Validation("Image file is required.".to_string()))?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| CoreError::Validation(format!("Image is not valid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(CoreError::Validation("Image file is required.".to_string()));
    }

    let ext = extension_of(payload.file_name.as_deref(), "png");
    let key = original_image_key(&ext);
    let original_image_url = objects.put(&key, bytes, content_type_for_extension(&ext)).await?;

    let now = chrono::Utc::now().to_rfc3339();
    let submission = Submission {
        submission_id: uuid::Uuid::new_v4().simple().to_string(),
        patient_id: actor.user_id.clone(),
        patient_details: PatientDetails {
            name: actor.user_name.clone(),
            patient_id: actor.user_id.clone(),
            email: actor.user_email.clone(),
            note: payload.note.filter(|n| !n.trim().is_empty()),
        },
        original_image_url,
        annotated_image_url: None,
        annotations: AnnotationSet::new().encode(),
        annotation_surface: None,
        status: SubmissionStatus::Pending,
        report_url: None,
        created_at: now.clone(),
        updated_at: now,
    };

    store.insert(&submission).await?;
    tracing::info!(
        "Created submission {} for patient {}",
        submission.submission_id,
        submission.patient_id
    );
    Ok(submission)
}

pub async fn get_for_actor(
    store: &dyn SubmissionStore,
    actor: &Actor,
    submission_id: &str,
) -> Result<Submission, CoreError> {
    let submission = store.fetch(submission_id).await?;
    if !can_view(actor, &submission.patient_id) {
        return Err(CoreError::Forbidden("Access denied".to_string()));
    }
    Ok(submission)
}

/// Every submission, newest first. Admin only.
pub async fn list_all(store: &dyn SubmissionStore, actor: &Actor) -> Result<Vec<Submission>, CoreError> {
    require_admin(actor)?;
    let mut submissions = store.list().await?;
    sort_newest_first(&mut submissions);
    Ok(submissions)
}

/// The caller's own submissions, newest first.
pub async fn list_for_patient(
    store: &dyn SubmissionStore,
    actor: &Actor,
) -> Result<Vec<Submission>, CoreError> {
    let mut submissions: Vec<Submission> = store
        .list()
        .await?
        .into_iter()
        .filter(|s| s.patient_id == actor.user_id)
        .collect();
    sort_newest_first(&mut submissions);
    Ok(submissions)
}

fn sort_newest_first(submissions: &mut [Submission]) {
    // RFC 3339 timestamps from one clock sort lexicographically.
    submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Rejected submissions are closed to further annotation and reporting.
pub fn ensure_open(submission: &Submission) -> Result<(), CoreError> {
    if submission.status == SubmissionStatus::Rejected {
        return Err(CoreError::Conflict(format!(
            "Submission {} has been rejected",
            submission.submission_id
        )));
    }
    Ok(())
}

pub async fn record_annotation(
    store: &dyn SubmissionStore,
    submission_id: &str,
    annotations: &AnnotationSet,
    annotation_surface: Option<SurfaceSize>,
    annotated_image_url: Option<String>,
) -> Result<Submission, CoreError> {
    store
        .update(
            submission_id,
            SubmissionUpdate::Annotated {
                annotations: annotations.encode(),
                annotation_surface,
                annotated_image_url,
            },
        )
        .await
}

pub async fn record_report(
    store: &dyn SubmissionStore,
    submission_id: &str,
    report_url: &str,
) -> Result<Submission, CoreError> {
    store
        .update(
            submission_id,
            SubmissionUpdate::Reported {
                report_url: report_url.to_string(),
            },
        )
        .await
}

/// Admin rejection, allowed from `pending` or `processed`.
pub async fn reject_submission(
    store: &dyn SubmissionStore,
    actor: &Actor,
    submission_id: &str,
) -> Result<Submission, CoreError> {
    require_admin(actor)?;
    let submission = store.update(submission_id, SubmissionUpdate::Rejected).await?;
    tracing::info!("Submission {} rejected by {}", submission_id, actor.user_id);
    Ok(submission)
}
