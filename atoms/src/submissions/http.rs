use lambda_http::{http::StatusCode, Body, Error, Response};

use super::model::CreateSubmissionPayload;
use super::service::{self, SubmissionStore};
use crate::error::CoreError;
use crate::media::ObjectStore;
use crate::responses::{error_response, json_response};
use crate::users::Actor;

/// HTTP Handler: POST /api/submissions/upload
pub async fn upload_handler(
    store: &dyn SubmissionStore,
    objects: &dyn ObjectStore,
    actor: &Actor,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: CreateSubmissionPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => return error_response(&CoreError::from(e)),
    };

    match service::create_submission(store, objects, actor, payload).await {
        Ok(submission) => json_response(StatusCode::CREATED, &submission),
        Err(e) => {
            tracing::error!("❌ upload_handler failed: user_id={}, error={}", actor.user_id, e);
            error_response(&e)
        }
    }
}

/// HTTP Handler: GET /api/submissions/{id}
pub async fn get_handler(
    store: &dyn SubmissionStore,
    actor: &Actor,
    submission_id: &str,
) -> Result<Response<Body>, Error> {
    match service::get_for_actor(store, actor, submission_id).await {
        Ok(submission) => json_response(StatusCode::OK, &submission),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: GET /api/submissions/admin/all
pub async fn list_all_handler(store: &dyn SubmissionStore, actor: &Actor) -> Result<Response<Body>, Error> {
    match service::list_all(store, actor).await {
        Ok(submissions) => json_response(StatusCode::OK, &submissions),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: GET /api/submissions/patient/my
pub async fn list_mine_handler(store: &dyn SubmissionStore, actor: &Actor) -> Result<Response<Body>, Error> {
    match service::list_for_patient(store, actor).await {
        Ok(submissions) => json_response(StatusCode::OK, &submissions),
        Err(e) => error_response(&e),
    }
}

/// HTTP Handler: PATCH /api/submissions/{id}/reject
pub async fn reject_handler(
    store: &dyn SubmissionStore,
    actor: &Actor,
    submission_id: &str,
) -> Result<Response<Body>, Error> {
    match service::reject_submission(store, actor, submission_id).await {
        Ok(submission) => json_response(
            StatusCode::OK,
            &serde_json::json!({
                "message": "Submission has been rejected successfully.",
                "submission": submission,
            }),
        ),
        Err(e) => {
            tracing::error!("❌ reject_handler failed: submission_id={}, error={}", submission_id, e);
            error_response(&e)
        }
    }
}
