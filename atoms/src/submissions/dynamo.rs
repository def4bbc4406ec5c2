use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

use super::model::{PatientDetails, Submission, SubmissionStatus, SubmissionUpdate};
use super::service::SubmissionStore;
use crate::error::CoreError;
use crate::shapes::SurfaceSize;

/// Submissions live in the single table:
/// PK = "SUBMISSION"
/// SK = "SUBMISSION#{submission_id}"
pub struct DynamoSubmissionStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoSubmissionStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

const PK: &str = "SUBMISSION";

fn sort_key(submission_id: &str) -> String {
    format!("SUBMISSION#{}", submission_id)
}

fn get_s(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).map(|s| s.to_string())
}

fn get_n(item: &HashMap<String, AttributeValue>, key: &str) -> Option<f64> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
}

fn item_to_submission(item: &HashMap<String, AttributeValue>) -> Result<Submission, CoreError> {
    let submission_id = get_s(item, "SK")
        .and_then(|sk| sk.strip_prefix("SUBMISSION#").map(|s| s.to_string()))
        .ok_or_else(|| CoreError::Internal("Submission item without SK".to_string()))?;

    let annotation_surface = match (get_n(item, "surface_width"), get_n(item, "surface_height")) {
        (Some(width), Some(height)) => Some(SurfaceSize::new(width, height)),
        _ => None,
    };

    let status = get_s(item, "status")
        .and_then(|s| SubmissionStatus::parse(&s))
        .unwrap_or_default();

    Ok(Submission {
        patient_id: get_s(item, "patient_id").unwrap_or_default(),
        patient_details: PatientDetails {
            name: get_s(item, "patient_name").unwrap_or_default(),
            patient_id: get_s(item, "patient_ref").unwrap_or_default(),
            email: get_s(item, "patient_email").unwrap_or_default(),
            note: get_s(item, "patient_note"),
        },
        original_image_url: get_s(item, "original_image_url").unwrap_or_default(),
        annotated_image_url: get_s(item, "annotated_image_url"),
        annotations: get_s(item, "annotations").unwrap_or_else(|| "[]".to_string()),
        annotation_surface,
        status,
        report_url: get_s(item, "report_url"),
        created_at: get_s(item, "created_at").unwrap_or_default(),
        updated_at: get_s(item, "updated_at").unwrap_or_default(),
        submission_id,
    })
}

#[async_trait]
impl SubmissionStore for DynamoSubmissionStore {
    async fn insert(&self, submission: &Submission) -> Result<(), CoreError> {
        let details = &submission.patient_details;
        let mut builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(PK.to_string()))
            .item("SK", AttributeValue::S(sort_key(&submission.submission_id)))
            .item("patient_id", AttributeValue::S(submission.patient_id.clone()))
            .item("patient_name", AttributeValue::S(details.name.clone()))
            .item("patient_ref", AttributeValue::S(details.patient_id.clone()))
            .item("patient_email", AttributeValue::S(details.email.clone()))
            .item("original_image_url", AttributeValue::S(submission.original_image_url.clone()))
            .item("annotations", AttributeValue::S(submission.annotations.clone()))
            .item("status", AttributeValue::S(submission.status.as_str().to_string()))
            .item("created_at", AttributeValue::S(submission.created_at.clone()))
            .item("updated_at", AttributeValue::S(submission.updated_at.clone()));

        // Optional attributes are only written when present
        if let Some(note) = &details.note {
            builder = builder.item("patient_note", AttributeValue::S(note.clone()));
        }
        if let Some(url) = &submission.annotated_image_url {
            builder = builder.item("annotated_image_url", AttributeValue::S(url.clone()));
        }
        if let Some(url) = &submission.report_url {
            builder = builder.item("report_url", AttributeValue::S(url.clone()));
        }
        if let Some(surface) = submission.annotation_surface {
            builder = builder
                .item("surface_width", AttributeValue::N(surface.width.to_string()))
                .item("surface_height", AttributeValue::N(surface.height.to_string()));
        }

        builder
            .send()
            .await
            .map_err(|e| CoreError::Storage(format!("DynamoDB put_item error: {}", e)))?;
        Ok(())
    }

    async fn fetch(&self, submission_id: &str) -> Result<Submission, CoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(PK.to_string()))
            .key("SK", AttributeValue::S(sort_key(submission_id)))
            .send()
            .await
            .map_err(|e| CoreError::Storage(format!("DynamoDB get_item error: {}", e)))?;

        match result.item() {
            Some(item) => item_to_submission(item),
            None => Err(CoreError::not_found("Submission", submission_id)),
        }
    }

    async fn list(&self) -> Result<Vec<Submission>, CoreError> {
        let mut submissions = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(PK.to_string()))
                .expression_attribute_values(":sk_prefix", AttributeValue::S("SUBMISSION#".to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| CoreError::Storage(format!("DynamoDB query error: {}", e)))?;

            for item in result.items() {
                submissions.push(item_to_submission(item)?);
            }

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(submissions)
    }

    async fn update(&self, submission_id: &str, update: SubmissionUpdate) -> Result<Submission, CoreError> {
        let now = chrono::Utc::now().to_rfc3339();

        // Start with status + timestamp, then add per-update attributes
        let mut set_parts: Vec<&str> = vec!["#status = :status", "updated_at = :updated_at"];
        let mut remove_parts: Vec<&str> = Vec::new();
        let mut expr_values: Vec<(&str, AttributeValue)> = vec![
            (":status", AttributeValue::S(update.status().as_str().to_string())),
            (":updated_at", AttributeValue::S(now)),
        ];

        match &update {
            SubmissionUpdate::Annotated {
                annotations,
                annotation_surface,
                annotated_image_url,
            } => {
                set_parts.push("annotations = :annotations");
                expr_values.push((":annotations", AttributeValue::S(annotations.clone())));

                match annotated_image_url {
                    Some(url) => {
                        set_parts.push("annotated_image_url = :annotated_image_url");
                        expr_values.push((":annotated_image_url", AttributeValue::S(url.clone())));
                    }
                    None => remove_parts.push("annotated_image_url"),
                }

                match annotation_surface {
                    Some(surface) => {
                        set_parts.push("surface_width = :surface_width");
                        set_parts.push("surface_height = :surface_height");
                        expr_values.push((":surface_width", AttributeValue::N(surface.width.to_string())));
                        expr_values.push((":surface_height", AttributeValue::N(surface.height.to_string())));
                    }
                    None => {
                        remove_parts.push("surface_width");
                        remove_parts.push("surface_height");
                    }
                }
            }
            SubmissionUpdate::Reported { report_url } => {
                set_parts.push("report_url = :report_url");
                expr_values.push((":report_url", AttributeValue::S(report_url.clone())));
            }
            SubmissionUpdate::Rejected => {}
        }

        let mut update_expression = format!("SET {}", set_parts.join(", "));
        if !remove_parts.is_empty() {
            update_expression.push_str(&format!(" REMOVE {}", remove_parts.join(", ")));
        }

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(PK.to_string()))
            .key("SK", AttributeValue::S(sort_key(submission_id)))
            .update_expression(update_expression)
            .condition_expression("attribute_exists(SK)")
            .expression_attribute_names("#status", "status")
            .return_values(ReturnValue::AllNew);

        for (name, value) in expr_values {
            builder = builder.expression_attribute_values(name, value);
        }

        let result = builder.send().await.map_err(|e| {
            let missing = e
                .as_service_error()
                .map(|se| se.is_conditional_check_failed_exception())
                .unwrap_or(false);
            if missing {
                CoreError::not_found("Submission", submission_id)
            } else {
                CoreError::Storage(format!("DynamoDB update_item error: {}", e))
            }
        })?;

        match result.attributes() {
            Some(item) => item_to_submission(item),
            None => self.fetch(submission_id).await,
        }
    }
}
