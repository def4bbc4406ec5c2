use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::model::{Submission, SubmissionUpdate};
use super::service::SubmissionStore;
use crate::error::CoreError;

/// Process-local submission table used by tests and local runs.
#[derive(Default)]
pub struct MemorySubmissionStore {
    records: Mutex<HashMap<String, Submission>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Submission>>, CoreError> {
        self.records
            .lock()
            .map_err(|_| CoreError::Internal("submission store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn insert(&self, submission: &Submission) -> Result<(), CoreError> {
        self.lock()?
            .insert(submission.submission_id.clone(), submission.clone());
        Ok(())
    }

    async fn fetch(&self, submission_id: &str) -> Result<Submission, CoreError> {
        self.lock()?
            .get(submission_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("Submission", submission_id))
    }

    async fn list(&self) -> Result<Vec<Submission>, CoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    async fn update(&self, submission_id: &str, update: SubmissionUpdate) -> Result<Submission, CoreError> {
        let mut records = self.lock()?;
        let submission = records
            .get_mut(submission_id)
            .ok_or_else(|| CoreError::not_found("Submission", submission_id))?;
        update.apply(submission, &chrono::Utc::now().to_rfc3339());
        Ok(submission.clone())
    }
}
