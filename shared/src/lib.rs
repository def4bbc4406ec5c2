pub mod auth;
pub mod config;

use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use dentcheck_atoms::media::{MemoryObjectStore, ObjectStore, S3ObjectStore};
use dentcheck_atoms::submissions::{DynamoSubmissionStore, MemorySubmissionStore, SubmissionStore};
use std::sync::Arc;

pub use config::AppConfig;

/// Everything a request handler needs, built once per cold start.
pub struct AppState {
    pub config: AppConfig,
    pub submissions: Arc<dyn SubmissionStore>,
    pub objects: Arc<dyn ObjectStore>,
}

impl AppState {
    /// DynamoDB and S3 backed state from the environment.
    pub async fn from_env() -> Self {
        let config = AppConfig::from_env();
        let aws = aws_config::load_from_env().await;

        let submissions = DynamoSubmissionStore::new(DynamoClient::new(&aws), config.table_name.clone());
        let objects = S3ObjectStore::new(S3Client::new(&aws), config.bucket_name.clone(), config.region.clone());

        tracing::info!(
            "AppState ready: table={}, bucket={}, region={}",
            config.table_name,
            config.bucket_name,
            config.region
        );

        Self {
            config,
            submissions: Arc::new(submissions),
            objects: Arc::new(objects),
        }
    }

    /// Process-local stores, for tests and offline runs.
    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            config,
            submissions: Arc::new(MemorySubmissionStore::new()),
            objects: Arc::new(MemoryObjectStore::new()),
        }
    }
}
