use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::time::Duration;

use crate::error::CoreError;

/// Attempts per fetch: the first try plus one retry.
const FETCH_ATTEMPTS: u32 = 2;

/// Byte-level access to the blob store holding photos and reports.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the bytes behind a location previously returned by `put`.
    async fn get(&self, location: &str) -> Result<Vec<u8>, CoreError>;

    /// Store `bytes` under `key` and return a directly fetchable URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, CoreError>;
}

/// S3 bucket addressed with virtual-hosted URLs.
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    region: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key)
    }

    /// Recover the object key from a URL this bucket handed out. Bare keys
    /// pass through unchanged.
    pub fn key_for(&self, location: &str) -> Result<String, CoreError> {
        let prefixes = [
            format!("https://{}.s3.{}.amazonaws.com/", self.bucket, self.region),
            format!("https://{}.s3.amazonaws.com/", self.bucket),
            format!("s3://{}/", self.bucket),
        ];
        for prefix in &prefixes {
            if let Some(key) = location.strip_prefix(prefix.as_str()) {
                return Ok(key.to_string());
            }
        }
        if location.contains("://") {
            return Err(CoreError::Upstream(format!(
                "Location is outside bucket {}: {}",
                self.bucket, location
            )));
        }
        Ok(location.trim_start_matches('/').to_string())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, location: &str) -> Result<Vec<u8>, CoreError> {
        let key = self.key_for(location)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("S3 get_object error for {}: {}", key, e)))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| CoreError::Upstream(format!("S3 body read error for {}: {}", key, e)))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, CoreError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| CoreError::Storage(format!("S3 put_object error for {}: {}", key, e)))?;

        tracing::info!("Stored s3://{}/{} ({} bytes, {})", self.bucket, key, size, content_type);
        Ok(self.url_for(key))
    }
}

/// Fetch with a bounded timeout per attempt and a single retry for
/// transient failures. Missing objects are not retried.
pub async fn fetch_with_retry(
    store: &dyn ObjectStore,
    location: &str,
    timeout: Duration,
) -> Result<Vec<u8>, CoreError> {
    let mut last_error = CoreError::Upstream(format!("No attempt made for {}", location));

    for attempt in 1..=FETCH_ATTEMPTS {
        match tokio::time::timeout(timeout, store.get(location)).await {
            Ok(Ok(bytes)) => return Ok(bytes),
            Ok(Err(e @ CoreError::NotFound { .. })) => return Err(e),
            Ok(Err(e)) => {
                tracing::warn!("Fetch attempt {} for {} failed: {}", attempt, location, e);
                last_error = e;
            }
            Err(_) => {
                tracing::warn!("Fetch attempt {} for {} timed out after {:?}", attempt, location, timeout);
                last_error = CoreError::Upstream(format!("Timed out fetching {}", location));
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` gets, then serves `payload`.
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
        payload: Vec<u8>,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn get(&self, _location: &str) -> Result<Vec<u8>, CoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(CoreError::Upstream("connection reset".to_string()))
            } else {
                Ok(self.payload.clone())
            }
        }

        async fn put(&self, _key: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String, CoreError> {
            Err(CoreError::Storage("read-only".to_string()))
        }
    }

    /// Never answers.
    struct StalledStore;

    #[async_trait]
    impl ObjectStore for StalledStore {
        async fn get(&self, _location: &str) -> Result<Vec<u8>, CoreError> {
            std::future::pending::<()>().await;
            unreachable!()
        }

        async fn put(&self, _key: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String, CoreError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn single_transient_failure_is_retried() {
        let store = FlakyStore { failures: 1, calls: AtomicU32::new(0), payload: vec![1, 2, 3] };
        let bytes = fetch_with_retry(&store, "images/a.png", Duration::from_secs(1)).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_second_failure() {
        let store = FlakyStore { failures: 5, calls: AtomicU32::new(0), payload: vec![] };
        let err = fetch_with_retry(&store, "images/a.png", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CoreError::Upstream(_)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stalled_fetch_times_out() {
        let err = fetch_with_retry(&StalledStore, "images/a.png", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }
}
