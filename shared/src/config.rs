use std::time::Duration;

const DEFAULT_TABLE: &str = "dentcheck";
const DEFAULT_BUCKET: &str = "dentcheck-media";
const DEFAULT_REGION: &str = "ap-southeast-2";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CLINIC_NAME: &str = "OralVis Healthcare";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub table_name: String,
    pub bucket_name: String,
    pub region: String,
    /// Per-attempt timeout for image fetches.
    pub fetch_timeout: Duration,
    pub clinic_name: String,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let fetch_timeout = match get("FETCH_TIMEOUT_SECS").map(|raw| raw.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => secs,
            Some(_) => {
                tracing::warn!(
                    "Invalid FETCH_TIMEOUT_SECS, using {}s",
                    DEFAULT_FETCH_TIMEOUT_SECS
                );
                DEFAULT_FETCH_TIMEOUT_SECS
            }
            None => DEFAULT_FETCH_TIMEOUT_SECS,
        };

        Self {
            table_name: get("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            bucket_name: get("S3_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            fetch_timeout: Duration::from_secs(fetch_timeout),
            clinic_name: get("CLINIC_NAME").unwrap_or_else(|| DEFAULT_CLINIC_NAME.to_string()),
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
