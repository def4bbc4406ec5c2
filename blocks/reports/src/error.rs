use dentcheck_atoms::CoreError;
use thiserror::Error;

/// Failures while building the report document itself. Image problems are
/// not errors here; a missing or unreadable image just leaves its slot empty.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to load report font: {0}")]
    Font(String),

    #[error("Failed to embed image: {0}")]
    Image(String),

    #[error("Failed to serialize PDF: {0}")]
    Serialize(String),
}

impl From<ReportError> for CoreError {
    fn from(err: ReportError) -> Self {
        CoreError::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_errors_surface_as_encoding_failures() {
        let err: CoreError = ReportError::Serialize("disk full".to_string()).into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("disk full"));
    }
}
