use lambda_http::http::StatusCode;

/// Every failure the portal reports to a caller.
///
/// The HTTP layer only ever sees one of these, so the category string
/// returned by [`CoreError::category`] is what the UI switches on.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream fetch failed: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CoreError::Storage(_) | CoreError::Encoding(_) | CoreError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Unauthorized(_) => "unauthorized",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::Conflict(_) => "conflict",
            CoreError::Upstream(_)
            | CoreError::Storage(_)
            | CoreError::Encoding(_)
            | CoreError::Internal(_) => "server_error",
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Validation(format!("Invalid request body: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_distinguishable() {
        let errors = [
            CoreError::Validation("x".into()),
            CoreError::not_found("Submission", "abc"),
            CoreError::Forbidden("x".into()),
            CoreError::Storage("x".into()),
        ];
        let categories: Vec<&str> = errors.iter().map(|e| e.category()).collect();
        assert_eq!(categories, ["validation", "not_found", "forbidden", "server_error"]);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = CoreError::not_found("Submission", "abc");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Submission not found: abc");
    }
}
