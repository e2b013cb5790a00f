use thiserror::Error;

use crate::validation::ValidationError;

/// Errors surfaced by every call against the support backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure: no connectivity, DNS, TLS, timeout
    #[error("Network error: {0}")]
    Network(String),

    /// 401/403 from the backend; the stored token is no longer usable
    #[error("Authentication required: {0}")]
    Auth(String),

    /// Rejected locally before any request was issued
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Non-2xx answer carrying the backend's `detail` message when present
    #[error("Server error {status}: {detail}")]
    Server { status: u16, detail: String },

    /// 2xx answer whose body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// Short text suitable for an inline status line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Cannot reach the support server. Check your connection.".to_string(),
            ApiError::Auth(_) => "Your session has expired. Please log in again.".to_string(),
            ApiError::Validation(e) => e.to_string(),
            ApiError::Server { detail, .. } => detail.clone(),
            ApiError::Decode(_) => "The server sent an unexpected response.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Server { status: status.as_u16(), detail: e.to_string() }
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_hide_transport_details() {
        let err = ApiError::Network("dns error: failed to lookup address".to_string());
        assert!(!err.user_message().contains("dns"));

        let err = ApiError::Server { status: 400, detail: "File too large. Maximum size is 50MB.".to_string() };
        assert_eq!(err.user_message(), "File too large. Maximum size is 50MB.");
        assert_eq!(err.to_string(), "Server error 400: File too large. Maximum size is 50MB.");
    }

    #[test]
    fn test_validation_errors_convert() {
        let err: ApiError = ValidationError::NotPdf("notes.txt".to_string()).into();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(!err.is_auth());
        assert!(ApiError::Auth("expired".to_string()).is_auth());
    }
}
