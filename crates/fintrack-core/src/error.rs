use thiserror::Error;

const UNREACHABLE_MESSAGE: &str = "Unable to reach the server. Please check the API and try again.";
const SIGN_IN_MESSAGE: &str = "Please sign in to continue.";
const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

pub type ApiResult<T> = Result<T, ApiError>;

/// Failures reported by backends and entity stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("Credential rejected")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Server error (status {status})")]
    ServerError { status: u16 },
    #[error("Not found: {id}")]
    NotFound { id: String, message: Option<String> },
    #[error("Validation failed: {}", .message.as_deref().unwrap_or("rejected by backend"))]
    ValidationFailed {
        status: Option<u16>,
        message: Option<String>,
    },
    #[error("{0}")]
    Unknown(String),
}

impl ApiError {
    pub fn not_found(id: impl Into<String>) -> Self {
        ApiError::NotFound {
            id: id.into(),
            message: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationFailed {
            status: None,
            message: Some(message.into()),
        }
    }

    /// Human-readable text supplied by the backend itself, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { message, .. } | ApiError::ValidationFailed { message, .. } => {
                message.as_deref().filter(|text| !text.trim().is_empty())
            }
            _ => None,
        }
    }

    /// Converts the failure into the single message shown to the user.
    ///
    /// Priority: unreachable network, missing or rejected credential, forbidden,
    /// server error, backend-supplied message, then `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::NetworkUnreachable(_) => UNREACHABLE_MESSAGE.to_string(),
            ApiError::Unauthenticated | ApiError::Unauthorized => SIGN_IN_MESSAGE.to_string(),
            ApiError::Forbidden => FORBIDDEN_MESSAGE.to_string(),
            ApiError::ServerError { .. } => SERVER_ERROR_MESSAGE.to_string(),
            other => other
                .backend_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Unknown(format!("storage error: {err}"))
    }
}
