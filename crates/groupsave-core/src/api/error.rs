use serde_json::Value;
use thiserror::Error;

/// Shown when the server rejects the credential.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Shown when a successful response does not have the expected shape.
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from server";

const FALLBACK_MESSAGE: &str = "Something went wrong";
const NETWORK_MESSAGE: &str = "Unable to reach the server. Check your connection.";
const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

/// Uniform fault for every API call.
///
/// Display is the human-readable message; `status_code()` is `None` for
/// transport and validation faults.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{message}")]
    ServerError { status: u16, message: String },

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the server-supplied message out of an error body, if any.
    fn backend_message(body: &str) -> Option<String> {
        let value: Value = serde_json::from_str(body).ok()?;
        ["message", "msg", "error"]
            .iter()
            .filter_map(|field| value.get(field).and_then(Value::as_str))
            .map(str::trim)
            .find(|message| !message.is_empty())
            .map(str::to_string)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let backend = Self::backend_message(body);
        let status = status.as_u16();
        match status {
            401 => ApiError::Unauthorized(
                backend.unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_string()),
            ),
            403 => ApiError::AccessDenied(backend.unwrap_or_else(|| FALLBACK_MESSAGE.to_string())),
            404 => ApiError::NotFound(backend.unwrap_or_else(|| FALLBACK_MESSAGE.to_string())),
            429 => ApiError::RateLimited(
                backend.unwrap_or_else(|| "Server is busy. Please wait a moment and try again.".to_string()),
            ),
            500..=599 => ApiError::ServerError {
                status,
                message: backend.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            },
            _ => ApiError::Rejected {
                status,
                message: backend.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            },
        }
    }

    pub fn invalid_response() -> Self {
        ApiError::InvalidResponse(INVALID_RESPONSE_MESSAGE.to_string())
    }

    /// HTTP status of the failed response, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited(_) => Some(429),
            ApiError::ServerError { status, .. } | ApiError::Rejected { status, .. } => {
                Some(*status)
            }
            ApiError::Network { .. } | ApiError::InvalidResponse(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(message)
            | ApiError::AccessDenied(message)
            | ApiError::NotFound(message)
            | ApiError::RateLimited(message)
            | ApiError::InvalidResponse(message) => message,
            ApiError::ServerError { message, .. }
            | ApiError::Rejected { message, .. }
            | ApiError::Network { message, .. } => message,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(source: reqwest::Error) -> Self {
        let message = if source.is_timeout() {
            TIMEOUT_MESSAGE
        } else {
            NETWORK_MESSAGE
        };
        ApiError::Network {
            message: message.to_string(),
            source,
        }
    }
}
