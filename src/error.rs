//! docbox-admin error types and message normalization.
//!
//! Every failure surfaced by the request layer is an [`AdminError`]. Read and
//! write bindings never interpret the error further: they record it and expose
//! [`AdminError::message()`], the single human-readable string shown to users.

use std::sync::Arc;

use serde_json::Value;

/// Status codes that are never retried by a wrapping layer.
pub const RETRY_EXCLUDE_STATUS: [u16; 4] = [400, 401, 403, 404];

/// Shown when no response was received at all.
pub const UNREACHABLE_MESSAGE: &str = "Service unavailable, unreachable, or timed out";

/// Shown when an error carries nothing usable.
pub const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Body of a failed HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// The body parsed as JSON.
    Json(Value),
    /// The body was plain text.
    Text(String),
    /// No body was sent.
    Empty,
}

impl ErrorBody {
    /// Classify a raw response body.
    ///
    /// JSON objects and arrays stay structured, a JSON string is unwrapped to
    /// text, and anything that fails to parse is kept as plain text.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::Empty;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::String(text)) => Self::Text(text),
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    fn field(&self, name: &str) -> Option<String> {
        let Self::Json(Value::Object(map)) = self else {
            return None;
        };
        match map.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Null | Value::Bool(false) => None,
            Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Pick the most specific message the body offers.
    ///
    /// `message` wins over `reason`, which wins over a bare text body.
    pub fn message(&self) -> Option<String> {
        if let Some(message) = self.field("message") {
            return Some(message);
        }
        if let Some(reason) = self.field("reason") {
            return Some(reason);
        }
        match self {
            Self::Text(text) if !text.is_empty() => Some(text.clone()),
            _ => None,
        }
    }
}

/// Coarse classification of an [`AdminError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response was received.
    NetworkUnreachable,
    /// 4xx response.
    ClientError,
    /// 5xx response.
    ServerError,
    /// Anything else.
    Unclassified,
}

/// docbox-admin error types
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    // Transport errors
    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("client error ({status})")]
    Client { status: u16, body: ErrorBody },

    #[error("server error ({status})")]
    Server { status: u16, body: ErrorBody },

    /// A non-success status outside 4xx/5xx.
    #[error("unexpected status ({status})")]
    Unexpected { status: u16, body: ErrorBody },

    // Data errors
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{}", .0.as_deref().unwrap_or(FALLBACK_MESSAGE))]
    Unclassified(Option<String>),

    /// An error recorded on a cache entry, shared by its subscribers.
    #[error(transparent)]
    Cached(Arc<AdminError>),
}

impl AdminError {
    /// Build the error for a non-success response.
    pub fn from_status(status: u16, body: ErrorBody) -> Self {
        match status {
            400..=499 => Self::Client { status, body },
            500..=599 => Self::Server { status, body },
            _ => Self::Unexpected { status, body },
        }
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. }
            | Self::Server { status, .. }
            | Self::Unexpected { status, .. } => Some(*status),
            Self::Cached(inner) => inner.status(),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable(_) => ErrorKind::NetworkUnreachable,
            Self::Client { .. } => ErrorKind::ClientError,
            Self::Server { .. } => ErrorKind::ServerError,
            Self::Cached(inner) => inner.kind(),
            _ => ErrorKind::Unclassified,
        }
    }

    /// Whether a wrapping layer may retry the failed call.
    ///
    /// Statuses in [`RETRY_EXCLUDE_STATUS`] surface immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Server { .. } => true,
            Self::Client { status, .. } => !RETRY_EXCLUDE_STATUS.contains(status),
            Self::Cached(inner) => inner.is_retryable(),
            _ => false,
        }
    }

    /// The single human-readable message for this error.
    ///
    /// Priority: body `message`, body `reason`, plain-text body, transport
    /// text. Unreachable services and empty errors map to fixed messages.
    pub fn message(&self) -> String {
        let message = match self {
            Self::Unreachable(_) => return UNREACHABLE_MESSAGE.to_string(),
            Self::Cached(inner) => return inner.message(),
            Self::Client { status, body }
            | Self::Server { status, body }
            | Self::Unexpected { status, body } => body
                .message()
                .unwrap_or_else(|| format!("Request failed with status code {status}")),
            Self::Unclassified(None) => return FALLBACK_MESSAGE.to_string(),
            Self::Unclassified(Some(text)) => text.clone(),
            other => other.to_string(),
        };

        if message.is_empty() || message == "null" {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }
}

/// Normalize an optional error into a display message.
///
/// An absent error value yields [`FALLBACK_MESSAGE`].
pub fn error_message(error: Option<&AdminError>) -> String {
    error.map_or_else(|| FALLBACK_MESSAGE.to_string(), AdminError::message)
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AdminError::Decode(err.to_string())
        } else if err.is_builder() {
            AdminError::InvalidInput(err.to_string())
        } else {
            AdminError::Unreachable(err.to_string())
        }
    }
}

/// Result type alias for docbox-admin operations
pub type Result<T> = std::result::Result<T, AdminError>;
