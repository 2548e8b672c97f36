use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Missing, inactive or rejected API credential.
    ApiKey(String),
    /// Upstream provider answered 429.
    RateLimited(String),
    /// Error interacting with an external API.
    ExternalApiError {
        message: String,
        /// Upstream HTTP status, when one was received.
        status: Option<u16>,
    },
    /// Credential storage could not be read or written.
    StorageError(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Shorthand for an upstream failure without a status code.
    pub fn external(message: impl Into<String>) -> Self {
        AppError::ExternalApiError {
            message: message.into(),
            status: None,
        }
    }

    /// Upstream HTTP status carried by this error, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::ExternalApiError { status, .. } => *status,
            AppError::RateLimited(_) => Some(429),
            AppError::WithContext { source, .. } => source.upstream_status(),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ApiKey(msg) => write!(f, "API key error: {}", msg),
            AppError::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            AppError::ExternalApiError { message, status } => match status {
                Some(code) => write!(f, "External API error ({}): {}", code, message),
                None => write!(f, "External API error: {}", message),
            },
            AppError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Provider messages are passed through so the caller can show them; storage
    /// and internal details are logged and replaced by a generic message.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ApiKey(msg) => {
                tracing::warn!("API key error: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            AppError::ExternalApiError { message, status } => {
                tracing::error!("External API error: {}", message);
                // Provider validation errors are the caller's to fix
                let code = match status {
                    Some(400) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (code, message.clone())
            }
            AppError::StorageError(msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Credential storage error".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return (*source.clone()).into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::external(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::StorageError(format!("serialization failed: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_and_displays() {
        let result: Result<(), AppError> = Err(AppError::NotFound("key_1".to_string()));
        let err = result.context("loading profile").unwrap_err();
        assert_eq!(err.to_string(), "loading profile: Not found: key_1");
    }

    #[test]
    fn test_status_mapping() {
        let resp = AppError::ApiKey("missing".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = AppError::RateLimited("slow down".into()).into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = AppError::ExternalApiError {
            message: "bad field".into(),
            status: Some(400),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::external("boom").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_with_context_delegates_status() {
        let err = AppError::WithContext {
            source: Box::new(AppError::BadRequest("nope".into())),
            context: "ctx".into(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_status() {
        assert_eq!(AppError::RateLimited("x".into()).upstream_status(), Some(429));
        assert_eq!(AppError::NotFound("x".into()).upstream_status(), None);
    }
}
