use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Jenkins API error: {message}")]
    JenkinsApi {
        status: Option<u16>,
        message: String,
    },

    #[error("Timed out waiting for queue item {queue_id} to start; the build may still run")]
    QueueTimeout { queue_id: u64 },

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Correlation store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Notification delivery failed: {message}")]
    NotificationFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("Validation error on field '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::JenkinsApi { .. } => "JENKINS_API_ERROR",
            BridgeError::QueueTimeout { .. } => "QUEUE_TIMEOUT",
            BridgeError::InvalidSignature => "AUTHENTICATION_ERROR",
            BridgeError::NotFound(_) => "NOT_FOUND",
            BridgeError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            BridgeError::NotificationFailed { .. } => "NOTIFICATION_FAILED",
            BridgeError::Validation { .. } => "VALIDATION_ERROR",
            BridgeError::Config(_) => "CONFIGURATION_ERROR",
            BridgeError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::Validation { .. } => StatusCode::BAD_REQUEST,
            BridgeError::InvalidSignature => StatusCode::UNAUTHORIZED,
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            BridgeError::Validation { field, .. } => Some(json!({ "field": field })),
            BridgeError::JenkinsApi {
                status: Some(status),
                ..
            } => Some(json!({ "upstreamStatus": status })),
            BridgeError::NotificationFailed {
                status: Some(status),
                ..
            } => Some(json!({ "upstreamStatus": status })),
            BridgeError::QueueTimeout { queue_id } => Some(json!({ "queueId": queue_id })),
            _ => None,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(details) = self.details() {
            error["details"] = details;
        }

        let body = Json(json!({ "error": error }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(BridgeError::InvalidSignature.code(), "AUTHENTICATION_ERROR");
        assert_eq!(
            BridgeError::StoreUnavailable("down".to_string()).code(),
            "STORE_UNAVAILABLE"
        );
        assert_eq!(
            BridgeError::Validation {
                field: "phase".to_string(),
                reason: "unknown".to_string(),
            }
            .code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            BridgeError::Validation {
                field: "build.number".to_string(),
                reason: "must be >= 1".to_string(),
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BridgeError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            BridgeError::NotFound("job".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BridgeError::NotificationFailed {
                status: None,
                message: "connection refused".to_string(),
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_queue_timeout_carries_queue_id() {
        let err = BridgeError::QueueTimeout { queue_id: 123 };
        assert!(err.to_string().contains("123"));
        assert_eq!(err.details(), Some(json!({ "queueId": 123 })));
    }
}
