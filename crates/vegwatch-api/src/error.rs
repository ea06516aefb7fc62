use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use vegwatch_core::{ValidationError, VegwatchError};

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<VegwatchError> for ApiError {
    fn from(err: VegwatchError) -> Self {
        match &err {
            _ if err.is_client_error() => Self::bad_request(err.to_string()),
            VegwatchError::BackendTimeout { .. } => {
                Self::gateway_timeout("Imagery backend timed out").with_details(err.to_string())
            }
            VegwatchError::Backend { operation, .. } => Self::internal("Analysis failed")
                .with_details(format!("Imagery backend error during {}", operation)),
            VegwatchError::BackendUnavailable { .. } => {
                Self::internal("Analysis failed").with_details("Imagery backend unavailable")
            }
            // The full cause is logged by the service layer, never returned
            _ => Self::internal("Analysis failed"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        VegwatchError::from(ValidationError::MalformedBody(rejection.body_text())).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_bad_requests() {
        let err = ApiError::from(VegwatchError::InsufficientData {
            period1: 3,
            period2: 0,
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Period 2: 0 images"));
        assert!(err.details.is_none());

        let err = ApiError::from(VegwatchError::from(ValidationError::TooFewPoints { found: 1 }));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = ApiError::from(VegwatchError::NoValidPixels);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_timeout_is_gateway_timeout() {
        let err = ApiError::from(VegwatchError::BackendTimeout {
            operation: "reduce_mean".to_string(),
            timeout_secs: 60,
        });
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
        assert!(err.details.unwrap().contains("reduce_mean"));
    }

    #[test]
    fn test_backend_failures_hide_the_cause() {
        let err = ApiError::from(VegwatchError::BackendUnavailable {
            reason: "cannot read token file /etc/vegwatch/ee-token: permission denied"
                .to_string(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Analysis failed");
        assert_eq!(err.details.as_deref(), Some("Imagery backend unavailable"));

        let err = ApiError::from(VegwatchError::backend(
            "reduce_mean",
            "Earth Engine API error (403 Forbidden): project my-secret-project denied",
        ));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        let details = err.details.unwrap();
        assert_eq!(details, "Imagery backend error during reduce_mean");
        assert!(!details.contains("my-secret-project"));

        let err = ApiError::from(VegwatchError::Serialization("bad json at byte 3".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.details.is_none());
    }
}
