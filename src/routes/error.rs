use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use tracing::error;

use crate::error::{MonitorError, StoreError};

// ---

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

/// Maps [`MonitorError`] onto an HTTP status and a JSON error body.
#[derive(Debug)]
pub struct ApiError(pub MonitorError);

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        ApiError(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err.into())
    }
}

impl ApiError {
    // ---
    pub fn status(&self) -> StatusCode {
        // ---
        match &self.0 {
            MonitorError::NoData { .. } => StatusCode::NOT_FOUND,
            MonitorError::Store(StoreError::UnknownCity { .. }) => StatusCode::NOT_FOUND,
            MonitorError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            MonitorError::Persistence { .. }
            | MonitorError::Training { .. }
            | MonitorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorResponse {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_status_mapping() {
        // ---
        let cases = [
            (
                MonitorError::NoData {
                    city: "Pune".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                MonitorError::InsufficientData {
                    city: "Pune".into(),
                    rows: 2,
                    required: 10,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                StoreError::UnknownCity {
                    city: "Atlantis".into(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                MonitorError::Persistence {
                    city: "Pune".into(),
                    reason: "disk full".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                StoreError::Backend {
                    message: "timeout".into(),
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
