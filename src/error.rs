// Service error taxonomy and its HTTP mapping
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The upstream service was unreachable, timed out, or answered non-2xx.
    #[error("upstream request failed: {message}")]
    Upstream { status: Option<u16>, message: String },

    /// Every requested series came back empty after filtering. Distinct from
    /// upstream unavailability.
    #[error("no valid data for the requested series")]
    NoValidData,

    /// A supplied timestamp did not parse. Recovered internally by the
    /// default-window fallback; clients never see this.
    #[error("invalid time range: {0}")]
    InvalidRange(String),

    /// A fetched value failed its plausibility check. Drops the offending
    /// series from the batch, fatal only when nothing else succeeded.
    #[error("validation failed for {series}: {reason}")]
    Validation { series: String, reason: String },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream { status: None, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Upstream { .. } => {
                tracing::error!(error = %self, "upstream failure");
                (StatusCode::BAD_GATEWAY, "upstream sensor service unavailable")
            }
            ApiError::NoValidData => (StatusCode::NOT_FOUND, "no data for the requested period"),
            ApiError::InvalidRange(_) | ApiError::Validation { .. } => {
                (StatusCode::BAD_REQUEST, "invalid request")
            }
            // never leak internal details to the caller
            ApiError::Internal(_) => {
                tracing::error!(error = %self, "unhandled internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_maps_to_bad_gateway() {
        let response = ApiError::upstream("connection refused").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn no_data_is_distinct_from_unavailability() {
        let response = ApiError::NoValidData.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
