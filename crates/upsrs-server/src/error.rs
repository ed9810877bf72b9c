//! HTTP error mapping.

use axum::{
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use upsrs_core::Error as CoreError;

use crate::push_url::RequestBase;
use crate::warnings;

/// An HTTP-facing error: a status code, a descriptive body, and zero or
/// more `Warning` headers from the fixed vocabulary.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    warning_values: Vec<String>,
}

/// Error response body.
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error flag.
    pub error: bool,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl ApiError {
    /// A 400 for malformed input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST",
            message: message.into(),
            warning_values: Vec::new(),
        }
    }

    /// A 404 for an absent target.
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.into(),
            warning_values: Vec::new(),
        }
    }

    /// A 500 with a generic message; the detail goes to the log only.
    pub fn internal(message: impl Into<String>) -> Self {
        let detail: String = message.into();
        tracing::error!(%detail, "internal error");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: "internal server error".to_string(),
            warning_values: Vec::new(),
        }
    }

    /// Map a domain error onto its status code and warning headers.
    pub fn from_core(err: CoreError, base: &RequestBase) -> Self {
        let service_uri = base.service_uri();
        let warn = |text: &str| warnings::warning_value(&service_uri, text);

        match err {
            CoreError::Duplicate(uid) => ApiError {
                status: StatusCode::CONFLICT,
                code: "DUPLICATE",
                message: format!("workitem {uid} already exists"),
                warning_values: Vec::new(),
            },
            CoreError::NotFound(what) => ApiError {
                status: StatusCode::NOT_FOUND,
                code: "NOT_FOUND",
                message: format!("{what} not found"),
                warning_values: Vec::new(),
            },
            CoreError::AlreadyInState { state } => ApiError {
                status: StatusCode::GONE,
                code: "ALREADY_IN_STATE",
                message: format!("workitem is already {state}"),
                warning_values: vec![warn(&warnings::already_in_state(state))],
            },
            CoreError::InvalidTransition { from, to } => ApiError {
                status: StatusCode::CONFLICT,
                code: "INVALID_TRANSITION",
                message: format!("cannot change state from {from} to {to}"),
                warning_values: vec![warn(warnings::INCONSISTENT_WITH_UPS_STATE)],
            },
            CoreError::StateConflict { state } => ApiError {
                status: StatusCode::CONFLICT,
                code: "STATE_CONFLICT",
                message: format!("request conflicts with workitem state {state}"),
                warning_values: vec![warn(warnings::INCONSISTENT_WITH_UPS_STATE)],
            },
            CoreError::TransactionUidMissing => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "TRANSACTION_UID_MISSING",
                message: "the transaction UID is missing".to_string(),
                warning_values: vec![
                    warn(warnings::INCONSISTENT_WITH_WORKITEM_STATE),
                    warn(warnings::TRANSACTION_UID_MISSING),
                ],
            },
            CoreError::TransactionUidMismatch => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "TRANSACTION_UID_INCORRECT",
                message: "the transaction UID is incorrect".to_string(),
                warning_values: vec![
                    warn(warnings::INCONSISTENT_WITH_WORKITEM_STATE),
                    warn(warnings::TRANSACTION_UID_INCORRECT),
                ],
            },
            CoreError::Validation(message) => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "VALIDATION",
                message,
                warning_values: Vec::new(),
            },
            CoreError::Dicom(err) => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "MALFORMED_PAYLOAD",
                message: err.to_string(),
                warning_values: Vec::new(),
            },
        }
    }

    /// Append another warning header.
    pub fn with_warning(mut self, base: &RequestBase, text: &str) -> Self {
        self.warning_values.push(warnings::warning_value(&base.service_uri(), text));
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: true,
            code: self.code.to_string(),
            message: self.message,
        };

        let mut response = (self.status, Json(body)).into_response();
        let name = HeaderName::from_static("warning");
        for value in self.warning_values {
            if let Ok(value) = HeaderValue::from_str(&value) {
                response.headers_mut().append(name.clone(), value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use upsrs_core::ProcedureStepState;

    fn base() -> RequestBase {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("pacs.example.com"));
        RequestBase::from_headers(&headers)
    }

    #[test]
    fn test_terminal_repeat_maps_to_gone_with_warning() {
        let err = ApiError::from_core(
            CoreError::AlreadyInState { state: ProcedureStepState::Completed },
            &base(),
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GONE);

        let warning = response.headers().get("warning").unwrap().to_str().unwrap();
        assert!(warning.starts_with("299 http://pacs.example.com:"));
        assert!(warning.ends_with("already in the requested state of COMPLETED"));
    }

    #[test]
    fn test_transaction_mismatch_carries_two_warnings() {
        let err = ApiError::from_core(CoreError::TransactionUidMismatch, &base());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let values: Vec<_> = response.headers().get_all("warning").iter().collect();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let err = ApiError::from_core(CoreError::Duplicate("1.2.3.4".to_string()), &base());
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
