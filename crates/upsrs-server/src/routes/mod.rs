//! Route handlers.

pub mod subscriptions;
pub mod workitems;
pub mod ws;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::ApiError;

/// The DICOM JSON media type.
pub const DICOM_JSON: &str = "application/dicom+json";

/// Serialize a value as a DICOM+JSON response with the given status.
pub fn dicom_json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response, ApiError> {
    let body = serde_json::to_string(value)
        .map_err(|err| ApiError::internal(format!("response serialization failed: {err}")))?;
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(DICOM_JSON));
    Ok(response)
}
