//! Subscription endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use upsrs_core::{Subscription, FILTERED_SUBSCRIPTION_UID, GLOBAL_SUBSCRIPTION_UID};
use upsrs_dicom::{resolve_key, tags, Dataset, Vr};

use crate::error::ApiError;
use crate::push_url::RequestBase;
use crate::routes::dicom_json_response;
use crate::AppState;

/// Subscription routes.
///
/// The first path segment reuses the `:uid` parameter name so these
/// routes can merge with the work item routes in one router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workitems/:uid/subscribers", get(list_subscribers))
        .route(
            "/workitems/:uid/subscribers/:aet",
            post(subscribe).delete(unsubscribe),
        )
        .route("/workitems/:uid/subscribers/:aet/suspend", post(suspend))
}

#[derive(Debug, Deserialize)]
struct SubscribeParams {
    deletionlock: Option<String>,
    filter: Option<String>,
}

/// Subscribe an AE to a concrete work item, to everything, or to a
/// filtered view. Responds with the push-channel URL in
/// `Content-Location`.
async fn subscribe(
    State(state): State<AppState>,
    Path((target, aet)): Path<(String, String)>,
    Query(params): Query<SubscribeParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let base = RequestBase::from_headers(&headers);
    let deletion_lock = params
        .deletionlock
        .as_deref()
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let mut subscription =
        Subscription::new(target.clone(), aet.clone()).with_deletion_lock(deletion_lock);

    match target.as_str() {
        GLOBAL_SUBSCRIPTION_UID => {}
        FILTERED_SUBSCRIPTION_UID => {
            let raw = params.filter.as_deref().ok_or_else(|| {
                ApiError::bad_request("a filtered subscription requires a filter parameter")
            })?;
            subscription = subscription.with_filter(parse_filter(raw)?);
        }
        uid => {
            if !state.workitems.store().contains(uid) {
                return Err(ApiError::not_found(format!("workitem {uid}")));
            }
        }
    }

    state.subscriptions.create(subscription);

    let push_url = base.websocket_url(&aet);
    let mut response = dicom_json_response(StatusCode::CREATED, &Dataset::new())?;
    response.headers_mut().insert(
        header::CONTENT_LOCATION,
        HeaderValue::from_str(&push_url)
            .map_err(|_| ApiError::internal(format!("invalid push URL {push_url:?}")))?,
    );
    Ok(response)
}

/// Remove a subscription.
async fn unsubscribe(
    State(state): State<AppState>,
    Path((target, aet)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    if state.subscriptions.delete(&target, &aet) {
        dicom_json_response(StatusCode::OK, &Dataset::new())
    } else {
        Err(ApiError::not_found(format!("subscription {target}/{aet}")))
    }
}

/// Suspend a global or filtered subscription.
async fn suspend(
    State(state): State<AppState>,
    Path((target, aet)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    if target != GLOBAL_SUBSCRIPTION_UID && target != FILTERED_SUBSCRIPTION_UID {
        return Err(ApiError::bad_request(
            "only global or filtered subscriptions can be suspended",
        ));
    }
    if state.subscriptions.suspend(&target, &aet) {
        dicom_json_response(StatusCode::OK, &Dataset::new())
    } else {
        Err(ApiError::not_found(format!("subscription {target}/{aet}")))
    }
}

/// List the subscriptions registered on a target. Always 200; an empty
/// target yields an empty array.
async fn list_subscribers(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<Response, ApiError> {
    let records: Vec<Dataset> = state
        .subscriptions
        .store()
        .get_by_workitem(&target)
        .into_iter()
        .map(|subscription| subscription_record(&subscription))
        .collect();
    dicom_json_response(StatusCode::OK, &records)
}

/// The wire record for one subscription row.
fn subscription_record(subscription: &Subscription) -> Dataset {
    let mut record = Dataset::new();
    record.set_uid(tags::SOP_INSTANCE_UID, subscription.workitem_uid.as_str());
    record.set_str(tags::RECEIVING_AE, Vr::AE, subscription.ae_title.as_str());
    if let Some(contact_uri) = &subscription.contact_uri {
        record.set_str(tags::CONTACT_URI, Vr::UR, contact_uri.as_str());
    }
    record
}

/// Parse a `key=value,key=value` filter parameter into a query dataset.
fn parse_filter(raw: &str) -> Result<Dataset, ApiError> {
    let mut filter = Dataset::new();
    for pair in raw.split(',').filter(|pair| !pair.trim().is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| ApiError::bad_request(format!("malformed filter pair {pair:?}")))?;
        let (tag, vr) =
            resolve_key(key.trim()).map_err(|err| ApiError::bad_request(err.to_string()))?;
        filter.set_str(tag, vr, value.trim());
    }
    if filter.is_empty() {
        return Err(ApiError::bad_request("empty filter parameter"));
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use upsrs_dicom::tags;

    #[test]
    fn test_parse_filter_by_keyword_and_tag() {
        let filter = parse_filter("ProcedureStepState=SCHEDULED,00100020=PAT001").unwrap();
        assert_eq!(filter.str_value(tags::PROCEDURE_STEP_STATE), Some("SCHEDULED"));
        assert_eq!(filter.str_value(tags::PATIENT_ID), Some("PAT001"));
    }

    #[test]
    fn test_parse_filter_rejects_garbage() {
        assert!(parse_filter("").is_err());
        assert!(parse_filter("NoSuchKeyword=1").is_err());
        assert!(parse_filter("justakey").is_err());
    }
}
