//! Work item endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use upsrs_core::{Error as CoreError, ProcedureStepState};
use upsrs_dicom::{dataset_from_body, generate_uid, resolve_key, tags, Dataset};

use crate::error::ApiError;
use crate::push_url::RequestBase;
use crate::routes::dicom_json_response;
use crate::warnings;
use crate::AppState;

/// Work item routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workitems", post(create_workitem).get(search_workitems))
        .route("/workitems/:uid", get(retrieve_workitem).put(update_workitem))
        .route("/workitems/:uid/state", put(change_state))
        .route("/workitems/:uid/cancelrequest", post(request_cancel))
}

/// Create a work item. Generates a UID when the payload carries none.
async fn create_workitem(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let base = RequestBase::from_headers(&headers);
    let mut dataset =
        dataset_from_body(&body).map_err(|err| ApiError::bad_request(err.to_string()))?;
    if dataset.str_value(tags::SOP_INSTANCE_UID).is_none() {
        dataset.set_uid(tags::SOP_INSTANCE_UID, generate_uid());
    }

    let created = state
        .workitems
        .create(dataset)
        .map_err(|err| ApiError::from_core(err, &base))?;

    let mut reply = Dataset::new();
    reply.set_uid(tags::SOP_INSTANCE_UID, created.uid.as_str());
    dicom_json_response(StatusCode::CREATED, &reply)
}

/// Search work items.
///
/// `workitem=<uid>` short-circuits to a single lookup; any other
/// parameter except the paging/projection controls is a matching key
/// (keyword or hex tag).
async fn search_workitems(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let mut query = Dataset::new();
    let mut include_fields: Vec<String> = Vec::new();
    let mut offset = 0usize;
    let mut limit: Option<usize> = None;
    let mut single: Option<String> = None;

    for (key, value) in &params {
        match key.as_str() {
            "workitem" => single = Some(value.clone()),
            "includefield" => include_fields.extend(
                value
                    .split(',')
                    .map(|field| field.trim().to_string())
                    .filter(|field| !field.is_empty()),
            ),
            "offset" => {
                offset = value
                    .parse()
                    .map_err(|_| ApiError::bad_request(format!("invalid offset {value:?}")))?;
            }
            "limit" => {
                limit = Some(
                    value
                        .parse()
                        .map_err(|_| ApiError::bad_request(format!("invalid limit {value:?}")))?,
                );
            }
            // Accepted for interface compatibility; matching is exact.
            "fuzzymatching" => {}
            key => {
                let (tag, vr) =
                    resolve_key(key).map_err(|err| ApiError::bad_request(err.to_string()))?;
                query.set_str(tag, vr, value.as_str());
            }
        }
    }
    if include_fields.is_empty() {
        include_fields.push("all".to_string());
    }

    let results: Vec<Dataset> = match single {
        Some(uid) => state
            .workitems
            .get(&uid)
            .into_iter()
            .map(|mut item| {
                item.dataset.retain_fields(&include_fields);
                item.dataset
            })
            .collect(),
        None => state
            .workitems
            .store()
            .list_filtered(&query, &include_fields, offset, limit)
            .into_iter()
            .map(|item| item.dataset)
            .collect(),
    };

    if results.is_empty() {
        return Err(ApiError::not_found("no matching workitems"));
    }
    dicom_json_response(StatusCode::OK, &results)
}

/// Retrieve one work item, as a one-element array.
async fn retrieve_workitem(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Response, ApiError> {
    match state.workitems.get(&uid) {
        Some(item) => dicom_json_response(StatusCode::OK, &vec![item.dataset]),
        None => Err(ApiError::not_found(format!("workitem {uid}"))),
    }
}

#[derive(Debug, Deserialize)]
struct UpdateParams {
    #[serde(rename = "transaction-uid")]
    transaction_uid: Option<String>,
}

/// Merge-update a work item. A state tag in the payload is stripped and
/// reported through a `Warning` header.
async fn update_workitem(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(params): Query<UpdateParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let base = RequestBase::from_headers(&headers);
    let partial = dataset_from_body(&body).map_err(|err| ApiError::bad_request(err.to_string()))?;

    let outcome = state
        .workitems
        .update(&uid, partial, params.transaction_uid.as_deref())
        .map_err(|err| ApiError::from_core(err, &base))?;

    let mut response = dicom_json_response(StatusCode::OK, &outcome.workitem.dataset)?;
    if outcome.state_tag_stripped {
        append_warning(&mut response, &base, warnings::UPDATED_WITH_MODIFICATIONS);
    }
    Ok(response)
}

/// Drive a state transition. The body carries the requested state and
/// the transaction UID.
async fn change_state(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let base = RequestBase::from_headers(&headers);
    let payload = dataset_from_body(&body).map_err(|err| ApiError::bad_request(err.to_string()))?;

    let requested = payload
        .str_value(tags::PROCEDURE_STEP_STATE)
        .ok_or_else(|| ApiError::bad_request("missing ProcedureStepState"))?;
    let new_state = ProcedureStepState::parse(requested)
        .map_err(|err| ApiError::from_core(err, &base))?;
    let transaction_uid = payload.str_value(tags::TRANSACTION_UID);

    let updated = state
        .workitems
        .change_state(&uid, new_state, transaction_uid)
        .map_err(|err| {
            // A SCHEDULED item cannot be completed or canceled through
            // this endpoint: nobody has claimed it yet.
            let unclaimed = matches!(
                err,
                CoreError::InvalidTransition { from: ProcedureStepState::Scheduled, .. }
            );
            let api = ApiError::from_core(err, &base);
            if unclaimed {
                api.with_warning(&base, warnings::NOT_CLAIMED)
            } else {
                api
            }
        })?;

    dicom_json_response(StatusCode::OK, &updated.dataset)
}

/// Request cancellation of a work item.
async fn request_cancel(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let base = RequestBase::from_headers(&headers);
    let partial = if body.is_empty() {
        Dataset::new()
    } else {
        dataset_from_body(&body).map_err(|err| ApiError::bad_request(err.to_string()))?
    };

    state
        .workitems
        .cancel(&uid, &partial)
        .map_err(|err| ApiError::from_core(err, &base))?;

    dicom_json_response(StatusCode::ACCEPTED, &Dataset::new())
}

/// Append one `Warning` header to a response.
pub(crate) fn append_warning(response: &mut Response, base: &RequestBase, text: &str) {
    let value = warnings::warning_value(&base.service_uri(), text);
    if let Ok(value) = HeaderValue::from_str(&value) {
        response
            .headers_mut()
            .append(HeaderName::from_static("warning"), value);
    }
}
