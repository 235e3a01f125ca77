use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    routing::{patch, post},
    Json, Router,
};
use reqflow_core::domain::query::PageMeta;
use reqflow_core::domain::requisition::{
    Requisition, RequisitionId, RequisitionStatus, SubmissionInput,
};
use reqflow_core::domain::user::Actor;
use reqflow_core::errors::{ApplicationError, DomainError, InterfaceError};
use reqflow_core::workflow::View;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::service::RequisitionService;

#[derive(Clone)]
pub struct ApiState {
    service: RequisitionService,
    identity_header: String,
}

pub fn router(service: RequisitionService, identity_header: impl Into<String>) -> Router {
    Router::new()
        .route("/requisitions", post(submit_requisition).get(list_requisitions))
        .route("/requisitions/{id}", patch(transition_requisition))
        .with_state(ApiState { service, identity_header: identity_header.into() })
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

// Numbers may arrive as JSON numbers or numeric strings from form posts.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub item_name: Option<String>,
    pub quantity: Option<Value>,
    pub unit_cost: Option<Value>,
    pub reason: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub status: RequisitionStatus,
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListParams {
    pub view: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<RequisitionDto>,
    pub meta: PageMetaDto,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetaDto {
    pub current_page: u32,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub status: Option<String>,
    pub rejection_reason: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TransitionResponse {
    pub message: String,
    pub requisition: RequisitionDto,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionDto {
    pub id: String,
    pub item_name: String,
    pub quantity: u32,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    pub requester_name: String,
    pub requester_email: String,
    pub department: Option<String>,
    pub status: RequisitionStatus,
    pub created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_approved_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_approved_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_approved_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_approved_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_date: Option<String>,
}

impl From<&Requisition> for RequisitionDto {
    fn from(value: &Requisition) -> Self {
        let supervisor = value.supervisor_approval.as_ref();
        let owner = value.owner_approval.as_ref();
        let rejection = value.rejection.as_ref();
        let cancellation = value.cancellation.as_ref();
        Self {
            id: value.id.0.clone(),
            item_name: value.item_name.clone(),
            quantity: value.quantity,
            unit_cost: value.unit_cost.to_f64().unwrap_or_default(),
            total_cost: value
                .total_cost()
                .and_then(|total| total.round_dp(2).to_f64())
                .unwrap_or_default(),
            reason: value.reason.clone(),
            employee_id: value.employee_id.clone(),
            requester_name: value.requester_name.clone(),
            requester_email: value.requester_email.clone(),
            department: value.department.clone(),
            status: value.status,
            created: value.created_at.to_rfc3339(),
            supervisor_approved_by: supervisor.map(|s| s.name.clone()),
            supervisor_approved_email: supervisor.map(|s| s.email.clone()),
            supervisor_approved_date: supervisor.map(|s| s.at.to_rfc3339()),
            owner_approved_by: owner.map(|s| s.name.clone()),
            owner_approved_email: owner.map(|s| s.email.clone()),
            owner_approved_date: owner.map(|s| s.at.to_rfc3339()),
            rejection_reason: rejection.map(|r| r.reason.clone()),
            rejected_by: rejection.map(|r| r.name.clone()),
            rejected_email: rejection.map(|r| r.email.clone()),
            rejected_date: rejection.map(|r| r.at.to_rfc3339()),
            canceled_by: cancellation.map(|c| c.name.clone()),
            canceled_date: cancellation.map(|c| c.at.to_rfc3339()),
        }
    }
}

impl From<&PageMeta> for PageMetaDto {
    fn from(value: &PageMeta) -> Self {
        Self {
            current_page: value.current_page,
            limit: value.limit,
            has_next_page: value.has_next_page,
            has_prev_page: value.has_prev_page,
        }
    }
}

async fn submit_requisition(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let correlation_id = Uuid::new_v4().to_string();
    let actor = authenticate(&state, &headers, &correlation_id).await?;
    let Json(body) = body.map_err(|rejection| bad_body(rejection.body_text(), &correlation_id))?;

    let input = submission_input(body).map_err(|error| reject(error, &correlation_id))?;
    let created = state
        .service
        .submit(&actor, &input, &correlation_id)
        .await
        .map_err(|error| reject(error, &correlation_id))?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id: created.id.0,
            status: created.status,
            message: "Requisition submitted successfully.".to_string(),
        }),
    ))
}

async fn list_requisitions(
    State(state): State<ApiState>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<ListResponse>> {
    let correlation_id = Uuid::new_v4().to_string();
    let actor = authenticate(&state, &headers, &correlation_id).await?;
    let Query(params) =
        params.map_err(|rejection| bad_body(rejection.body_text(), &correlation_id))?;

    let view = View::parse(params.view.as_deref())
        .map_err(|error| reject(error.into(), &correlation_id))?;
    let page = state
        .service
        .list(&actor, view, params.page, params.limit, &correlation_id)
        .await
        .map_err(|error| reject(error, &correlation_id))?;

    Ok(Json(ListResponse {
        data: page.items.iter().map(RequisitionDto::from).collect(),
        meta: PageMetaDto::from(&page.meta),
    }))
}

async fn transition_requisition(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<TransitionRequest>, JsonRejection>,
) -> ApiResult<Json<TransitionResponse>> {
    let correlation_id = Uuid::new_v4().to_string();
    let actor = authenticate(&state, &headers, &correlation_id).await?;
    let Json(body) = body.map_err(|rejection| bad_body(rejection.body_text(), &correlation_id))?;

    let requested = match body.status.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
        None => {
            return Err(reject(validation("status is required".to_string()), &correlation_id))
        }
        Some(raw) => RequisitionStatus::parse(raw).ok_or_else(|| {
            reject(validation(format!("unknown status `{raw}`")), &correlation_id)
        })?,
    };

    let updated = state
        .service
        .transition(
            &actor,
            &RequisitionId(id),
            requested,
            body.rejection_reason.as_deref(),
            &correlation_id,
        )
        .await
        .map_err(|error| reject(error, &correlation_id))?;

    Ok(Json(TransitionResponse {
        message: format!("Requisition status updated to {}.", updated.status),
        requisition: RequisitionDto::from(&updated),
    }))
}

async fn authenticate(
    state: &ApiState,
    headers: &HeaderMap,
    correlation_id: &str,
) -> ApiResult<Actor> {
    let email = headers
        .get(state.identity_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let Some(email) = email else {
        return Err(respond(InterfaceError::Unauthorized {
            message: "authentication is required".to_string(),
            correlation_id: correlation_id.to_string(),
        }));
    };

    match state.service.resolve_actor(email, correlation_id).await {
        Ok(Some(actor)) => Ok(actor),
        Ok(None) => {
            warn!(
                event_name = "auth.unknown_user",
                correlation_id,
                actor = %email,
                "identity header names no known user"
            );
            Err(respond(InterfaceError::Unauthorized {
                message: "unknown user".to_string(),
                correlation_id: correlation_id.to_string(),
            }))
        }
        Err(error) => Err(reject(error, correlation_id)),
    }
}

fn submission_input(body: SubmitRequest) -> Result<SubmissionInput, ApplicationError> {
    let quantity = match body.quantity {
        None | Some(Value::Null) => None,
        Some(value) => Some(integer(&value).ok_or_else(|| {
            validation(format!("quantity must be a whole number, got {value}"))
        })?),
    };
    let unit_cost = match body.unit_cost {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            decimal(&value)
                .ok_or_else(|| validation(format!("unitCost must be a number, got {value}")))?,
        ),
    };

    Ok(SubmissionInput {
        item_name: body.item_name,
        quantity,
        unit_cost,
        reason: body.reason,
        employee_id: body.employee_id,
    })
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number.as_f64().filter(|float| float.fract() == 0.0).map(|float| float as i64)
        }),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(number) => number.to_string(),
        Value::String(raw) => raw.trim().to_string(),
        _ => return None,
    };
    raw.parse::<Decimal>().ok().or_else(|| Decimal::from_scientific(&raw).ok())
}

fn validation(message: String) -> ApplicationError {
    ApplicationError::Domain(DomainError::Validation(message))
}

fn bad_body(message: String, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    respond(InterfaceError::BadRequest { message, correlation_id: correlation_id.to_string() })
}

fn reject(error: ApplicationError, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    respond(error.into_interface(correlation_id))
}

fn respond(error: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(
            event_name = "api.request.failed",
            correlation_id = %error.correlation_id(),
            status = status.as_u16(),
            error = %error,
            "request failed"
        );
    } else {
        info!(
            event_name = "api.request.rejected",
            correlation_id = %error.correlation_id(),
            status = status.as_u16(),
            error = %error,
            "request rejected"
        );
    }
    (
        status,
        Json(ApiError {
            error: error.public_message(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}
