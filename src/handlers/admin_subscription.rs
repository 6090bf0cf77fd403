// src/handlers/admin_subscription.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::subscription::{optional_body, CancelPayload},
    middleware::{auth::AdminSession, i18n::Locale},
    models::{
        action::ActionResponse,
        history::Actor,
        subscription::{CreateSubscriptionPayload, SubscriptionSummary},
    },
    services::subscription_service::TransitionAction,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionPayload {
    pub action: TransitionAction,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FeeDuePayload {
    #[serde(default)]
    pub note: Option<String>,
}

// GET /api/admin/subscriptions
#[utoipa::path(
    get,
    path = "/api/admin/subscriptions",
    tag = "Admin Subscription",
    responses(
        (status = 200, description = "Propostas mais recentes", body = Vec<SubscriptionSummary>),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_subscriptions(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
) -> Result<Json<Vec<SubscriptionSummary>>, ApiError> {
    let list = app_state
        .subscription_service
        .list_recent()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(list))
}

// POST /api/admin/subscriptions
#[utoipa::path(
    post,
    path = "/api/admin/subscriptions",
    tag = "Admin Subscription",
    request_body = CreateSubscriptionPayload,
    responses(
        (status = 201, description = "Proposta criada já aprovada", body = ActionResponse),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Json(payload): Json<CreateSubscriptionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let response = app_state
        .subscription_service
        .create_pre_approved(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/admin/subscriptions/from-signup/{signup_id}
#[utoipa::path(
    post,
    path = "/api/admin/subscriptions/from-signup/{signup_id}",
    tag = "Admin Subscription",
    responses(
        (status = 201, description = "Proposta criada a partir da solicitação assinada", body = ActionResponse),
        (status = 409, description = "Solicitação não assinada ou já convertida")
    ),
    params(("signup_id" = Uuid, Path, description = "ID da solicitação assinada")),
    security(("api_jwt" = []))
)]
pub async fn create_from_signup(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(signup_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state
        .subscription_service
        .create_from_signup(signup_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /api/admin/subscriptions/{id}/transition
#[utoipa::path(
    post,
    path = "/api/admin/subscriptions/{id}/transition",
    tag = "Admin Subscription",
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Status alterado", body = ActionResponse),
        (status = 400, description = "Observação obrigatória ausente"),
        (status = 409, description = "Transição não permitida")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta")),
    security(("api_jwt" = []))
)]
pub async fn transition_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    AdminSession(admin): AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<Json<ActionResponse>, ApiError> {
    tracing::debug!("Transição {:?} da proposta {} por {}", payload.action, id, admin);

    let response = app_state
        .subscription_service
        .apply_action(id, payload.action, payload.note.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

// POST /api/admin/subscriptions/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/admin/subscriptions/{id}/cancel",
    tag = "Admin Subscription",
    request_body = CancelPayload,
    responses(
        (status = 200, description = "Cancelamento registrado", body = ActionResponse),
        (status = 409, description = "Status não permite cancelamento")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta")),
    security(("api_jwt" = []))
)]
pub async fn cancel_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ActionResponse>, ApiError> {
    let payload: CancelPayload = optional_body(&body).map_err(|e| e.to_api_error(&locale))?;

    let response = app_state
        .subscription_service
        .cancel(id, payload.reason.as_deref(), Actor::Admin)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

// POST /api/admin/subscriptions/{id}/mark-return-received
#[utoipa::path(
    post,
    path = "/api/admin/subscriptions/{id}/mark-return-received",
    tag = "Admin Subscription",
    responses(
        (status = 200, description = "Devolução confirmada", body = ActionResponse),
        (status = 409, description = "Sem devolução pendente")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta")),
    security(("api_jwt" = []))
)]
pub async fn mark_return_received(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, ApiError> {
    let response = app_state
        .subscription_service
        .confirm_return(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

// POST /api/admin/subscriptions/{id}/mark-fee-due
#[utoipa::path(
    post,
    path = "/api/admin/subscriptions/{id}/mark-fee-due",
    tag = "Admin Subscription",
    request_body = FeeDuePayload,
    responses(
        (status = 200, description = "Taxa de reposição lançada", body = ActionResponse),
        (status = 409, description = "Sem devolução pendente")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta")),
    security(("api_jwt" = []))
)]
pub async fn mark_fee_due(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ActionResponse>, ApiError> {
    let payload: FeeDuePayload = optional_body(&body).map_err(|e| e.to_api_error(&locale))?;

    let response = app_state
        .subscription_service
        .mark_fee_due(id, payload.note.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}
