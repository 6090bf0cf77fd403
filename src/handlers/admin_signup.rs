// src/handlers/admin_signup.rs

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AdminSession, i18n::Locale},
    models::{
        action::ActionResponse,
        signup::{SignupForm, SignupRequest, SignupSummary},
    },
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectSignupPayload {
    #[serde(alias = "motivo")]
    #[schema(example = "A foto do documento está ilegível, envie novamente.")]
    pub reason: String,
}

// GET /api/admin/signup-requests
#[utoipa::path(
    get,
    path = "/api/admin/signup-requests",
    tag = "Admin Signup",
    responses(
        (status = 200, description = "Solicitações mais recentes", body = Vec<SignupSummary>),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_signups(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
) -> Result<Json<Vec<SignupSummary>>, ApiError> {
    let list = app_state
        .signup_service
        .list_recent()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(list))
}

// PATCH /api/admin/signup-requests/{id}
#[utoipa::path(
    patch,
    path = "/api/admin/signup-requests/{id}",
    tag = "Admin Signup",
    request_body = SignupForm,
    responses(
        (status = 200, description = "Solicitação corrigida", body = SignupRequest),
        (status = 409, description = "Solicitação finalizada")
    ),
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    security(("api_jwt" = []))
)]
pub async fn update_signup(
    State(app_state): State<AppState>,
    locale: Locale,
    AdminSession(admin): AdminSession,
    Path(id): Path<Uuid>,
    Json(form): Json<SignupForm>,
) -> Result<Json<SignupRequest>, ApiError> {
    tracing::debug!("Correção da solicitação {} por {}", id, admin);

    let request = app_state
        .signup_service
        .admin_update(id, &form)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(request))
}

// POST /api/admin/signup-requests/{id}/approve
#[utoipa::path(
    post,
    path = "/api/admin/signup-requests/{id}/approve",
    tag = "Admin Signup",
    responses(
        (status = 200, description = "Aprovada; contrato gerado", body = ActionResponse),
        (status = 409, description = "Status ou documentos não permitem aprovação")
    ),
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    security(("api_jwt" = []))
)]
pub async fn approve_signup(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, ApiError> {
    let response = app_state
        .signup_service
        .approve(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

// POST /api/admin/signup-requests/{id}/reject
#[utoipa::path(
    post,
    path = "/api/admin/signup-requests/{id}/reject",
    tag = "Admin Signup",
    request_body = RejectSignupPayload,
    responses(
        (status = 200, description = "Devolvida para correção", body = ActionResponse),
        (status = 400, description = "Motivo fora do tamanho permitido"),
        (status = 409, description = "Status não permite devolução")
    ),
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    security(("api_jwt" = []))
)]
pub async fn reject_signup(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectSignupPayload>,
) -> Result<Json<ActionResponse>, ApiError> {
    let response = app_state
        .signup_service
        .reject(id, &payload.reason)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}
