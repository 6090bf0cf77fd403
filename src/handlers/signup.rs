// src/handlers/signup.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{client_info::ClientInfo, i18n::Locale},
    models::{
        action::ActionResponse,
        signature::SignatureConsent,
        signup::{SignupAction, SignupDetail, SignupForm},
    },
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveSignupPayload {
    /// Ausente na primeira gravação.
    pub id: Option<Uuid>,

    #[serde(default)]
    #[schema(example = "submit")]
    pub action: SignupAction,

    #[serde(default)]
    pub accepted_lgpd: bool,

    #[serde(flatten)]
    pub form: SignupForm,
}

// POST /api/signup-requests
#[utoipa::path(
    post,
    path = "/api/signup-requests",
    tag = "Signup",
    request_body = SaveSignupPayload,
    responses(
        (status = 201, description = "Solicitação criada", body = ActionResponse),
        (status = 200, description = "Solicitação atualizada", body = ActionResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Solicitação não editável")
    )
)]
pub async fn save_signup(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SaveSignupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state
        .signup_service
        .save(payload.id, &payload.form, payload.action, payload.accepted_lgpd)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let status = if payload.id.is_none() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

// GET /api/signup-requests/{id}
#[utoipa::path(
    get,
    path = "/api/signup-requests/{id}",
    tag = "Signup",
    responses(
        (status = 200, description = "Solicitação e histórico recente", body = SignupDetail),
        (status = 404, description = "Solicitação não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da solicitação"))
)]
pub async fn get_signup(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<Json<SignupDetail>, ApiError> {
    let detail = app_state
        .signup_service
        .get_detail(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(detail))
}

// POST /api/signup-requests/{id}/sign
#[utoipa::path(
    post,
    path = "/api/signup-requests/{id}/sign",
    tag = "Signup",
    request_body = SignatureConsent,
    responses(
        (status = 200, description = "Contrato assinado", body = ActionResponse),
        (status = 400, description = "Termos não aceitos"),
        (status = 409, description = "Assinatura não permitida no status atual")
    ),
    params(("id" = Uuid, Path, description = "ID da solicitação"))
)]
pub async fn sign_signup(
    State(app_state): State<AppState>,
    locale: Locale,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    Json(consent): Json<SignatureConsent>,
) -> Result<Json<ActionResponse>, ApiError> {
    let response = app_state
        .signup_service
        .sign(id, &consent, &client)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}
