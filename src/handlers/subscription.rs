// src/handlers/subscription.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{client_info::ClientInfo, i18n::Locale},
    models::{
        action::ActionResponse,
        history::Actor,
        signature::SignatureConsent,
        subscription::{StatusView, SubscriptionDetail},
    },
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelPayload {
    #[serde(default, alias = "motivo")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackingCodePayload {
    #[serde(alias = "codigo")]
    #[schema(example = "BR123456789BR")]
    pub code: String,
}

/// Corpo JSON opcional: vazio (com ou sem Content-Type) vira o `Default`.
pub(crate) fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::validation("body", format!("JSON inválido: {}", e)))
}

// GET /api/subscriptions/{id}
#[utoipa::path(
    get,
    path = "/api/subscriptions/{id}",
    tag = "Subscription",
    responses(
        (status = 200, description = "Proposta e histórico", body = SubscriptionDetail),
        (status = 404, description = "Proposta não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta"))
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<Json<SubscriptionDetail>, ApiError> {
    let detail = app_state
        .subscription_service
        .get_detail(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(detail))
}

// GET /api/subscriptions/{id}/status
#[utoipa::path(
    get,
    path = "/api/subscriptions/{id}/status",
    tag = "Subscription",
    responses(
        (status = 200, description = "Status e indicadores da devolução", body = StatusView),
        (status = 404, description = "Proposta não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta"))
)]
pub async fn get_status(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusView>, ApiError> {
    let view = app_state
        .subscription_service
        .status_view(id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(view))
}

// POST /api/subscriptions/{id}/sign
#[utoipa::path(
    post,
    path = "/api/subscriptions/{id}/sign",
    tag = "Subscription",
    request_body = SignatureConsent,
    responses(
        (status = 200, description = "Contrato assinado", body = ActionResponse),
        (status = 400, description = "Termos não aceitos"),
        (status = 409, description = "Status não permite assinatura")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta"))
)]
pub async fn sign_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    ClientInfo(client): ClientInfo,
    Path(id): Path<Uuid>,
    Json(consent): Json<SignatureConsent>,
) -> Result<Json<ActionResponse>, ApiError> {
    let response = app_state
        .subscription_service
        .sign(id, &consent, &client)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

// POST /api/subscriptions/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/subscriptions/{id}/cancel",
    tag = "Subscription",
    request_body = CancelPayload,
    responses(
        (status = 200, description = "Cancelamento registrado com prazo de devolução", body = ActionResponse),
        (status = 409, description = "Status não permite cancelamento")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta"))
)]
pub async fn cancel_subscription(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ActionResponse>, ApiError> {
    let payload: CancelPayload = optional_body(&body).map_err(|e| e.to_api_error(&locale))?;

    let response = app_state
        .subscription_service
        .cancel(id, payload.reason.as_deref(), Actor::Customer)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

// POST /api/subscriptions/{id}/return-tracking
#[utoipa::path(
    post,
    path = "/api/subscriptions/{id}/return-tracking",
    tag = "Subscription",
    request_body = TrackingCodePayload,
    responses(
        (status = 200, description = "Código registrado", body = ActionResponse),
        (status = 400, description = "Código inválido"),
        (status = 409, description = "Sem devolução pendente")
    ),
    params(("id" = Uuid, Path, description = "ID da proposta"))
)]
pub async fn submit_return_tracking(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<TrackingCodePayload>,
) -> Result<Json<ActionResponse>, ApiError> {
    let response = app_state
        .subscription_service
        .submit_tracking_code(id, &payload.code)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bodies_fall_back_to_defaults() {
        let payload: CancelPayload = optional_body(&Bytes::new()).unwrap();
        assert!(payload.reason.is_none());

        let payload: CancelPayload = optional_body(&Bytes::from_static(b" \n")).unwrap();
        assert!(payload.reason.is_none());

        let payload: CancelPayload = optional_body(&Bytes::from_static(r#"{"motivo":"mudança"}"#.as_bytes())).unwrap();
        assert_eq!(payload.reason.as_deref(), Some("mudança"));
    }

    #[test]
    fn malformed_bodies_are_validation_errors() {
        let err = optional_body::<CancelPayload>(&Bytes::from_static(b"{")).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "body"));
    }
}
