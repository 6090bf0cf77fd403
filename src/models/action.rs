// src/models/action.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Resposta padrão das ações de fluxo: `{ ok: true, status, ...campos derivados }`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub ok: bool,
    #[schema(example = "SUBMITTED")]
    pub status: String,
    #[schema(example = "Solicitação enviada para análise")]
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "TRA-2026-0001")]
    pub protocolo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_deadline_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_tracking_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_fee_due_cents: Option<i64>,
}

impl ActionResponse {
    pub fn new(status: impl ToString, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            status: status.to_string(),
            message: message.into(),
            id: None,
            protocolo: None,
            contract_url: None,
            sign_link: None,
            return_deadline_at: None,
            return_tracking_code: None,
            equipment_fee_due_cents: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}
