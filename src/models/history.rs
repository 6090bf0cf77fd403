// src/models/history.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Quem provocou a mudança de status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "history_actor", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Customer,
    Admin,
    System,
}

/// Linha imutável da trilha de auditoria de status.
///
/// Serve às duas trilhas (solicitações e propostas); cada uma grava na sua
/// própria tabela. `entity_id` é o id da solicitação ou da proposta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub entity_id: Uuid,
    #[schema(example = "SUBMITTED")]
    pub from_status: String,
    #[schema(example = "CONTRACT_SENT")]
    pub to_status: String,
    pub actor: Actor,
    #[schema(example = "Aprovado. Contrato gerado. Aguardando assinatura.")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    /// Registra uma transição. A linha só existe ao lado da escrita de status
    /// que ela descreve; os stores gravam as duas na mesma transação.
    pub fn record(
        entity_id: Uuid,
        from: &str,
        to: &str,
        actor: Actor,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id,
            from_status: from.to_string(),
            to_status: to.to_string(),
            actor,
            note,
            created_at: at,
        }
    }
}
