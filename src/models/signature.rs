// src/models/signature.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

/// Os três aceites da assinatura eletrônica (contrato, privacidade, comodato).
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureConsent {
    #[serde(default)]
    pub accepted_contract: bool,
    #[serde(default)]
    pub accepted_privacy: bool,
    #[serde(default)]
    pub accepted_comodato: bool,
}

impl SignatureConsent {
    pub fn all_accepted() -> Self {
        Self {
            accepted_contract: true,
            accepted_privacy: true,
            accepted_comodato: true,
        }
    }

    pub fn ensure_complete(&self) -> Result<(), AppError> {
        if self.accepted_contract && self.accepted_privacy && self.accepted_comodato {
            Ok(())
        } else {
            Err(AppError::validation("terms", "Todos os termos devem ser aceitos"))
        }
    }
}

/// Origem da requisição de assinatura, guardada como evidência.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Evidência legal da assinatura. Escrita uma vez, nunca lida pela máquina de estados.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureAudit {
    pub id: Uuid,
    pub application_id: Uuid,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub accepted_terms: bool,
    pub accepted_privacy: bool,
    pub accepted_comodato: bool,
    // Sem OTP: a assinatura é um clique de aceite auditado
    pub otp_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl SignatureAudit {
    pub fn new(
        application_id: Uuid,
        consent: &SignatureConsent,
        client: &ClientContext,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_id,
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            accepted_terms: consent.accepted_contract,
            accepted_privacy: consent.accepted_privacy,
            accepted_comodato: consent.accepted_comodato,
            otp_verified: false,
            created_at: at,
        }
    }
}
