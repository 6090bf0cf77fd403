// src/models/subscription.rs

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::{
        history::{Actor, StatusHistoryEntry},
        signature::{ClientContext, SignatureAudit, SignatureConsent},
        signup::{PaymentMethod, PersonType, SignupRequest},
    },
};

/// Prazo de devolução do equipamento após o cancelamento.
pub const RETURN_WINDOW_DAYS: i64 = 10;
/// Taxa de reposição do equipamento (R$ 300,00).
pub const EQUIPMENT_FEE_CENTS: i64 = 30_000;
pub const MIN_TERM_MONTHS: i32 = 6;
pub const TRACKING_CODE_MIN: usize = 8;
pub const TRACKING_CODE_MAX: usize = 20;
pub const DEFAULT_CANCEL_REASON: &str = "cliente";
pub const DEFAULT_FEE_NOTE: &str = "Equipamento não devolvido/danificado/incompleto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Submitted,
    InReview,
    Approved,
    Rejected,
    Signing,
    Signed,
    Active,
    DelinquentSuspended,
    ReturnPending,
    Canceled,
    FeeDue,
}

impl SubscriptionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::InReview => "IN_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Signing => "SIGNING",
            Self::Signed => "SIGNED",
            Self::Active => "ACTIVE",
            Self::DelinquentSuspended => "DELINQUENT_SUSPENDED",
            Self::ReturnPending => "RETURN_PENDING",
            Self::Canceled => "CANCELED",
            Self::FeeDue => "FEE_DUE",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "equipment_return_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentReturnStatus {
    #[default]
    None,
    Pending,
    Received,
    WaivedLost,
}

/// Proposta / assinatura ativa do serviço de rastreamento.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub signup_request_id: Option<Uuid>,
    pub person_type: PersonType,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub payment_method: PaymentMethod,
    #[schema(example = 4990)]
    pub monthly_price_cents: i64,
    #[schema(example = 6)]
    pub min_term_months: i32,
    pub status: SubscriptionStatus,

    pub activated_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub return_deadline_at: Option<DateTime<Utc>>,

    pub equipment_return_status: EquipmentReturnStatus,
    pub return_tracking_code: Option<String>,
    pub equipment_fee_due_cents: i64,
    pub cancellation_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cadastro direto pela equipe (já nasce aprovado).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionPayload {
    #[serde(default = "default_person_type", alias = "tipoPessoa")]
    pub person_type: PersonType,
    #[validate(length(min = 1, max = 200, message = "Nome é obrigatório."))]
    #[serde(alias = "nome")]
    pub name: String,
    #[validate(custom(function = "crate::common::validation::validate_email_br"))]
    pub email: String,
    #[validate(custom(function = "crate::common::validation::validate_phone_br"))]
    #[serde(alias = "telefone")]
    pub phone: String,
    #[validate(length(min = 11, max = 18, message = "CPF/CNPJ inválido."))]
    #[serde(alias = "cpfCnpj")]
    pub tax_id: String,
    #[serde(default, alias = "formaPagamento")]
    pub payment_method: PaymentMethod,
}

fn default_person_type() -> PersonType {
    PersonType::Individual
}

impl Subscription {
    fn blank(id: Uuid, status: SubscriptionStatus, now: DateTime<Utc>) -> Self {
        let payment_method = PaymentMethod::default();
        Self {
            id,
            signup_request_id: None,
            person_type: PersonType::Individual,
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            tax_id: String::new(),
            payment_method,
            monthly_price_cents: payment_method.monthly_price_cents(),
            min_term_months: MIN_TERM_MONTHS,
            status,
            activated_at: None,
            signed_at: None,
            canceled_at: None,
            return_deadline_at: None,
            equipment_return_status: EquipmentReturnStatus::None,
            return_tracking_code: None,
            equipment_fee_due_cents: 0,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Atalho da equipe: a proposta nasce APPROVED, pronta para assinatura.
    pub fn pre_approved(id: Uuid, payload: &CreateSubscriptionPayload, now: DateTime<Utc>) -> Self {
        Self {
            person_type: payload.person_type,
            name: payload.name.trim().to_string(),
            email: crate::common::validation::normalize_email(&payload.email),
            phone: crate::common::validation::normalize_phone_br(&payload.phone),
            tax_id: crate::common::validation::normalize_digits(&payload.tax_id),
            payment_method: payload.payment_method,
            monthly_price_cents: payload.payment_method.monthly_price_cents(),
            ..Self::blank(id, SubscriptionStatus::Approved, now)
        }
    }

    /// Proposta derivada de uma solicitação já assinada.
    pub fn from_signed_signup(id: Uuid, signup: &SignupRequest, now: DateTime<Utc>) -> Self {
        let tax_id = match signup.person_type {
            PersonType::Individual => signup.tax_id.clone(),
            PersonType::Company => signup.company_tax_id.clone(),
        };
        Self {
            signup_request_id: Some(signup.id),
            person_type: signup.person_type,
            name: signup.display_name().to_string(),
            email: signup.email.clone(),
            phone: signup.phone.clone(),
            tax_id: tax_id.unwrap_or_default(),
            payment_method: signup.payment_method,
            monthly_price_cents: signup.monthly_price_cents,
            signed_at: signup.signed_at.or(Some(now)),
            ..Self::blank(id, SubscriptionStatus::Signed, now)
        }
    }

    fn guard(&self, allowed: &[SubscriptionStatus], action: &str) -> Result<(), AppError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(AppError::precondition(format!("{action} não permitido"), self.status))
        }
    }

    fn move_to(
        &mut self,
        to: SubscriptionStatus,
        actor: Actor,
        note: String,
        now: DateTime<Utc>,
    ) -> StatusHistoryEntry {
        let from = self.status;
        self.status = to;
        self.updated_at = now;
        StatusHistoryEntry::record(self.id, from.as_str(), to.as_str(), actor, Some(note), now)
    }

    fn default_note(note: Option<&str>, to: SubscriptionStatus) -> String {
        note.map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Status alterado para {to}"))
    }

    /// SUBMITTED/IN_REVIEW -> APPROVED.
    pub fn approve(&mut self, note: Option<&str>, now: DateTime<Utc>) -> Result<StatusHistoryEntry, AppError> {
        self.guard(
            &[SubscriptionStatus::Submitted, SubscriptionStatus::InReview],
            "Aprovação",
        )?;
        let note = Self::default_note(note, SubscriptionStatus::Approved);
        Ok(self.move_to(SubscriptionStatus::Approved, Actor::Admin, note, now))
    }

    /// SUBMITTED/IN_REVIEW -> REJECTED. Observação obrigatória.
    pub fn reject(&mut self, note: Option<&str>, now: DateTime<Utc>) -> Result<StatusHistoryEntry, AppError> {
        let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
            return Err(AppError::validation("note", "Observação obrigatória ao rejeitar"));
        };
        self.guard(
            &[SubscriptionStatus::Submitted, SubscriptionStatus::InReview],
            "Rejeição",
        )?;
        Ok(self.move_to(SubscriptionStatus::Rejected, Actor::Admin, note.to_string(), now))
    }

    /// SIGNED/APPROVED -> ACTIVE.
    pub fn activate(&mut self, note: Option<&str>, now: DateTime<Utc>) -> Result<StatusHistoryEntry, AppError> {
        self.guard(
            &[SubscriptionStatus::Signed, SubscriptionStatus::Approved],
            "Ativação",
        )?;
        self.activated_at.get_or_insert(now);
        let note = Self::default_note(note, SubscriptionStatus::Active);
        Ok(self.move_to(SubscriptionStatus::Active, Actor::Admin, note, now))
    }

    /// APPROVED/SIGNING -> SIGNED, com a evidência da assinatura.
    pub fn sign(
        &mut self,
        consent: &SignatureConsent,
        client: &ClientContext,
        now: DateTime<Utc>,
    ) -> Result<(StatusHistoryEntry, SignatureAudit), AppError> {
        consent.ensure_complete()?;
        self.guard(
            &[SubscriptionStatus::Approved, SubscriptionStatus::Signing],
            "Assinatura",
        )?;
        self.signed_at.get_or_insert(now);
        let note = format!(
            "Contrato assinado eletronicamente. IP: {}",
            client.ip.as_deref().unwrap_or("N/A")
        );
        let history = self.move_to(SubscriptionStatus::Signed, Actor::Customer, note, now);
        let audit = SignatureAudit::new(self.id, consent, client, now);
        Ok((history, audit))
    }

    /// ACTIVE/DELINQUENT_SUSPENDED -> RETURN_PENDING. Prazo de devolução: agora + 10 dias.
    pub fn cancel(
        &mut self,
        reason: Option<&str>,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<StatusHistoryEntry, AppError> {
        self.guard(
            &[SubscriptionStatus::Active, SubscriptionStatus::DelinquentSuspended],
            "Cancelamento",
        )?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CANCEL_REASON)
            .to_string();

        let deadline = *self
            .return_deadline_at
            .get_or_insert(now + Duration::days(RETURN_WINDOW_DAYS));
        self.canceled_at.get_or_insert(now);
        self.equipment_return_status = EquipmentReturnStatus::Pending;

        let note = format!(
            "Cancelamento ({reason}). Devolução até {}.",
            deadline.format("%Y-%m-%d")
        );
        self.cancellation_reason = Some(reason);
        Ok(self.move_to(SubscriptionStatus::ReturnPending, actor, note, now))
    }

    /// Grava o código de rastreio da devolução. Não muda o status nem gera histórico.
    /// Retorna `true` se o código mudou.
    pub fn submit_tracking_code(&mut self, code: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let code = code.trim();
        let len = code.chars().count();
        if !(TRACKING_CODE_MIN..=TRACKING_CODE_MAX).contains(&len) {
            return Err(AppError::validation(
                "code",
                format!(
                    "Código de rastreio deve ter entre {TRACKING_CODE_MIN} e {TRACKING_CODE_MAX} caracteres"
                ),
            ));
        }
        self.guard(&[SubscriptionStatus::ReturnPending], "Envio de rastreio")?;

        if self.return_tracking_code.as_deref() == Some(code) {
            return Ok(false);
        }
        self.return_tracking_code = Some(code.to_string());
        self.updated_at = now;
        Ok(true)
    }

    /// RETURN_PENDING -> CANCELED.
    pub fn confirm_return(&mut self, now: DateTime<Utc>) -> Result<StatusHistoryEntry, AppError> {
        self.guard(&[SubscriptionStatus::ReturnPending], "Confirmação de devolução")?;
        self.equipment_return_status = EquipmentReturnStatus::Received;
        Ok(self.move_to(
            SubscriptionStatus::Canceled,
            Actor::Admin,
            "Devolução confirmada. Equipamento recebido.".to_string(),
            now,
        ))
    }

    /// RETURN_PENDING/CANCELED/ACTIVE -> FEE_DUE, com a taxa fixa de reposição.
    pub fn mark_fee_due(&mut self, note: Option<&str>, now: DateTime<Utc>) -> Result<StatusHistoryEntry, AppError> {
        self.guard(
            &[
                SubscriptionStatus::ReturnPending,
                SubscriptionStatus::Canceled,
                SubscriptionStatus::Active,
            ],
            "Cobrança de taxa",
        )?;
        self.equipment_fee_due_cents = EQUIPMENT_FEE_CENTS;
        self.equipment_return_status = EquipmentReturnStatus::WaivedLost;

        let detail = note
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FEE_NOTE);
        let note = format!("Taxa de reposição R$ 300,00. {detail}");
        Ok(self.move_to(SubscriptionStatus::FeeDue, Actor::Admin, note, now))
    }

    pub fn status_view(&self, now: DateTime<Utc>) -> StatusView {
        StatusView {
            id: self.id,
            status: self.status,
            min_term_months: self.min_term_months,
            activated_at: self.activated_at,
            canceled_at: self.canceled_at,
            return_deadline_at: self.return_deadline_at,
            return_tracking_code: self.return_tracking_code.clone(),
            equipment_return_status: self.equipment_return_status,
            equipment_fee_due_cents: self.equipment_fee_due_cents,
            flags: StatusFlags {
                is_return_pending: self.status == SubscriptionStatus::ReturnPending,
                return_deadline_passed: self.return_deadline_at.is_some_and(|d| now > d),
                fee_due: self.status == SubscriptionStatus::FeeDue
                    || self.equipment_fee_due_cents > 0,
                has_return_tracking: self.return_tracking_code.is_some(),
            },
        }
    }
}

// --- Leituras ---

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlags {
    pub is_return_pending: bool,
    pub return_deadline_passed: bool,
    pub fee_due: bool,
    pub has_return_tracking: bool,
}

/// Fotografia do status para a página do cliente.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub id: Uuid,
    pub status: SubscriptionStatus,
    pub min_term_months: i32,
    pub activated_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub return_deadline_at: Option<DateTime<Utc>>,
    pub return_tracking_code: Option<String>,
    pub equipment_return_status: EquipmentReturnStatus,
    pub equipment_fee_due_cents: i64,
    pub flags: StatusFlags,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: SubscriptionStatus,
    pub person_type: PersonType,
    pub created_at: DateTime<Utc>,
}

impl From<&Subscription> for SubscriptionSummary {
    fn from(s: &Subscription) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            email: s.email.clone(),
            status: s.status,
            person_type: s.person_type,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetail {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub history: Vec<StatusHistoryEntry>,
}
