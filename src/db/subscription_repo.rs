// src/db/subscription_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        history::StatusHistoryEntry,
        signature::SignatureAudit,
        subscription::{Subscription, SubscriptionStatus, SubscriptionSummary},
    },
};

/// Persistência das propostas/assinaturas.
///
/// Mesmo contrato do `SignupStore`: `save` é condicional ao status esperado e
/// grava histórico e auditoria de assinatura na mesma transação.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert(
        &self,
        subscription: &Subscription,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<Subscription>, AppError>;

    async fn find_by_signup(&self, signup_id: Uuid) -> Result<Option<Subscription>, AppError>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<SubscriptionSummary>, AppError>;

    async fn history(&self, id: Uuid, limit: i64) -> Result<Vec<StatusHistoryEntry>, AppError>;

    async fn save(
        &self,
        subscription: &Subscription,
        expected: SubscriptionStatus,
        history: Option<&StatusHistoryEntry>,
        audit: Option<&SignatureAudit>,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_history(
        tx: &mut Transaction<'_, Postgres>,
        entry: &StatusHistoryEntry,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO status_history
                (id, application_id, from_status, to_status, actor, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.entity_id)
        .bind(&entry.from_status)
        .bind(&entry.to_status)
        .bind(entry.actor)
        .bind(&entry.note)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_audit(
        tx: &mut Transaction<'_, Postgres>,
        audit: &SignatureAudit,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO signature_audits (
                id, application_id, ip, user_agent, accepted_terms,
                accepted_privacy, accepted_comodato, otp_verified, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(audit.id)
        .bind(audit.application_id)
        .bind(&audit.ip)
        .bind(&audit.user_agent)
        .bind(audit.accepted_terms)
        .bind(audit.accepted_privacy)
        .bind(audit.accepted_comodato)
        .bind(audit.otp_verified)
        .bind(audit.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

const SELECT_SUBSCRIPTION: &str = r#"
    SELECT
        id, signup_request_id, person_type, name, email, phone, tax_id,
        payment_method, monthly_price_cents, min_term_months, status,
        activated_at, signed_at, canceled_at, return_deadline_at,
        equipment_return_status, return_tracking_code, equipment_fee_due_cents,
        cancellation_reason, created_at, updated_at
    FROM onboarding_applications
"#;

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    async fn insert(
        &self,
        s: &Subscription,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO onboarding_applications (
                id, signup_request_id, person_type, name, email, phone, tax_id,
                payment_method, monthly_price_cents, min_term_months, status,
                activated_at, signed_at, canceled_at, return_deadline_at,
                equipment_return_status, return_tracking_code, equipment_fee_due_cents,
                cancellation_reason, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(s.id)
        .bind(s.signup_request_id)
        .bind(s.person_type)
        .bind(&s.name)
        .bind(&s.email)
        .bind(&s.phone)
        .bind(&s.tax_id)
        .bind(s.payment_method)
        .bind(s.monthly_price_cents)
        .bind(s.min_term_months)
        .bind(s.status)
        .bind(s.activated_at)
        .bind(s.signed_at)
        .bind(s.canceled_at)
        .bind(s.return_deadline_at)
        .bind(s.equipment_return_status)
        .bind(&s.return_tracking_code)
        .bind(s.equipment_fee_due_cents)
        .bind(&s.cancellation_reason)
        .bind(s.created_at)
        .bind(s.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            // Uma proposta por solicitação (UNIQUE em signup_request_id)
            Some(db) if db.is_unique_violation() => AppError::StatusConflict,
            _ => AppError::DatabaseError(e),
        })?;

        if let Some(entry) = history {
            Self::insert_history(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Subscription>, AppError> {
        let row = sqlx::query_as::<_, Subscription>(&format!("{SELECT_SUBSCRIPTION} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_by_signup(&self, signup_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let row = sqlx::query_as::<_, Subscription>(&format!(
            "{SELECT_SUBSCRIPTION} WHERE signup_request_id = $1"
        ))
        .bind(signup_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<SubscriptionSummary>, AppError> {
        let rows = sqlx::query_as::<_, SubscriptionSummary>(
            r#"
            SELECT id, name, email, status, person_type, created_at
            FROM onboarding_applications
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn history(&self, id: Uuid, limit: i64) -> Result<Vec<StatusHistoryEntry>, AppError> {
        let rows = sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            SELECT id, application_id AS entity_id, from_status, to_status, actor, note, created_at
            FROM status_history
            WHERE application_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn save(
        &self,
        s: &Subscription,
        expected: SubscriptionStatus,
        history: Option<&StatusHistoryEntry>,
        audit: Option<&SignatureAudit>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE onboarding_applications SET
                status = $3, activated_at = $4, signed_at = $5, canceled_at = $6,
                return_deadline_at = $7, equipment_return_status = $8,
                return_tracking_code = $9, equipment_fee_due_cents = $10,
                cancellation_reason = $11, updated_at = $12
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(s.id)
        .bind(expected)
        .bind(s.status)
        .bind(s.activated_at)
        .bind(s.signed_at)
        .bind(s.canceled_at)
        .bind(s.return_deadline_at)
        .bind(s.equipment_return_status)
        .bind(&s.return_tracking_code)
        .bind(s.equipment_fee_due_cents)
        .bind(&s.cancellation_reason)
        .bind(s.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::StatusConflict);
        }

        if let Some(entry) = history {
            Self::insert_history(&mut tx, entry).await?;
        }
        if let Some(audit) = audit {
            Self::insert_audit(&mut tx, audit).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
