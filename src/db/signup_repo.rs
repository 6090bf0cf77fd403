// src/db/signup_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        history::StatusHistoryEntry,
        signup::{SignupRequest, SignupStatus, SignupSummary},
    },
};

/// Persistência das solicitações de cadastro.
///
/// `save` é uma escrita condicional: só grava se o status no banco ainda for
/// `expected` e a versão ainda for a lida (`request.version`), e grava a linha
/// de histórico (quando houver) na mesma transação. Sem linha afetada o
/// resultado é `AppError::StatusConflict` e nada é escrito.
#[async_trait]
pub trait SignupStore: Send + Sync {
    async fn insert(
        &self,
        request: &SignupRequest,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<SignupRequest>, AppError>;

    async fn list_recent(&self, limit: i64) -> Result<Vec<SignupSummary>, AppError>;

    /// Mais recentes primeiro.
    async fn history(&self, id: Uuid, limit: i64) -> Result<Vec<StatusHistoryEntry>, AppError>;

    async fn save(
        &self,
        request: &SignupRequest,
        expected: SignupStatus,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError>;

    /// Próximo número do protocolo no ano. Atômico; números podem ficar sem uso.
    async fn next_protocol_seq(&self, year: i32) -> Result<i32, AppError>;
}

#[derive(Clone)]
pub struct SignupRepository {
    pool: PgPool,
}

impl SignupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_history(
        tx: &mut Transaction<'_, Postgres>,
        entry: &StatusHistoryEntry,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO signup_status_history
                (id, signup_request_id, from_status, to_status, actor, note, created_at)
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
}

const SELECT_SIGNUP: &str = r#"
    SELECT
        id, person_type, name, tax_id, company_name, company_tax_id,
        responsible_name, responsible_tax_id, birth_date, email, phone,
        address, vehicle, documents, payment_method, monthly_price_cents,
        status, reject_reason, contract_pdf_url, protocolo, signed_at,
        version, created_at, updated_at
    FROM signup_requests
"#;

#[async_trait]
impl SignupStore for SignupRepository {
    async fn insert(
        &self,
        r: &SignupRequest,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO signup_requests (
                id, person_type, name, tax_id, company_name, company_tax_id,
                responsible_name, responsible_tax_id, birth_date, email, phone,
                address, vehicle, documents, payment_method, monthly_price_cents,
                status, reject_reason, contract_pdf_url, protocolo, signed_at,
                created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            "#,
        )
        .bind(r.id)
        .bind(r.person_type)
        .bind(&r.name)
        .bind(&r.tax_id)
        .bind(&r.company_name)
        .bind(&r.company_tax_id)
        .bind(&r.responsible_name)
        .bind(&r.responsible_tax_id)
        .bind(r.birth_date)
        .bind(&r.email)
        .bind(&r.phone)
        .bind(&r.address)
        .bind(&r.vehicle)
        .bind(&r.documents)
        .bind(r.payment_method)
        .bind(r.monthly_price_cents)
        .bind(r.status)
        .bind(&r.reject_reason)
        .bind(&r.contract_pdf_url)
        .bind(&r.protocolo)
        .bind(r.signed_at)
        .bind(r.created_at)
        .bind(r.updated_at)
        .bind(r.version)
        .execute(&mut *tx)
        .await?;

        if let Some(entry) = history {
            Self::insert_history(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<SignupRequest>, AppError> {
        let request = sqlx::query_as::<_, SignupRequest>(&format!("{SELECT_SIGNUP} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<SignupSummary>, AppError> {
        let rows = sqlx::query_as::<_, SignupSummary>(
            r#"
            SELECT id, person_type, name, company_name, email, status, protocolo, created_at
            FROM signup_requests
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
            SELECT id, signup_request_id AS entity_id, from_status, to_status, actor, note, created_at
            FROM signup_status_history
            WHERE signup_request_id = $1
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
        r: &SignupRequest,
        expected: SignupStatus,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE signup_requests SET
                person_type = $3, name = $4, tax_id = $5, company_name = $6,
                company_tax_id = $7, responsible_name = $8, responsible_tax_id = $9,
                birth_date = $10, email = $11, phone = $12, address = $13,
                vehicle = $14, documents = $15, payment_method = $16,
                monthly_price_cents = $17, status = $18, reject_reason = $19,
                contract_pdf_url = $20, protocolo = $21, signed_at = $22,
                updated_at = $23, version = version + 1
            WHERE id = $1 AND status = $2 AND version = $24
            "#,
        )
        .bind(r.id)
        .bind(expected)
        .bind(r.person_type)
        .bind(&r.name)
        .bind(&r.tax_id)
        .bind(&r.company_name)
        .bind(&r.company_tax_id)
        .bind(&r.responsible_name)
        .bind(&r.responsible_tax_id)
        .bind(r.birth_date)
        .bind(&r.email)
        .bind(&r.phone)
        .bind(&r.address)
        .bind(&r.vehicle)
        .bind(&r.documents)
        .bind(r.payment_method)
        .bind(r.monthly_price_cents)
        .bind(r.status)
        .bind(&r.reject_reason)
        .bind(&r.contract_pdf_url)
        .bind(&r.protocolo)
        .bind(r.signed_at)
        .bind(r.updated_at)
        .bind(r.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // tx cai no drop -> rollback
            return Err(AppError::StatusConflict);
        }

        if let Some(entry) = history {
            Self::insert_history(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn next_protocol_seq(&self, year: i32) -> Result<i32, AppError> {
        let value: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO protocol_counters (year, value) VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET value = protocol_counters.value + 1
            RETURNING value
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }
}
