// src/services/subscription_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{SignupStore, SubscriptionStore},
    models::{
        action::ActionResponse,
        history::{Actor, StatusHistoryEntry},
        signature::{ClientContext, SignatureConsent},
        signup::SignupStatus,
        subscription::{
            CreateSubscriptionPayload, StatusView, Subscription, SubscriptionDetail,
            SubscriptionSummary,
        },
    },
    services::contract::sign_link,
};

pub const ADMIN_LIST_LIMIT: i64 = 50;
pub const DETAIL_HISTORY_LIMIT: i64 = 50;

/// Ações aceitas pela rota genérica de transição da equipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransitionAction {
    Approve,
    Reject,
    Activate,
}

/// Máquina de estados da proposta, da aprovação à devolução do equipamento.
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    signups: Arc<dyn SignupStore>,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        signups: Arc<dyn SignupStore>,
        clock: Arc<dyn Clock>,
        base_url: String,
    ) -> Self {
        Self {
            store,
            signups,
            clock,
            base_url,
        }
    }

    async fn load(&self, id: Uuid) -> Result<Subscription, AppError> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Proposta não encontrada".to_string()))
    }

    /// Lê, aplica a transição e grava de forma condicional ao status lido.
    async fn transition<F>(&self, id: Uuid, apply: F) -> Result<Subscription, AppError>
    where
        F: FnOnce(&mut Subscription, DateTime<Utc>) -> Result<StatusHistoryEntry, AppError>,
    {
        let mut subscription = self.load(id).await?;
        let expected = subscription.status;

        let entry = apply(&mut subscription, self.clock.now())?;
        self.store
            .save(&subscription, expected, Some(&entry), None)
            .await?;

        tracing::info!(
            "✅ Proposta {}: {} -> {} ({:?})",
            id,
            entry.from_status,
            entry.to_status,
            entry.actor
        );
        Ok(subscription)
    }

    fn created_response(&self, subscription: &Subscription, message: &str) -> ActionResponse {
        let mut response = ActionResponse::new(subscription.status, message).with_id(subscription.id);
        response.sign_link = Some(sign_link(&self.base_url, subscription.id));
        response
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    /// Atalho da equipe: proposta já aprovada, pronta para assinatura.
    pub async fn create_pre_approved(
        &self,
        payload: &CreateSubscriptionPayload,
    ) -> Result<ActionResponse, AppError> {
        let subscription = Subscription::pre_approved(Uuid::new_v4(), payload, self.clock.now());
        self.store.insert(&subscription, None).await?;

        tracing::info!("📝 Proposta {} criada (APPROVED)", subscription.id);
        Ok(self.created_response(
            &subscription,
            "Proposta criada. Envie o link de assinatura ao cliente.",
        ))
    }

    /// Proposta a partir de uma solicitação assinada. No máximo uma por solicitação.
    pub async fn create_from_signup(&self, signup_id: Uuid) -> Result<ActionResponse, AppError> {
        let signup = self
            .signups
            .find(signup_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Solicitação não encontrada".to_string()))?;

        if signup.status != SignupStatus::Signed {
            return Err(AppError::precondition(
                "Solicitação ainda não foi assinada",
                signup.status,
            ));
        }
        if let Some(existing) = self.store.find_by_signup(signup_id).await? {
            return Err(AppError::precondition(
                format!("Solicitação já possui a proposta {}", existing.id),
                signup.status,
            ));
        }

        let subscription = Subscription::from_signed_signup(Uuid::new_v4(), &signup, self.clock.now());
        self.store.insert(&subscription, None).await?;

        tracing::info!(
            "📝 Proposta {} criada a partir da solicitação {}",
            subscription.id,
            signup_id
        );
        Ok(self.created_response(&subscription, "Proposta criada a partir da solicitação assinada."))
    }

    // =========================================================================
    //  LEITURAS
    // =========================================================================

    pub async fn get_detail(&self, id: Uuid) -> Result<SubscriptionDetail, AppError> {
        let subscription = self.load(id).await?;
        let history = self.store.history(id, DETAIL_HISTORY_LIMIT).await?;
        Ok(SubscriptionDetail {
            subscription,
            history,
        })
    }

    pub async fn status_view(&self, id: Uuid) -> Result<StatusView, AppError> {
        let subscription = self.load(id).await?;
        Ok(subscription.status_view(self.clock.now()))
    }

    pub async fn list_recent(&self) -> Result<Vec<SubscriptionSummary>, AppError> {
        self.store.list_recent(ADMIN_LIST_LIMIT).await
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    pub async fn apply_action(
        &self,
        id: Uuid,
        action: TransitionAction,
        note: Option<&str>,
    ) -> Result<ActionResponse, AppError> {
        let subscription = match action {
            TransitionAction::Approve => self.transition(id, |s, now| s.approve(note, now)).await?,
            TransitionAction::Reject => self.transition(id, |s, now| s.reject(note, now)).await?,
            TransitionAction::Activate => self.transition(id, |s, now| s.activate(note, now)).await?,
        };
        Ok(ActionResponse::new(subscription.status, format!("Status alterado para {}", subscription.status))
            .with_id(id))
    }

    /// APPROVED/SIGNING -> SIGNED, com auditoria gravada na mesma transação.
    pub async fn sign(
        &self,
        id: Uuid,
        consent: &SignatureConsent,
        client: &ClientContext,
    ) -> Result<ActionResponse, AppError> {
        let mut subscription = self.load(id).await?;
        let expected = subscription.status;

        let (entry, audit) = subscription.sign(consent, client, self.clock.now())?;
        self.store
            .save(&subscription, expected, Some(&entry), Some(&audit))
            .await?;

        tracing::info!(
            "✅ Proposta {}: {} -> {} (assinatura, IP {})",
            id,
            entry.from_status,
            entry.to_status,
            client.ip.as_deref().unwrap_or("N/A")
        );
        Ok(ActionResponse::new(subscription.status, "Contrato assinado com sucesso").with_id(id))
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        reason: Option<&str>,
        actor: Actor,
    ) -> Result<ActionResponse, AppError> {
        let subscription = self.transition(id, |s, now| s.cancel(reason, actor, now)).await?;

        let deadline = subscription
            .return_deadline_at
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default();
        let mut response = ActionResponse::new(
            subscription.status,
            format!("Cancelamento registrado. Devolva o equipamento até {deadline}."),
        )
        .with_id(id);
        response.return_deadline_at = subscription.return_deadline_at;
        Ok(response)
    }

    /// Código de rastreio da devolução. Repetir o mesmo código não escreve nada.
    pub async fn submit_tracking_code(&self, id: Uuid, code: &str) -> Result<ActionResponse, AppError> {
        let mut subscription = self.load(id).await?;
        let expected = subscription.status;

        if subscription.submit_tracking_code(code, self.clock.now())? {
            self.store.save(&subscription, expected, None, None).await?;
            tracing::info!("📦 Proposta {}: código de rastreio registrado", id);
        }

        let mut response =
            ActionResponse::new(subscription.status, "Código de rastreio registrado").with_id(id);
        response.return_tracking_code = subscription.return_tracking_code;
        Ok(response)
    }

    pub async fn confirm_return(&self, id: Uuid) -> Result<ActionResponse, AppError> {
        let subscription = self.transition(id, |s, now| s.confirm_return(now)).await?;
        Ok(ActionResponse::new(subscription.status, "Devolução confirmada").with_id(id))
    }

    pub async fn mark_fee_due(&self, id: Uuid, note: Option<&str>) -> Result<ActionResponse, AppError> {
        let subscription = self.transition(id, |s, now| s.mark_fee_due(note, now)).await?;

        let mut response =
            ActionResponse::new(subscription.status, "Taxa de reposição registrada").with_id(id);
        response.equipment_fee_due_cents = Some(subscription.equipment_fee_due_cents);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        common::clock::FixedClock,
        db::memory_store::{MemorySignupStore, MemorySubscriptionStore},
        models::{
            signup::{PaymentMethod, PersonType},
            subscription::{EquipmentReturnStatus, SubscriptionStatus},
        },
        services::signup_service::tests as signup_tests,
    };

    struct Harness {
        service: SubscriptionService,
        store: Arc<MemorySubscriptionStore>,
        clock: Arc<FixedClock>,
    }

    fn harness_with(signups: Arc<dyn SignupStore>) -> Harness {
        let store = Arc::new(MemorySubscriptionStore::default());
        let clock = Arc::new(FixedClock::at("2026-06-01T08:00:00Z".parse().unwrap()));
        let service = SubscriptionService::new(
            store.clone(),
            signups,
            clock.clone(),
            "http://localhost:3000".to_string(),
        );
        Harness {
            service,
            store,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(MemorySignupStore::default()))
    }

    fn payload() -> CreateSubscriptionPayload {
        CreateSubscriptionPayload {
            person_type: PersonType::Individual,
            name: "Carla Mendes".into(),
            email: "carla@exemplo.com".into(),
            phone: "94991112233".into(),
            tax_id: "529.982.247-25".into(),
            payment_method: PaymentMethod::Boleto,
        }
    }

    fn client() -> ClientContext {
        ClientContext {
            ip: Some("203.0.113.9".into()),
            user_agent: Some("Mozilla/5.0".into()),
        }
    }

    async fn active(h: &Harness) -> Uuid {
        let id = h.service.create_pre_approved(&payload()).await.unwrap().id.unwrap();
        h.service
            .sign(id, &SignatureConsent::all_accepted(), &client())
            .await
            .unwrap();
        h.service
            .apply_action(id, TransitionAction::Activate, None)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn pre_approved_creation_prices_by_payment_method() {
        let h = harness();
        let created = h.service.create_pre_approved(&payload()).await.unwrap();
        assert_eq!(created.status, "APPROVED");
        assert!(created.sign_link.unwrap().contains("/cadastro/assinatura?id="));

        let detail = h.service.get_detail(created.id.unwrap()).await.unwrap();
        assert_eq!(detail.subscription.monthly_price_cents, 5990);
        assert_eq!(detail.subscription.min_term_months, 6);
        assert_eq!(detail.subscription.phone, "5594991112233");
        assert!(detail.history.is_empty());
    }

    #[tokio::test]
    async fn signing_writes_history_and_audit_together() {
        let h = harness();
        let id = h.service.create_pre_approved(&payload()).await.unwrap().id.unwrap();

        h.service
            .sign(id, &SignatureConsent::all_accepted(), &client())
            .await
            .unwrap();

        let audits = h.store.audits();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].ip.as_deref(), Some("203.0.113.9"));
        assert!(!audits[0].otp_verified);

        let detail = h.service.get_detail(id).await.unwrap();
        assert_eq!(detail.subscription.status, SubscriptionStatus::Signed);
        assert!(detail.subscription.signed_at.is_some());
        assert_eq!(detail.history.len(), 1);
        assert_eq!(detail.history[0].actor, Actor::Customer);
    }

    #[tokio::test]
    async fn refused_signature_writes_nothing() {
        let h = harness();
        let id = h.service.create_pre_approved(&payload()).await.unwrap().id.unwrap();
        let consent = SignatureConsent {
            accepted_contract: true,
            accepted_privacy: true,
            accepted_comodato: false,
        };
        assert!(h.service.sign(id, &consent, &client()).await.is_err());
        assert!(h.store.audits().is_empty());
        assert!(h.store.all_history().is_empty());
    }

    #[tokio::test]
    async fn cancel_opens_the_return_window_once() {
        let h = harness();
        let id = active(&h).await;
        let now = h.clock.now();

        let canceled = h.service.cancel(id, Some("cliente"), Actor::Customer).await.unwrap();
        assert_eq!(canceled.status, "RETURN_PENDING");
        assert_eq!(canceled.return_deadline_at, Some(now + Duration::days(10)));

        let err = h.service.cancel(id, Some("cliente"), Actor::Customer).await.unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed { ref status, .. } if status == "RETURN_PENDING"));

        let detail = h.service.get_detail(id).await.unwrap();
        assert_eq!(detail.subscription.canceled_at, Some(now));
        assert_eq!(
            detail.subscription.equipment_return_status,
            EquipmentReturnStatus::Pending
        );
    }

    #[tokio::test]
    async fn repeated_tracking_code_is_idempotent() {
        let h = harness();
        let id = active(&h).await;
        h.service.cancel(id, None, Actor::Customer).await.unwrap();
        let history_before = h.store.all_history().len();

        h.service.submit_tracking_code(id, "BR123456789").await.unwrap();
        let again = h.service.submit_tracking_code(id, "BR123456789").await.unwrap();

        assert_eq!(again.return_tracking_code.as_deref(), Some("BR123456789"));
        assert_eq!(h.store.all_history().len(), history_before);
        let view = h.service.status_view(id).await.unwrap();
        assert!(view.flags.has_return_tracking);
        assert!(view.flags.is_return_pending);
    }

    #[tokio::test]
    async fn fee_due_after_return_pending() {
        let h = harness();
        let id = active(&h).await;
        h.service.cancel(id, None, Actor::Admin).await.unwrap();

        let fee = h.service.mark_fee_due(id, None).await.unwrap();
        assert_eq!(fee.status, "FEE_DUE");
        assert_eq!(fee.equipment_fee_due_cents, Some(30_000));

        let detail = h.service.get_detail(id).await.unwrap();
        assert_eq!(
            detail.subscription.equipment_return_status,
            EquipmentReturnStatus::WaivedLost
        );
        assert_eq!(
            detail.history[0].note.as_deref(),
            Some("Taxa de reposição R$ 300,00. Equipamento não devolvido/danificado/incompleto")
        );
    }

    #[tokio::test]
    async fn confirmed_return_closes_the_contract() {
        let h = harness();
        let id = active(&h).await;
        h.service.cancel(id, None, Actor::Customer).await.unwrap();

        let done = h.service.confirm_return(id).await.unwrap();
        assert_eq!(done.status, "CANCELED");
        let view = h.service.status_view(id).await.unwrap();
        assert_eq!(view.equipment_return_status, EquipmentReturnStatus::Received);

        // Prazo vencido aparece nas flags, mesmo sem agendador
        h.clock.advance(Duration::days(30));
        assert!(h.service.status_view(id).await.unwrap().flags.return_deadline_passed);
    }

    #[tokio::test]
    async fn activation_from_disallowed_status_fails() {
        let h = harness();
        let id = active(&h).await;
        let err = h
            .service
            .apply_action(id, TransitionAction::Activate, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ACTIVE"));
    }

    #[tokio::test]
    async fn from_signup_requires_signed_request_and_is_unique() {
        let signup = signup_tests::harness();
        let signup_id = signup_tests::submitted_individual(&signup.service).await;
        let h = harness_with(signup.store.clone());

        let err = h.service.create_from_signup(signup_id).await.unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed { .. }));

        signup.service.approve(signup_id).await.unwrap();
        signup
            .service
            .sign(signup_id, &SignatureConsent::all_accepted(), &client())
            .await
            .unwrap();

        let created = h.service.create_from_signup(signup_id).await.unwrap();
        assert_eq!(created.status, "SIGNED");
        let detail = h.service.get_detail(created.id.unwrap()).await.unwrap();
        assert_eq!(detail.subscription.signup_request_id, Some(signup_id));
        assert_eq!(detail.subscription.name, "João Pereira");
        assert!(detail.subscription.signed_at.is_some());

        assert!(h.service.create_from_signup(signup_id).await.is_err());
    }
}
