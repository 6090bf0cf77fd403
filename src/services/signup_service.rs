// src/services/signup_service.rs

use std::sync::Arc;

use chrono::Datelike;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{BlobStore, SignupStore},
    models::{
        action::ActionResponse,
        history::StatusHistoryEntry,
        signature::{ClientContext, SignatureConsent},
        signup::{
            format_protocolo, DocumentEntry, PersonType, SignupAction, SignupDetail, SignupForm,
            SignupRequest, SignupSummary,
        },
    },
    services::{
        contract::{contract_placeholders, fill_contract_template, sign_link, ContractTemplates},
        document_policy,
        document_service::DocumentService,
        upload_policy::{prepare_upload, stored_filename},
    },
};

pub const DETAIL_HISTORY_LIMIT: i64 = 20;
pub const ADMIN_LIST_LIMIT: i64 = 100;
pub const CONTRACT_FILE: &str = "contrato.txt";
pub const UPLOAD_SAVE_ATTEMPTS: u32 = 3;

/// Máquina de estados da solicitação de cadastro.
#[derive(Clone)]
pub struct SignupService {
    store: Arc<dyn SignupStore>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    templates: Arc<ContractTemplates>,
    documents: DocumentService,
    base_url: String,
}

impl SignupService {
    pub fn new(
        store: Arc<dyn SignupStore>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        templates: Arc<ContractTemplates>,
        documents: DocumentService,
        base_url: String,
    ) -> Self {
        Self {
            store,
            blobs,
            clock,
            templates,
            documents,
            base_url,
        }
    }

    async fn load(&self, id: Uuid) -> Result<SignupRequest, AppError> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Solicitação não encontrada".to_string()))
    }

    fn log_transition(entry: &StatusHistoryEntry) {
        tracing::info!(
            "✅ Solicitação {}: {} -> {} ({:?})",
            entry.entity_id,
            entry.from_status,
            entry.to_status,
            entry.actor
        );
    }

    pub fn sign_link(&self, id: Uuid) -> String {
        sign_link(&self.base_url, id)
    }

    // =========================================================================
    //  CLIENTE
    // =========================================================================

    /// Cria ou atualiza o formulário. Com `Submit`, valida tudo e envia para análise.
    pub async fn save(
        &self,
        id: Option<Uuid>,
        form: &SignupForm,
        action: SignupAction,
        accepted_lgpd: bool,
    ) -> Result<ActionResponse, AppError> {
        let now = self.clock.now();

        let (mut request, existing) = match id {
            Some(id) => {
                let request = self.load(id).await?;
                request.ensure_editable()?;
                (request, true)
            }
            None => {
                let person_type = form.person_type.unwrap_or(PersonType::Individual);
                (SignupRequest::new_draft(Uuid::new_v4(), person_type, now), false)
            }
        };
        let expected = request.status;

        request.apply_form(form, now);
        request.ensure_contact_present()?;

        let history = match action {
            SignupAction::Draft => None,
            SignupAction::Submit => {
                request.check_submission(accepted_lgpd)?;
                let protocolo = match request.protocolo {
                    Some(_) => None,
                    None => {
                        let seq = self.store.next_protocol_seq(now.year()).await?;
                        Some(format_protocolo(now.year(), seq))
                    }
                };
                Some(request.submit(protocolo, now)?)
            }
        };

        if existing {
            self.store.save(&request, expected, history.as_ref()).await?;
        } else {
            self.store.insert(&request, history.as_ref()).await?;
            tracing::info!("📝 Solicitação {} criada", request.id);
        }

        let message = match &history {
            Some(entry) => {
                Self::log_transition(entry);
                "Solicitação enviada para análise"
            }
            None => "Rascunho salvo",
        };

        let mut response = ActionResponse::new(request.status, message).with_id(request.id);
        response.protocolo = request.protocolo.clone();
        Ok(response)
    }

    pub async fn get_detail(&self, id: Uuid) -> Result<SignupDetail, AppError> {
        let request = self.load(id).await?;
        let history = self.store.history(id, DETAIL_HISTORY_LIMIT).await?;
        Ok(SignupDetail { request, history })
    }

    /// Envia (ou substitui) um documento. Só enquanto a solicitação é editável.
    pub async fn upload_document(
        &self,
        id: Uuid,
        key: &str,
        original_filename: Option<String>,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<DocumentEntry, AppError> {
        if !document_policy::is_known_key(key) {
            return Err(AppError::validation("key", "Tipo de documento desconhecido"));
        }

        self.load(id).await?.ensure_editable()?;

        let size_sent = bytes.len();
        let mime_owned = mime.to_string();
        let prepared = tokio::task::spawn_blocking(move || prepare_upload(bytes, &mime_owned))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de upload: {}", e))??;

        let now = self.clock.now();
        let name = stored_filename(key, now.timestamp_millis(), &prepared.extension);
        let size = prepared.bytes.len() as i64;
        let storage_path = self.blobs.put(id, &name, prepared.bytes).await?;

        let entry = DocumentEntry {
            key: key.to_string(),
            storage_path,
            mime: prepared.mime,
            size,
            filename: original_filename.unwrap_or(name),
            uploaded_at: now,
        };

        // Outro upload pode ter gravado no meio; relê e aplica de novo
        let mut attempt = 1;
        loop {
            let mut request = self.load(id).await?;
            request.ensure_editable()?;
            let expected = request.status;
            request.upsert_document(entry.clone(), now);
            match self.store.save(&request, expected, None).await {
                Err(AppError::StatusConflict) if attempt < UPLOAD_SAVE_ATTEMPTS => {
                    tracing::warn!("🔁 Conflito ao gravar documento {} em {}, tentativa {}", key, id, attempt);
                    attempt += 1;
                }
                result => break result?,
            }
        }

        tracing::info!(
            "📎 Documento {} enviado para {} ({} -> {} bytes)",
            key,
            id,
            size_sent,
            size
        );
        Ok(entry)
    }

    pub async fn download_document(
        &self,
        id: Uuid,
        key: &str,
    ) -> Result<(DocumentEntry, Vec<u8>), AppError> {
        let request = self.load(id).await?;
        let entry = request
            .document(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Documento não encontrado".to_string()))?;

        let bytes = self
            .blobs
            .get(&entry.storage_path)
            .await?
            .ok_or_else(|| AppError::NotFound("Arquivo do documento não encontrado".to_string()))?;

        Ok((entry, bytes))
    }

    /// CONTRACT_SENT -> SIGNED.
    pub async fn sign(
        &self,
        id: Uuid,
        consent: &SignatureConsent,
        client: &ClientContext,
    ) -> Result<ActionResponse, AppError> {
        let mut request = self.load(id).await?;
        let expected = request.status;

        let entry = request.sign(consent, client, self.clock.now())?;
        self.store.save(&request, expected, Some(&entry)).await?;
        Self::log_transition(&entry);

        Ok(ActionResponse::new(request.status, "Contrato assinado com sucesso").with_id(id))
    }

    // =========================================================================
    //  CONTRATO
    // =========================================================================

    fn contract_path(id: Uuid) -> String {
        format!("{id}/{CONTRACT_FILE}")
    }

    fn build_contract(&self, request: &SignupRequest) -> String {
        let vehicle = request.vehicle.as_ref().map(|v| &v.0);
        let vars = contract_placeholders(request.payment_method, vehicle);
        fill_contract_template(self.templates.for_person(request.person_type), &vars)
    }

    pub async fn contract_text(&self, id: Uuid) -> Result<String, AppError> {
        let request = self.load(id).await?;
        if request.contract_pdf_url.is_none() {
            return Err(AppError::NotFound("Contrato ainda não gerado".to_string()));
        }

        let bytes = self
            .blobs
            .get(&Self::contract_path(id))
            .await?
            .ok_or_else(|| AppError::NotFound("Arquivo do contrato não encontrado".to_string()))?;

        String::from_utf8(bytes)
            .map_err(|e| AppError::DocumentGeneration(format!("Contrato ilegível: {e}")))
    }

    pub async fn contract_pdf(&self, id: Uuid) -> Result<Vec<u8>, AppError> {
        let text = self.contract_text(id).await?;
        let title = format!("Contrato de Prestação de Serviço - {}", id);
        self.documents
            .render_contract_pdf(title, text, self.sign_link(id))
            .await
    }

    // =========================================================================
    //  EQUIPE
    // =========================================================================

    pub async fn list_recent(&self) -> Result<Vec<SignupSummary>, AppError> {
        self.store.list_recent(ADMIN_LIST_LIMIT).await
    }

    /// Correção de dados pela equipe. Não muda status nem gera histórico.
    pub async fn admin_update(&self, id: Uuid, form: &SignupForm) -> Result<SignupRequest, AppError> {
        let mut request = self.load(id).await?;
        if request.status.is_terminal() {
            return Err(AppError::precondition(
                "Solicitação finalizada não pode ser alterada",
                request.status,
            ));
        }
        let expected = request.status;

        request.apply_form(form, self.clock.now());
        request.ensure_contact_present()?;
        self.store.save(&request, expected, None).await?;

        tracing::info!("✏️ Solicitação {} corrigida pela equipe", id);
        Ok(request)
    }

    /// SUBMITTED/NEEDS_FIX -> CONTRACT_SENT. Gera e guarda o contrato antes de gravar.
    pub async fn approve(&self, id: Uuid) -> Result<ActionResponse, AppError> {
        let mut request = self.load(id).await?;
        request.ensure_approvable()?;
        let expected = request.status;

        let contract = self.build_contract(&request);
        self.blobs.put(id, CONTRACT_FILE, contract.into_bytes()).await?;

        let contract_url = format!("/api/signup-requests/{id}/contract");
        let entry = request.approve(contract_url.clone(), self.clock.now())?;
        self.store.save(&request, expected, Some(&entry)).await?;
        Self::log_transition(&entry);

        let mut response = ActionResponse::new(request.status, "Solicitação aprovada. Contrato gerado.")
            .with_id(id);
        response.contract_url = Some(contract_url);
        response.sign_link = Some(self.sign_link(id));
        Ok(response)
    }

    /// SUBMITTED/NEEDS_FIX -> NEEDS_FIX.
    pub async fn reject(&self, id: Uuid, reason: &str) -> Result<ActionResponse, AppError> {
        let mut request = self.load(id).await?;
        let expected = request.status;

        let entry = request.reject(reason.trim(), self.clock.now())?;
        self.store.save(&request, expected, Some(&entry)).await?;
        Self::log_transition(&entry);

        Ok(ActionResponse::new(request.status, "Solicitação devolvida para correção").with_id(id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        common::clock::FixedClock,
        db::memory_store::{MemoryBlobStore, MemorySignupStore},
        models::{
            history::Actor,
            signup::{Address, SignupStatus, Vehicle},
        },
        services::document_policy::{
            CNPJ_CARD, PHOTO_ID, PROOF_OF_RESIDENCE, RESPONSIBLE_DOC, VEHICLE_DOC,
        },
    };

    pub(crate) struct Harness {
        pub service: SignupService,
        pub store: Arc<MemorySignupStore>,
    }

    pub(crate) fn harness() -> Harness {
        let store = Arc::new(MemorySignupStore::default());
        let clock = Arc::new(FixedClock::at("2026-02-14T10:00:00Z".parse().unwrap()));
        let templates = Arc::new(ContractTemplates::new(
            "Contrato PF {{monthly_price}} placa {{vehicle_placa}} {{cliente}}",
            "Contrato PJ {{monthly_price}}",
        ));
        let service = SignupService::new(
            store.clone(),
            Arc::new(MemoryBlobStore::default()),
            clock,
            templates,
            DocumentService::new("./fonts"),
            "http://localhost:3000".to_string(),
        );
        Harness { service, store }
    }

    pub(crate) fn individual_form() -> SignupForm {
        SignupForm {
            person_type: Some(PersonType::Individual),
            name: Some("João Pereira".into()),
            tax_id: Some("529.982.247-25".into()),
            email: Some("joao@exemplo.com".into()),
            phone: Some("94 99123-4567".into()),
            address: Some(Address {
                cep: "68500-000".into(),
                rua: "Av. Antônio Maia".into(),
                numero: "100".into(),
                complemento: String::new(),
                bairro: "Velha Marabá".into(),
                cidade: "Marabá".into(),
                uf: "PA".into(),
            }),
            vehicle: Some(Vehicle {
                tipo: "Moto".into(),
                placa: "QDA-1B23".into(),
                ..Vehicle::default()
            }),
            ..SignupForm::default()
        }
    }

    async fn upload(service: &SignupService, id: Uuid, keys: &[&str]) {
        for key in keys {
            service
                .upload_document(id, key, None, "application/pdf", b"%PDF-1.4".to_vec())
                .await
                .unwrap();
        }
    }

    /// Rascunho de pessoa física com os documentos de envio, já em SUBMITTED.
    pub(crate) async fn submitted_individual(service: &SignupService) -> Uuid {
        let draft = service
            .save(None, &individual_form(), SignupAction::Draft, false)
            .await
            .unwrap();
        let id = draft.id.unwrap();
        upload(service, id, &[PHOTO_ID, PROOF_OF_RESIDENCE, VEHICLE_DOC]).await;
        service
            .save(Some(id), &SignupForm::default(), SignupAction::Submit, true)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn draft_then_submit_assigns_first_protocolo() {
        let h = harness();
        let id = submitted_individual(&h.service).await;

        let detail = h.service.get_detail(id).await.unwrap();
        assert_eq!(detail.request.status, SignupStatus::Submitted);
        assert_eq!(detail.request.protocolo.as_deref(), Some("TRA-2026-0001"));
        assert_eq!(detail.history.len(), 1);
        assert_eq!(detail.history[0].actor, Actor::Customer);
        assert_eq!(detail.history[0].from_status, "DRAFT");
    }

    #[tokio::test]
    async fn drafts_need_contact_but_nothing_else() {
        let h = harness();
        let err = h
            .service
            .save(None, &SignupForm::default(), SignupAction::Draft, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let partial = SignupForm {
            email: Some("a@b.com".into()),
            phone: Some("94991234567".into()),
            ..SignupForm::default()
        };
        let saved = h.service.save(None, &partial, SignupAction::Draft, false).await.unwrap();
        assert_eq!(saved.status, "DRAFT");
        assert!(h.store.all_history().is_empty());
    }

    #[tokio::test]
    async fn submission_without_vehicle_doc_fails_but_approval_does_not_need_it() {
        let h = harness();
        let draft = h
            .service
            .save(None, &individual_form(), SignupAction::Draft, false)
            .await
            .unwrap();
        let id = draft.id.unwrap();
        upload(&h.service, id, &[PHOTO_ID, PROOF_OF_RESIDENCE]).await;

        let err = h
            .service
            .save(Some(id), &SignupForm::default(), SignupAction::Submit, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        // Chega a SUBMITTED por outro caminho (ex.: documento removido depois)
        let mut request = h.store.find(id).await.unwrap().unwrap();
        request.status = SignupStatus::Submitted;
        h.store.save(&request, SignupStatus::Draft, None).await.unwrap();

        let approved = h.service.approve(id).await.unwrap();
        assert_eq!(approved.status, "CONTRACT_SENT");
    }

    #[tokio::test]
    async fn company_submission_requires_cnpj_documents() {
        let h = harness();
        let form = SignupForm {
            person_type: Some(PersonType::Company),
            company_name: Some("Transportes Tocantins LTDA".into()),
            company_tax_id: Some("11.222.333/0001-81".into()),
            responsible_name: Some("Ana Souza".into()),
            responsible_tax_id: Some("52998224725".into()),
            ..individual_form()
        };
        let id = h.service.save(None, &form, SignupAction::Draft, false).await.unwrap().id.unwrap();
        upload(&h.service, id, &[PROOF_OF_RESIDENCE, VEHICLE_DOC, CNPJ_CARD]).await;

        let err = h
            .service
            .save(Some(id), &SignupForm::default(), SignupAction::Submit, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "documents"));

        upload(&h.service, id, &[RESPONSIBLE_DOC]).await;
        let submitted = h
            .service
            .save(Some(id), &SignupForm::default(), SignupAction::Submit, true)
            .await
            .unwrap();
        assert_eq!(submitted.status, "SUBMITTED");
    }

    #[tokio::test]
    async fn short_reject_reason_leaves_status_untouched() {
        let h = harness();
        let id = submitted_individual(&h.service).await;

        let err = h.service.reject(id, "muito curt").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let detail = h.service.get_detail(id).await.unwrap();
        assert_eq!(detail.request.status, SignupStatus::Submitted);
        assert_eq!(detail.history.len(), 1);
    }

    #[tokio::test]
    async fn reject_sets_reason_and_next_approval_clears_it() {
        let h = harness();
        let id = submitted_individual(&h.service).await;
        let reason = "Comprovante de residência ilegível";

        h.service.reject(id, reason).await.unwrap();
        let detail = h.service.get_detail(id).await.unwrap();
        assert_eq!(detail.request.status, SignupStatus::NeedsFix);
        assert_eq!(detail.request.reject_reason.as_deref(), Some(reason));
        assert_eq!(detail.history.len(), 2);
        assert_eq!(detail.history[0].actor, Actor::Admin);
        assert_eq!(detail.history[0].note.as_deref(), Some(reason));

        let approved = h.service.approve(id).await.unwrap();
        assert_eq!(approved.status, "CONTRACT_SENT");
        let detail = h.service.get_detail(id).await.unwrap();
        assert!(detail.request.reject_reason.is_none());
    }

    #[tokio::test]
    async fn approval_stores_a_retrievable_contract() {
        let h = harness();
        let id = submitted_individual(&h.service).await;

        let approved = h.service.approve(id).await.unwrap();
        assert_eq!(
            approved.contract_url.as_deref(),
            Some(format!("/api/signup-requests/{id}/contract").as_str())
        );
        assert!(approved.sign_link.unwrap().ends_with(&format!("?id={id}")));

        let text = h.service.contract_text(id).await.unwrap();
        assert_eq!(text, "Contrato PF 49,90 placa QDA1B23 {{cliente}}");
    }

    #[tokio::test]
    async fn approval_from_wrong_status_is_a_precondition_failure() {
        let h = harness();
        let draft = h
            .service
            .save(None, &individual_form(), SignupAction::Draft, false)
            .await
            .unwrap();
        let err = h.service.approve(draft.id.unwrap()).await.unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed { ref status, .. } if status == "DRAFT"));
    }

    #[tokio::test]
    async fn approval_with_missing_documents_names_them() {
        let h = harness();
        let id = submitted_individual(&h.service).await;
        let mut request = h.store.find(id).await.unwrap().unwrap();
        request.documents.0.retain(|d| d.key != PHOTO_ID);
        h.store.save(&request, SignupStatus::Submitted, None).await.unwrap();

        let err = h.service.approve(id).await.unwrap_err();
        assert!(err.to_string().contains(PHOTO_ID));
        assert!(h.service.contract_text(id).await.is_err());
    }

    #[tokio::test]
    async fn signing_requires_consent_and_records_ip() {
        let h = harness();
        let id = submitted_individual(&h.service).await;
        h.service.approve(id).await.unwrap();

        let client = ClientContext {
            ip: Some("198.51.100.4".into()),
            user_agent: Some("Mozilla/5.0".into()),
        };
        let err = h
            .service
            .sign(id, &SignatureConsent::default(), &client)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let signed = h
            .service
            .sign(id, &SignatureConsent::all_accepted(), &client)
            .await
            .unwrap();
        assert_eq!(signed.status, "SIGNED");

        let detail = h.service.get_detail(id).await.unwrap();
        assert!(detail.request.signed_at.is_some());
        assert!(detail.history[0].note.as_deref().unwrap().contains("198.51.100.4"));

        // Assinada: não aceita mais edição nem correção
        assert!(h
            .service
            .save(Some(id), &individual_form(), SignupAction::Draft, false)
            .await
            .is_err());
        assert!(h.service.admin_update(id, &individual_form()).await.is_err());
    }

    #[tokio::test]
    async fn submitted_requests_are_not_editable_by_the_customer() {
        let h = harness();
        let id = submitted_individual(&h.service).await;
        let err = h
            .service
            .save(Some(id), &individual_form(), SignupAction::Draft, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed { .. }));

        let err = h
            .service
            .upload_document(id, PHOTO_ID, None, "application/pdf", b"x".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn reupload_replaces_the_document() {
        let h = harness();
        let id = h
            .service
            .save(None, &individual_form(), SignupAction::Draft, false)
            .await
            .unwrap()
            .id
            .unwrap();
        upload(&h.service, id, &[PHOTO_ID]).await;
        h.service
            .upload_document(id, PHOTO_ID, Some("rg.txt".into()), "text/plain", b"novo".to_vec())
            .await
            .unwrap();

        let detail = h.service.get_detail(id).await.unwrap();
        assert_eq!(detail.request.documents.0.len(), 1);

        let (entry, bytes) = h.service.download_document(id, PHOTO_ID).await.unwrap();
        assert_eq!(entry.filename, "rg.txt");
        assert_eq!(bytes, b"novo");
    }

    #[tokio::test]
    async fn concurrent_approvals_commit_once() {
        let h = harness();
        let id = submitted_individual(&h.service).await;

        let (a, b) = tokio::join!(h.service.approve(id), h.service.approve(id));
        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);

        let transitions = h
            .store
            .all_history()
            .into_iter()
            .filter(|e| e.to_status == "CONTRACT_SENT")
            .count();
        assert_eq!(transitions, 1);
    }

    #[tokio::test]
    async fn concurrent_uploads_keep_both_documents() {
        let h = harness();
        let id = h
            .service
            .save(None, &individual_form(), SignupAction::Draft, false)
            .await
            .unwrap()
            .id
            .unwrap();

        let pdf = || b"%PDF-1.4".to_vec();
        let (a, b) = tokio::join!(
            h.service.upload_document(id, PHOTO_ID, None, "application/pdf", pdf()),
            h.service.upload_document(id, PROOF_OF_RESIDENCE, None, "application/pdf", pdf()),
        );
        a.unwrap();
        b.unwrap();

        let stored = h.store.find(id).await.unwrap().unwrap();
        let mut keys: Vec<_> = stored.documents.0.iter().map(|d| d.key.as_str()).collect();
        keys.sort_unstable();
        let mut expected = vec![PHOTO_ID, PROOF_OF_RESIDENCE];
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn edit_racing_a_submit_commits_only_one() {
        let h = harness();
        let draft = h
            .service
            .save(None, &individual_form(), SignupAction::Draft, false)
            .await
            .unwrap();
        let id = draft.id.unwrap();
        upload(&h.service, id, &[PHOTO_ID, PROOF_OF_RESIDENCE, VEHICLE_DOC]).await;

        let edit = SignupForm {
            name: Some("João Pereira da Silva".into()),
            ..individual_form()
        };
        let empty = SignupForm::default();
        let (edited, submitted) = tokio::join!(
            h.service.save(Some(id), &edit, SignupAction::Draft, false),
            h.service.save(Some(id), &empty, SignupAction::Submit, true),
        );

        let stored = h.store.find(id).await.unwrap().unwrap();
        let submits = h
            .store
            .all_history()
            .into_iter()
            .filter(|e| e.to_status == "SUBMITTED")
            .count();
        match (edited, submitted) {
            (Ok(_), Err(AppError::StatusConflict)) => {
                assert_eq!(stored.status, SignupStatus::Draft);
                assert_eq!(stored.name.as_deref(), Some("João Pereira da Silva"));
                assert_eq!(submits, 0);
            }
            (Err(AppError::StatusConflict), Ok(_)) => {
                assert_eq!(stored.status, SignupStatus::Submitted);
                assert_eq!(stored.name.as_deref(), Some("João Pereira"));
                assert_eq!(submits, 1);
            }
            other => panic!("exatamente uma gravação deveria vencer: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stale_snapshot_is_rejected() {
        let h = harness();
        let id = h
            .service
            .save(None, &individual_form(), SignupAction::Draft, false)
            .await
            .unwrap()
            .id
            .unwrap();

        let stale = h.store.find(id).await.unwrap().unwrap();
        let mut fresh = stale.clone();
        fresh.phone = "94 99000-0000".into();
        h.store.save(&fresh, SignupStatus::Draft, None).await.unwrap();

        let err = h.store.save(&stale, SignupStatus::Draft, None).await.unwrap_err();
        assert!(matches!(err, AppError::StatusConflict));
        let stored = h.store.find(id).await.unwrap().unwrap();
        assert_eq!(stored.phone, "94 99000-0000");
        assert_eq!(stored.version, stale.version + 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let h = harness();
        assert!(matches!(
            h.service.get_detail(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
