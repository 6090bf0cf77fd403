// src/models/signup.rs

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        validation::{
            is_valid_email, is_valid_phone_br, is_valid_plate, is_valid_tax_id_company,
            is_valid_tax_id_individual, normalize_digits, normalize_email, normalize_phone_br,
            normalize_plate,
        },
    },
    models::{
        history::{Actor, StatusHistoryEntry},
        signature::{ClientContext, SignatureConsent},
    },
    services::document_policy::{self, PolicyStage},
};

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "person_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonType {
    #[serde(alias = "PF")]
    Individual,
    #[serde(alias = "PJ")]
    Company,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "cartao")]
    #[sqlx(rename = "cartao")]
    Card,
    #[serde(rename = "boleto")]
    #[sqlx(rename = "boleto")]
    Boleto,
}

impl PaymentMethod {
    pub const fn monthly_price_cents(self) -> i64 {
        match self {
            PaymentMethod::Card => 4990,
            PaymentMethod::Boleto => 5990,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "signup_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignupStatus {
    Draft,
    Submitted,
    NeedsFix,
    // Legado: não é alcançado pelas transições atuais
    Approved,
    ContractSent,
    Signed,
    Expired,
}

impl SignupStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::NeedsFix => "NEEDS_FIX",
            Self::Approved => "APPROVED",
            Self::ContractSent => "CONTRACT_SENT",
            Self::Signed => "SIGNED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Só rascunhos e solicitações devolvidas aceitam edição do cliente.
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::NeedsFix)
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Signed | Self::Expired)
    }

    /// Status em que a equipe pode aprovar ou reprovar.
    pub const fn is_under_review(&self) -> bool {
        matches!(self, Self::Submitted | Self::NeedsFix)
    }
}

impl fmt::Display for SignupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Sub-registros (sempre substituídos por inteiro) ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[schema(example = "68500-000")]
    pub cep: String,
    #[schema(example = "Rua das Flores")]
    pub rua: String,
    #[schema(example = "123")]
    pub numero: String,
    pub complemento: String,
    #[schema(example = "Centro")]
    pub bairro: String,
    #[schema(example = "Marabá")]
    pub cidade: String,
    #[schema(example = "PA")]
    pub uf: String,
}

impl Address {
    pub fn trimmed(&self) -> Self {
        Self {
            cep: self.cep.trim().to_string(),
            rua: self.rua.trim().to_string(),
            numero: self.numero.trim().to_string(),
            complemento: self.complemento.trim().to_string(),
            bairro: self.bairro.trim().to_string(),
            cidade: self.cidade.trim().to_string(),
            uf: self.uf.trim().to_uppercase(),
        }
    }

    /// Complemento é o único campo opcional.
    pub fn is_complete(&self) -> bool {
        [&self.cep, &self.rua, &self.numero, &self.bairro, &self.cidade, &self.uf]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Vehicle {
    #[schema(example = "Carro")]
    pub tipo: String,
    #[schema(example = "ABC1D23")]
    pub placa: String,
    #[schema(example = "Fiat Strada")]
    pub marca_modelo: String,
    #[schema(example = "2022")]
    pub ano: String,
    pub cor: String,
    pub renavam: String,
    pub chassi: String,
}

impl Vehicle {
    pub fn trimmed(&self) -> Self {
        Self {
            tipo: self.tipo.trim().to_string(),
            placa: normalize_plate(&self.placa),
            marca_modelo: self.marca_modelo.trim().to_string(),
            ano: self.ano.trim().to_string(),
            cor: self.cor.trim().to_string(),
            renavam: self.renavam.trim().to_string(),
            chassi: self.chassi.trim().to_uppercase(),
        }
    }
}

/// Documento enviado. `key` é único por tipo; reenviar substitui.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    #[schema(example = "doc_foto")]
    pub key: String,
    #[schema(example = "8f7c.../doc_foto_1760000000000.jpg")]
    pub storage_path: String,
    #[schema(example = "image/jpeg")]
    pub mime: String,
    pub size: i64,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

// --- Solicitação de cadastro ---

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub id: Uuid,
    pub person_type: PersonType,

    // Pessoa física
    pub name: Option<String>,
    #[schema(example = "52998224725")]
    pub tax_id: Option<String>,

    // Pessoa jurídica
    pub company_name: Option<String>,
    #[schema(example = "11222333000181")]
    pub company_tax_id: Option<String>,
    pub responsible_name: Option<String>,
    pub responsible_tax_id: Option<String>,

    pub birth_date: Option<NaiveDate>,
    pub email: String,
    pub phone: String,

    #[schema(value_type = Option<Address>)]
    pub address: Option<Json<Address>>,
    #[schema(value_type = Option<Vehicle>)]
    pub vehicle: Option<Json<Vehicle>>,
    #[schema(value_type = Vec<DocumentEntry>)]
    pub documents: Json<Vec<DocumentEntry>>,

    pub payment_method: PaymentMethod,
    #[schema(example = 4990)]
    pub monthly_price_cents: i64,

    pub status: SignupStatus,
    pub reject_reason: Option<String>,
    #[schema(example = "/api/signup-requests/8f7c.../contract")]
    pub contract_pdf_url: Option<String>,
    #[schema(example = "TRA-2026-0001")]
    pub protocolo: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,

    // Versão lida; cada gravação exige a mesma versão no banco e a incrementa
    #[serde(skip)]
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dados enviados pelo cliente. Campo presente substitui o valor inteiro;
/// campo ausente preserva o atual.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    #[serde(alias = "type")]
    pub person_type: Option<PersonType>,
    pub name: Option<String>,
    #[serde(alias = "cpf")]
    pub tax_id: Option<String>,
    pub company_name: Option<String>,
    #[serde(alias = "cnpj")]
    pub company_tax_id: Option<String>,
    pub responsible_name: Option<String>,
    #[serde(alias = "responsibleCpf")]
    pub responsible_tax_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "addressJson")]
    pub address: Option<Address>,
    #[serde(alias = "vehicleJson")]
    pub vehicle: Option<Vehicle>,
    #[serde(alias = "formaPagamento")]
    pub payment_method: Option<PaymentMethod>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn clean(value: &Option<String>) -> Option<String> {
    non_empty(value).map(str::to_string)
}

impl SignupRequest {
    pub fn new_draft(id: Uuid, person_type: PersonType, now: DateTime<Utc>) -> Self {
        let payment_method = PaymentMethod::default();
        Self {
            id,
            person_type,
            name: None,
            tax_id: None,
            company_name: None,
            company_tax_id: None,
            responsible_name: None,
            responsible_tax_id: None,
            birth_date: None,
            email: String::new(),
            phone: String::new(),
            address: None,
            vehicle: None,
            documents: Json(Vec::new()),
            payment_method,
            monthly_price_cents: payment_method.monthly_price_cents(),
            status: SignupStatus::Draft,
            reject_reason: None,
            contract_pdf_url: None,
            protocolo: None,
            signed_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Nome exibido: pessoa física ou razão social.
    pub fn display_name(&self) -> &str {
        match self.person_type {
            PersonType::Individual => self.name.as_deref(),
            PersonType::Company => self.company_name.as_deref(),
        }
        .unwrap_or("")
    }

    pub fn document_keys(&self) -> BTreeSet<&str> {
        self.documents.0.iter().map(|d| d.key.as_str()).collect()
    }

    pub fn document(&self, key: &str) -> Option<&DocumentEntry> {
        self.documents.0.iter().find(|d| d.key == key)
    }

    /// Substitui qualquer documento anterior com a mesma chave.
    pub fn upsert_document(&mut self, entry: DocumentEntry, now: DateTime<Utc>) {
        self.documents.0.retain(|d| d.key != entry.key);
        self.documents.0.push(entry);
        self.updated_at = now;
    }

    pub fn ensure_editable(&self) -> Result<(), AppError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(AppError::precondition(
                "Solicitação não pode mais ser editada",
                self.status,
            ))
        }
    }

    /// Aplica o formulário: cada campo presente é substituído por inteiro.
    pub fn apply_form(&mut self, form: &SignupForm, now: DateTime<Utc>) {
        if let Some(person_type) = form.person_type {
            self.person_type = person_type;
        }
        if form.name.is_some() {
            self.name = clean(&form.name);
        }
        if form.tax_id.is_some() {
            self.tax_id = clean(&form.tax_id);
        }
        if form.company_name.is_some() {
            self.company_name = clean(&form.company_name);
        }
        if form.company_tax_id.is_some() {
            self.company_tax_id = clean(&form.company_tax_id);
        }
        if form.responsible_name.is_some() {
            self.responsible_name = clean(&form.responsible_name);
        }
        if form.responsible_tax_id.is_some() {
            self.responsible_tax_id = clean(&form.responsible_tax_id);
        }
        if form.birth_date.is_some() {
            self.birth_date = form.birth_date;
        }
        if let Some(email) = &form.email {
            self.email = email.trim().to_string();
        }
        if let Some(phone) = &form.phone {
            self.phone = phone.trim().to_string();
        }
        if let Some(address) = &form.address {
            self.address = Some(Json(address.trimmed()));
        }
        if let Some(vehicle) = &form.vehicle {
            self.vehicle = Some(Json(vehicle.trimmed()));
        }
        if let Some(method) = form.payment_method {
            self.payment_method = method;
            self.monthly_price_cents = method.monthly_price_cents();
        }
        self.updated_at = now;
    }

    /// Contato mínimo exigido em qualquer gravação.
    pub fn ensure_contact_present(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() || self.phone.trim().is_empty() {
            return Err(AppError::validation("contact", "E-mail e celular são obrigatórios"));
        }
        Ok(())
    }

    /// Regras de envio: identidade por tipo de pessoa, contato válido,
    /// endereço completo, documentos de envio e aceite LGPD.
    /// Normaliza CPF/CNPJ, e-mail, celular e placa.
    pub fn check_submission(&mut self, accepted_lgpd: bool) -> Result<(), AppError> {
        match self.person_type {
            PersonType::Individual => {
                let (Some(_), Some(cpf)) = (non_empty(&self.name), non_empty(&self.tax_id)) else {
                    return Err(AppError::validation(
                        "identity",
                        "Nome e CPF são obrigatórios para Pessoa Física",
                    ));
                };
                if !is_valid_tax_id_individual(cpf) {
                    return Err(AppError::validation("taxId", "CPF inválido"));
                }
                self.tax_id = Some(normalize_digits(cpf));
            }
            PersonType::Company => {
                let (Some(_), Some(cnpj), Some(_), Some(cpf)) = (
                    non_empty(&self.company_name),
                    non_empty(&self.company_tax_id),
                    non_empty(&self.responsible_name),
                    non_empty(&self.responsible_tax_id),
                ) else {
                    return Err(AppError::validation(
                        "identity",
                        "Razão social, CNPJ, nome e CPF do responsável são obrigatórios para PJ",
                    ));
                };
                if !is_valid_tax_id_company(cnpj) {
                    return Err(AppError::validation("companyTaxId", "CNPJ inválido"));
                }
                if !is_valid_tax_id_individual(cpf) {
                    return Err(AppError::validation(
                        "responsibleTaxId",
                        "CPF do responsável inválido",
                    ));
                }
                self.company_tax_id = Some(normalize_digits(cnpj));
                self.responsible_tax_id = Some(normalize_digits(cpf));
            }
        }

        if !is_valid_email(&self.email) {
            return Err(AppError::validation("email", "E-mail inválido"));
        }
        if !is_valid_phone_br(&self.phone) {
            return Err(AppError::validation("phone", "Celular inválido"));
        }
        self.email = normalize_email(&self.email);
        self.phone = normalize_phone_br(&self.phone);

        if !self.address.as_ref().is_some_and(|a| a.is_complete()) {
            return Err(AppError::validation("address", "Endereço completo é obrigatório"));
        }

        if let Some(vehicle) = &self.vehicle {
            if !vehicle.placa.is_empty() && !is_valid_plate(&vehicle.placa) {
                return Err(AppError::validation("vehicle.placa", "Placa inválida"));
            }
        }

        if !document_policy::is_complete(
            self.person_type,
            PolicyStage::Submission,
            self.document_keys(),
        ) {
            return Err(AppError::validation(
                "documents",
                "Todos os documentos obrigatórios devem ser enviados",
            ));
        }

        if !accepted_lgpd {
            return Err(AppError::validation(
                "acceptedLgpd",
                "Aceite do tratamento de dados LGPD é obrigatório",
            ));
        }

        Ok(())
    }

    /// DRAFT/NEEDS_FIX -> SUBMITTED. O protocolo só é gravado se ainda não existir.
    pub fn submit(
        &mut self,
        protocolo: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StatusHistoryEntry, AppError> {
        self.ensure_editable()?;

        let from = self.status;
        self.status = SignupStatus::Submitted;
        if self.protocolo.is_none() {
            self.protocolo = protocolo;
        }
        self.reject_reason = None;
        self.updated_at = now;

        Ok(StatusHistoryEntry::record(
            self.id,
            from.as_str(),
            self.status.as_str(),
            Actor::Customer,
            Some("Enviado para análise".to_string()),
            now,
        ))
    }

    /// Guarda da aprovação: status em análise e documentos de aprovação completos.
    pub fn ensure_approvable(&self) -> Result<(), AppError> {
        if !self.status.is_under_review() {
            return Err(AppError::precondition("Aprovação não permitida", self.status));
        }

        let missing = document_policy::missing_documents(
            self.person_type,
            PolicyStage::Approval,
            self.document_keys(),
        );
        if !missing.is_empty() {
            return Err(AppError::precondition(
                format!("Documentos obrigatórios ausentes: {}", missing.join(", ")),
                self.status,
            ));
        }
        Ok(())
    }

    /// SUBMITTED/NEEDS_FIX -> CONTRACT_SENT, com o contrato já armazenado.
    pub fn approve(
        &mut self,
        contract_url: String,
        now: DateTime<Utc>,
    ) -> Result<StatusHistoryEntry, AppError> {
        self.ensure_approvable()?;

        let from = self.status;
        self.status = SignupStatus::ContractSent;
        self.contract_pdf_url = Some(contract_url);
        self.reject_reason = None;
        self.updated_at = now;

        Ok(StatusHistoryEntry::record(
            self.id,
            from.as_str(),
            self.status.as_str(),
            Actor::Admin,
            Some("Aprovado. Contrato gerado. Aguardando assinatura.".to_string()),
            now,
        ))
    }

    /// SUBMITTED/NEEDS_FIX -> NEEDS_FIX. O motivo tem entre 20 e 500 caracteres.
    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<StatusHistoryEntry, AppError> {
        let len = reason.chars().count();
        if !(REJECT_REASON_MIN..=REJECT_REASON_MAX).contains(&len) {
            return Err(AppError::validation(
                "reason",
                format!(
                    "Motivo da reprovação deve ter entre {REJECT_REASON_MIN} e {REJECT_REASON_MAX} caracteres"
                ),
            ));
        }
        if !self.status.is_under_review() {
            return Err(AppError::precondition("Reprovação não permitida", self.status));
        }

        let from = self.status;
        self.status = SignupStatus::NeedsFix;
        self.reject_reason = Some(reason.to_string());
        self.updated_at = now;

        Ok(StatusHistoryEntry::record(
            self.id,
            from.as_str(),
            self.status.as_str(),
            Actor::Admin,
            Some(reason.to_string()),
            now,
        ))
    }

    /// CONTRACT_SENT -> SIGNED.
    pub fn sign(
        &mut self,
        consent: &SignatureConsent,
        client: &ClientContext,
        now: DateTime<Utc>,
    ) -> Result<StatusHistoryEntry, AppError> {
        consent.ensure_complete()?;
        if self.status != SignupStatus::ContractSent {
            return Err(AppError::precondition("Assinatura não permitida", self.status));
        }

        let from = self.status;
        self.status = SignupStatus::Signed;
        self.signed_at.get_or_insert(now);
        self.updated_at = now;

        Ok(StatusHistoryEntry::record(
            self.id,
            from.as_str(),
            self.status.as_str(),
            Actor::Customer,
            Some(format!(
                "Assinatura eletrônica. IP: {}",
                client.ip.as_deref().unwrap_or("N/A")
            )),
            now,
        ))
    }
}

/// O que o cliente pediu ao gravar o formulário.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SignupAction {
    #[default]
    Draft,
    Submit,
}

pub const REJECT_REASON_MIN: usize = 20;
pub const REJECT_REASON_MAX: usize = 500;

/// Formata o protocolo humano: `TRA-<ano>-<seq com 4 dígitos>`.
pub fn format_protocolo(year: i32, seq: i32) -> String {
    format!("TRA-{year}-{seq:04}")
}

// --- Leituras ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupSummary {
    pub id: Uuid,
    pub person_type: PersonType,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub email: String,
    pub status: SignupStatus,
    pub protocolo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&SignupRequest> for SignupSummary {
    fn from(r: &SignupRequest) -> Self {
        Self {
            id: r.id,
            person_type: r.person_type,
            name: r.name.clone(),
            company_name: r.company_name.clone(),
            email: r.email.clone(),
            status: r.status,
            protocolo: r.protocolo.clone(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupDetail {
    #[serde(flatten)]
    pub request: SignupRequest,
    pub history: Vec<StatusHistoryEntry>,
}
