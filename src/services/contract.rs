// src/services/contract.rs

use std::{collections::BTreeMap, path::Path};

use rust_decimal::Decimal;

use crate::models::{
    signup::{PaymentMethod, PersonType, Vehicle},
    subscription::{EQUIPMENT_FEE_CENTS, MIN_TERM_MONTHS, RETURN_WINDOW_DAYS},
};

pub const FORO_CITY: &str = "Marabá";
pub const FORO_UF: &str = "PA";

/// Formata centavos em reais no padrão brasileiro, sem símbolo: `4990` -> `49,90`.
pub fn format_brl(cents: i64) -> String {
    Decimal::new(cents, 2).to_string().replace('.', ",")
}

/// Link público de assinatura. Não carrega segredo: quem tem o id pode assinar.
pub fn sign_link(base_url: &str, id: uuid::Uuid) -> String {
    format!("{}/cadastro/assinatura?id={id}", base_url.trim_end_matches('/'))
}

/// Os dois textos de contrato (pessoa física e jurídica), lidos uma vez no start-up.
#[derive(Debug, Clone)]
pub struct ContractTemplates {
    individual: String,
    company: String,
}

impl ContractTemplates {
    pub fn new(individual: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            individual: individual.into(),
            company: company.into(),
        }
    }

    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Falha ao ler template {}: {}", path.display(), e))
        };
        Ok(Self::new(read("contract_pf.txt")?, read("contract_pj.txt")?))
    }

    pub fn for_person(&self, person_type: PersonType) -> &str {
        match person_type {
            PersonType::Individual => &self.individual,
            PersonType::Company => &self.company,
        }
    }
}

/// Valores padrão do contrato, mais os dados do veículo quando houver.
pub fn contract_placeholders(
    payment_method: PaymentMethod,
    vehicle: Option<&Vehicle>,
) -> BTreeMap<&'static str, String> {
    let mut vars = BTreeMap::new();
    vars.insert("monthly_card_price", format_brl(PaymentMethod::Card.monthly_price_cents()));
    vars.insert("monthly_boleto_price", format_brl(PaymentMethod::Boleto.monthly_price_cents()));
    vars.insert("monthly_price", format_brl(payment_method.monthly_price_cents()));
    vars.insert(
        "payment_method",
        match payment_method {
            PaymentMethod::Card => "cartão de crédito",
            PaymentMethod::Boleto => "boleto bancário",
        }
        .to_string(),
    );
    vars.insert("min_term_months", MIN_TERM_MONTHS.to_string());
    vars.insert("return_days", RETURN_WINDOW_DAYS.to_string());
    vars.insert("equipment_fee", format_brl(EQUIPMENT_FEE_CENTS));
    vars.insert("foro_city", FORO_CITY.to_string());
    vars.insert("foro_uf", FORO_UF.to_string());

    let blank = Vehicle::default();
    let v = vehicle.unwrap_or(&blank);
    vars.insert("vehicle_tipo", v.tipo.clone());
    vars.insert("vehicle_placa", v.placa.clone());
    vars.insert("vehicle_marca_modelo", v.marca_modelo.clone());
    vars.insert("vehicle_ano", v.ano.clone());
    vars.insert("vehicle_cor", v.cor.clone());
    vars.insert("vehicle_renavam", v.renavam.clone());
    vars.insert("vehicle_chassi", v.chassi.clone());
    vars
}

/// Substitui cada `{{nome}}` conhecido em todas as ocorrências, numa única
/// passada sobre o modelo: valores inseridos não são reinterpretados.
/// Marcadores sem valor ficam no texto como estão.
pub fn fill_contract_template(template: &str, vars: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                match vars.get(&after[..end]) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
