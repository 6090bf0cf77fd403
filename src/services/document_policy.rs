// src/services/document_policy.rs

//! Documentos obrigatórios por tipo de pessoa.
//!
//! O envio exige o documento do veículo; a aprovação não. Os dois limites são
//! distintos de propósito e não devem ser unificados.

use std::collections::BTreeSet;

use crate::models::signup::PersonType;

pub const PHOTO_ID: &str = "doc_foto";
pub const PROOF_OF_RESIDENCE: &str = "comprovante_residencia";
pub const VEHICLE_DOC: &str = "doc_veiculo";
pub const CNPJ_CARD: &str = "cartao_cnpj";
pub const RESPONSIBLE_DOC: &str = "doc_responsavel";

/// Todas as chaves aceitas pelo upload.
pub const KNOWN_KEYS: [&str; 5] = [
    PHOTO_ID,
    PROOF_OF_RESIDENCE,
    VEHICLE_DOC,
    CNPJ_CARD,
    RESPONSIBLE_DOC,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyStage {
    Submission,
    Approval,
}

pub fn required_documents(person_type: PersonType, stage: PolicyStage) -> &'static [&'static str] {
    match (person_type, stage) {
        (PersonType::Individual, PolicyStage::Submission) => {
            &[PHOTO_ID, PROOF_OF_RESIDENCE, VEHICLE_DOC]
        }
        (PersonType::Individual, PolicyStage::Approval) => &[PHOTO_ID, PROOF_OF_RESIDENCE],
        (PersonType::Company, PolicyStage::Submission) => {
            &[CNPJ_CARD, RESPONSIBLE_DOC, PROOF_OF_RESIDENCE, VEHICLE_DOC]
        }
        (PersonType::Company, PolicyStage::Approval) => {
            &[CNPJ_CARD, RESPONSIBLE_DOC, PROOF_OF_RESIDENCE]
        }
    }
}

pub fn is_known_key(key: &str) -> bool {
    KNOWN_KEYS.contains(&key)
}

/// Chaves obrigatórias ausentes, na ordem da lista de exigências.
/// As chaves enviadas são comparadas como conjunto: reenvios não contam duas vezes.
pub fn missing_documents<'a, I>(person_type: PersonType, stage: PolicyStage, uploaded: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = &'a str>,
{
    let uploaded: BTreeSet<&str> = uploaded.into_iter().collect();
    required_documents(person_type, stage)
        .iter()
        .copied()
        .filter(|key| !uploaded.contains(key))
        .collect()
}

pub fn is_complete<'a, I>(person_type: PersonType, stage: PolicyStage, uploaded: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    missing_documents(person_type, stage, uploaded).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn individual_thresholds_differ_by_vehicle_doc() {
        let uploaded = [PHOTO_ID, PROOF_OF_RESIDENCE];
        assert!(!is_complete(PersonType::Individual, PolicyStage::Submission, uploaded));
        assert!(is_complete(PersonType::Individual, PolicyStage::Approval, uploaded));
        assert_eq!(
            missing_documents(PersonType::Individual, PolicyStage::Submission, uploaded),
            vec![VEHICLE_DOC]
        );
    }

    #[test]
    fn company_thresholds_differ_by_vehicle_doc() {
        let uploaded = [CNPJ_CARD, RESPONSIBLE_DOC, PROOF_OF_RESIDENCE];
        assert!(!is_complete(PersonType::Company, PolicyStage::Submission, uploaded));
        assert!(is_complete(PersonType::Company, PolicyStage::Approval, uploaded));
    }

    #[test]
    fn company_does_not_accept_individual_photo_id() {
        let uploaded = [PHOTO_ID, PROOF_OF_RESIDENCE, VEHICLE_DOC];
        let missing = missing_documents(PersonType::Company, PolicyStage::Submission, uploaded);
        assert_eq!(missing, vec![CNPJ_CARD, RESPONSIBLE_DOC]);
    }

    #[test]
    fn duplicate_keys_count_once() {
        let uploaded = [PHOTO_ID, PHOTO_ID, PHOTO_ID];
        assert_eq!(
            missing_documents(PersonType::Individual, PolicyStage::Approval, uploaded),
            vec![PROOF_OF_RESIDENCE]
        );
    }

    #[test]
    fn known_keys() {
        assert!(is_known_key("cartao_cnpj"));
        assert!(!is_known_key("selfie"));
    }
}
