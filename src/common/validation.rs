// src/common/validation.rs

//! Validadores de formulários brasileiros: CPF, CNPJ, e-mail, celular e placa.
//!
//! Funções puras, sem I/O. As versões `validate_*` adaptam as regras para o
//! `#[validate(custom(...))]` dos payloads.

use validator::ValidationError;

/// Mantém apenas os dígitos.
pub fn normalize_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn all_equal(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn to_digits(input: &str) -> Vec<u32> {
    normalize_digits(input)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect()
}

// --- CPF ---

fn cpf_check_digit(digits: &[u32]) -> u32 {
    let first_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (first_weight - i as u32))
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 { 0 } else { rest }
}

/// CPF com os dois dígitos verificadores. Sequências repetidas são sempre inválidas.
pub fn is_valid_tax_id_individual(value: &str) -> bool {
    let digits = to_digits(value);
    if digits.len() != 11 || all_equal(&digits) {
        return false;
    }

    cpf_check_digit(&digits[..9]) == digits[9] && cpf_check_digit(&digits[..10]) == digits[10]
}

// --- CNPJ ---

fn cnpj_check_digit(digits: &[u32]) -> u32 {
    // Pesos 2..9 da direita para a esquerda, reiniciando em 2
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| d * (2 + (i as u32 % 8)))
        .sum();
    let rest = sum % 11;
    if rest < 2 { 0 } else { 11 - rest }
}

/// CNPJ (14 dígitos) com os dois dígitos verificadores.
pub fn is_valid_tax_id_company(value: &str) -> bool {
    let digits = to_digits(value);
    if digits.len() != 14 || all_equal(&digits) {
        return false;
    }

    cnpj_check_digit(&digits[..12]) == digits[12] && cnpj_check_digit(&digits[..13]) == digits[13]
}

// --- E-mail ---

pub fn normalize_email(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Validação prática (não RFC completa): um único `@`, partes não vazias,
/// domínio com ponto e sem espaços.
pub fn is_valid_email(value: &str) -> bool {
    let email = normalize_email(value);
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return false;
    }

    domain.split('.').all(|label| !label.is_empty())
        && domain.rsplit('.').next().is_some_and(|tld| tld.len() >= 2)
}

// --- Celular (WhatsApp BR) ---

/// Normaliza para E.164 sem o `+`: 55 + DDD + número.
pub fn normalize_phone_br(input: &str) -> String {
    let digits = normalize_digits(input);
    if digits.len() == 11 {
        return format!("55{digits}");
    }
    digits
}

/// Aceita `DD9XXXXXXXX` (11 dígitos) ou `55DD9XXXXXXXX` (13 dígitos).
pub fn is_valid_phone_br(value: &str) -> bool {
    let digits = normalize_digits(value);
    let local = match digits.len() {
        11 => digits.as_str(),
        13 if digits.starts_with("55") => &digits[2..],
        _ => return false,
    };
    local.as_bytes()[2] == b'9'
}

// --- Placa ---

pub fn normalize_plate(input: &str) -> String {
    input
        .trim()
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Placa antiga (`ABC1234`) ou Mercosul (`ABC1D23`).
pub fn is_valid_plate(value: &str) -> bool {
    let plate = normalize_plate(value);
    let chars: Vec<char> = plate.chars().collect();
    if chars.len() != 7 {
        return false;
    }

    chars[..3].iter().all(|c| c.is_ascii_uppercase())
        && chars[3].is_ascii_digit()
        && (chars[4].is_ascii_digit() || chars[4].is_ascii_uppercase())
        && chars[5..].iter().all(|c| c.is_ascii_digit())
}

// ---
// Adaptadores para o `validator`
// ---

fn failure(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    if is_valid_tax_id_individual(value) {
        Ok(())
    } else {
        Err(failure("cpf", "CPF inválido."))
    }
}

pub fn validate_email_br(value: &str) -> Result<(), ValidationError> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(failure("email", "E-mail inválido."))
    }
}

pub fn validate_phone_br(value: &str) -> Result<(), ValidationError> {
    if is_valid_phone_br(value) {
        Ok(())
    } else {
        Err(failure("phone", "Celular inválido. Use DDD + 9 + número."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_checksum() {
        assert!(is_valid_tax_id_individual("52998224725"));
        assert!(is_valid_tax_id_individual("529.982.247-25"));
        assert!(!is_valid_tax_id_individual("52998224724"));
        assert!(!is_valid_tax_id_individual("52998224735"));
        assert!(!is_valid_tax_id_individual("5299822472"));
    }

    #[test]
    fn cpf_rejects_repeated_sequences() {
        assert!(!is_valid_tax_id_individual("00000000000"));
        assert!(!is_valid_tax_id_individual("11111111111"));
        assert!(!is_valid_tax_id_individual("999.999.999-99"));
    }

    #[test]
    fn cnpj_checksum() {
        assert!(is_valid_tax_id_company("11.222.333/0001-81"));
        assert!(!is_valid_tax_id_company("11.222.333/0001-80"));
        assert!(!is_valid_tax_id_company("00000000000000"));
        assert!(!is_valid_tax_id_company("1122233300018"));
    }

    #[test]
    fn email_rules() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("  Cliente@Exemplo.COM.br "));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn phone_rules() {
        assert!(is_valid_phone_br("94999999999"));
        assert!(is_valid_phone_br("+55 94 99999-9999"));
        assert!(is_valid_phone_br("(94) 9 9999-9999"));
        assert!(!is_valid_phone_br("999999999"));
        assert!(!is_valid_phone_br("9433334444"));
        assert!(!is_valid_phone_br("94833334444"));
        assert!(!is_valid_phone_br("4494999999999"));
    }

    #[test]
    fn phone_normalizes_to_e164_digits() {
        assert_eq!(normalize_phone_br("(94) 9 9999-9999"), "5594999999999");
        assert_eq!(normalize_phone_br("+55 94 99999-9999"), "5594999999999");
    }

    #[test]
    fn plate_patterns() {
        assert!(is_valid_plate("ABC1234"));
        assert!(is_valid_plate("ABC1D23"));
        assert!(is_valid_plate("abc-1234"));
        assert!(is_valid_plate("abc 1234"));
        assert!(!is_valid_plate("AB12C34"));
        assert!(!is_valid_plate("AAAA123"));
        assert!(!is_valid_plate("ABC12D3"));
        assert!(!is_valid_plate(""));
        assert_eq!(normalize_plate(" abc-1d23 "), "ABC1D23");
    }
}
