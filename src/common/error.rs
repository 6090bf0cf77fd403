// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::middleware::i18n::Locale;

/// Categoria de falha exposta ao chamador (uma por variante de `AppError`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Validation,
    PreconditionFailed,
    NotFound,
    Unauthorized,
    StorageFailure,
}

#[derive(Debug, Error)]
pub enum AppError {
    // Erro de campo produzido pelas regras do domínio (CPF, e-mail, motivo...)
    #[error("{message}")]
    Validation { field: String, message: String },

    // Erro produzido pelo `validator` nos payloads
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{message} (status: {status})")]
    PreconditionFailed { message: String, status: String },

    // O UPDATE condicional não encontrou o status esperado
    #[error("O registro foi alterado por outra operação. Recarregue e tente novamente.")]
    StatusConflict,

    #[error("{0}")]
    NotFound(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Autenticação admin não configurada no servidor")]
    AdminAuthNotConfigured,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de armazenamento: {0}")]
    Io(#[from] std::io::Error),

    #[error("Falha ao gerar documento: {0}")]
    DocumentGeneration(String),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>, status: impl ToString) -> Self {
        AppError::PreconditionFailed {
            message: message.into(),
            status: status.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Validation { .. } | AppError::ValidationError(_) => ErrorCategory::Validation,
            AppError::PreconditionFailed { .. } | AppError::StatusConflict => {
                ErrorCategory::PreconditionFailed
            }
            AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::AdminAuthNotConfigured => ErrorCategory::Unauthorized,
            _ => ErrorCategory::StorageFailure,
        }
    }

    /// Converte o erro interno na resposta HTTP, com o título no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale) -> ApiError {
        let category = self.category();

        match self {
            AppError::Validation { field, message } => {
                let mut details = HashMap::new();
                details.insert(field, vec![message.clone()]);
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    category,
                    error: message,
                    details: Some(details),
                }
            }
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let error = if locale.is_english() {
                    "One or more fields are invalid."
                } else {
                    "Um ou mais campos são inválidos."
                };
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    category,
                    error: error.to_string(),
                    details: Some(details),
                }
            }
            AppError::PreconditionFailed { .. } => {
                tracing::warn!("Pré-condição não atendida: {}", self);
                ApiError::new(StatusCode::CONFLICT, category, self.to_string())
            }
            AppError::StatusConflict => {
                tracing::warn!("Conflito de status em escrita condicional");
                let error = if locale.is_english() {
                    "The record was changed by another operation. Reload and try again."
                } else {
                    "O registro foi alterado por outra operação. Recarregue e tente novamente."
                };
                ApiError::new(StatusCode::CONFLICT, category, error)
            }
            AppError::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, category, self.to_string()),
            AppError::InvalidCredentials | AppError::InvalidToken => {
                ApiError::new(StatusCode::UNAUTHORIZED, category, self.to_string())
            }
            AppError::AdminAuthNotConfigured => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, category, self.to_string())
            }
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                let error = if locale.is_english() {
                    "An unexpected error occurred."
                } else {
                    "Ocorreu um erro inesperado."
                };
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, category, error)
            }
        }
    }
}

/// Erro já pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub category: ErrorCategory,
    pub error: String,
    pub details: Option<HashMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn new(status: StatusCode, category: ErrorCategory, error: impl Into<String>) -> Self {
        Self {
            status,
            category,
            error: error.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({
                "error": self.error,
                "category": self.category,
                "details": details,
            }),
            None => json!({
                "error": self.error,
                "category": self.category,
            }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
