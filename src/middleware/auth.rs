// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

// Sessão do administrador, inserida nos "extensions" pelo guard
#[derive(Debug, Clone)]
pub struct AdminSession(pub String);

// O middleware em si: protege todas as rotas /api/admin/**
pub async fn admin_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Sem configuração de admin a resposta é 503, com ou sem token
    app_state
        .auth_service
        .ensure_configured()
        .map_err(|e| e.to_api_error(&locale))?;

    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(AppError::InvalidToken.to_api_error(&locale));
    };

    let admin = app_state
        .auth_service
        .validate_token(bearer.token())
        .map_err(|e| e.to_api_error(&locale))?;

    request.extensions_mut().insert(AdminSession(admin));
    Ok(next.run(request).await)
}

// Extrator para obter a sessão admin diretamente nos handlers
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminSession>()
            .cloned()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&Locale::default()))
    }
}
