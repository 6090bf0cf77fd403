// src/services/auth.rs

use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{common::error::AppError, models::auth::AdminClaims};

const TOKEN_TTL_HOURS: i64 = 12;

/// Login do administrador único. Usuário e hash bcrypt vêm do ambiente.
#[derive(Clone)]
pub struct AuthService {
    admin_user: Option<String>,
    admin_password_hash: Option<String>,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(
        admin_user: Option<String>,
        admin_password_hash: Option<String>,
        jwt_secret: String,
    ) -> Self {
        Self {
            admin_user,
            admin_password_hash,
            jwt_secret,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), AppError> {
        match (self.admin_user.as_deref(), self.admin_password_hash.as_deref()) {
            (Some(user), Some(hash)) if !user.is_empty() && !hash.is_empty() => Ok((user, hash)),
            _ => Err(AppError::AdminAuthNotConfigured),
        }
    }

    pub fn ensure_configured(&self) -> Result<(), AppError> {
        self.credentials().map(|_| ())
    }

    pub async fn login_admin(&self, username: &str, password: &str) -> Result<String, AppError> {
        let (admin_user, admin_hash) = self.credentials()?;

        if username.trim() != admin_user {
            tracing::warn!("Tentativa de login admin com usuário desconhecido");
            return Err(AppError::InvalidCredentials);
        }

        let password_clone = password.to_owned();
        let hash_clone = admin_hash.to_owned();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::warn!("Senha admin incorreta");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!("🔐 Login admin efetuado");
        self.create_token(admin_user)
    }

    /// Valida assinatura, expiração e sujeito do token. Devolve o usuário admin.
    pub fn validate_token(&self, token: &str) -> Result<String, AppError> {
        let (admin_user, _) = self.credentials()?;

        let token_data = decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        if token_data.claims.sub != admin_user {
            return Err(AppError::InvalidToken);
        }
        Ok(token_data.claims.sub)
    }

    fn create_token(&self, subject: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(TOKEN_TTL_HOURS);

        let claims = AdminClaims {
            sub: subject.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        // Custo baixo só para o teste ser rápido
        let hash = bcrypt::hash("s3nh4-forte", 4).unwrap();
        AuthService::new(Some("admin".into()), Some(hash), "segredo-de-teste".into())
    }

    #[tokio::test]
    async fn login_issues_a_token_that_validates() {
        let auth = service();
        let token = auth.login_admin("admin", "s3nh4-forte").await.unwrap();
        assert_eq!(auth.validate_token(&token).unwrap(), "admin");
    }

    #[tokio::test]
    async fn wrong_password_or_user_is_rejected() {
        let auth = service();
        assert!(matches!(
            auth.login_admin("admin", "errada").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login_admin("root", "s3nh4-forte").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn foreign_tokens_are_invalid() {
        let auth = service();
        let other = AuthService::new(Some("admin".into()), Some("x".into()), "outro-segredo".into());
        let token = other.create_token("admin").unwrap();
        assert!(matches!(auth.validate_token(&token), Err(AppError::InvalidToken)));
        assert!(matches!(auth.validate_token("lixo"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn missing_configuration_is_reported() {
        let auth = AuthService::new(None, None, "s".into());
        assert!(matches!(
            auth.login_admin("admin", "x").await,
            Err(AppError::AdminAuthNotConfigured)
        ));
    }
}
