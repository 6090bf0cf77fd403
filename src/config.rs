// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use validator::Validate;

use crate::{
    common::clock::{Clock, SystemClock},
    db::{FsBlobStore, SignupRepository, SubscriptionRepository},
    services::{
        auth::AuthService, contract::ContractTemplates, document_service::DocumentService,
        signup_service::SignupService, subscription_service::SubscriptionService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone, Validate)]
pub struct Config {
    #[validate(length(min = 1, message = "DATABASE_URL deve ser definida"))]
    pub database_url: String,
    #[validate(length(min = 1, message = "JWT_SECRET deve ser definido"))]
    pub jwt_secret: String,
    pub admin_user: Option<String>,
    pub admin_password_hash: Option<String>,
    #[validate(url(message = "APP_BASE_URL deve ser uma URL válida"))]
    pub app_base_url: String,
    pub upload_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub bind_addr: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            admin_user: optional("ADMIN_USER"),
            admin_password_hash: optional("ADMIN_PASSWORD_HASH"),
            app_base_url: var_or("APP_BASE_URL", "http://localhost:3000"),
            upload_dir: var_or("UPLOAD_DIR", "./uploads").into(),
            templates_dir: var_or("TEMPLATES_DIR", "./templates").into(),
            fonts_dir: var_or("FONTS_DIR", "./fonts").into(),
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
        };
        config.validate()?;

        if config.admin_user.is_none() || config.admin_password_hash.is_none() {
            tracing::warn!("⚠️ ADMIN_USER/ADMIN_PASSWORD_HASH ausentes: rotas admin responderão 503");
        }
        Ok(config)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub signup_service: SignupService,
    pub subscription_service: SubscriptionService,
    pub auth_service: AuthService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Config::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        let templates = ContractTemplates::load(&config.templates_dir)?;

        // --- Monta o gráfico de dependências ---
        let signup_store = Arc::new(SignupRepository::new(db_pool.clone()));
        let subscription_store = Arc::new(SubscriptionRepository::new(db_pool));
        let blobs = Arc::new(FsBlobStore::new(&config.upload_dir));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let signup_service = SignupService::new(
            signup_store.clone(),
            blobs,
            clock.clone(),
            Arc::new(templates),
            DocumentService::new(&config.fonts_dir),
            config.app_base_url.clone(),
        );
        let subscription_service = SubscriptionService::new(
            subscription_store,
            signup_store,
            clock,
            config.app_base_url.clone(),
        );
        let auth_service = AuthService::new(
            config.admin_user.clone(),
            config.admin_password_hash.clone(),
            config.jwt_secret.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            signup_service,
            subscription_service,
            auth_service,
        })
    }
}
