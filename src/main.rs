// src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::admin_guard;
use crate::services::upload_policy::MAX_UPLOAD_BYTES;

// Folga para os campos e delimitadores do multipart
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn app_router(app_state: AppState) -> Router {
    // Fluxo público do cliente (links de capacidade por UUID)
    let signup_routes = Router::new()
        .route("/", post(handlers::signup::save_signup))
        .route("/{id}", get(handlers::signup::get_signup))
        .route("/{id}/sign", post(handlers::signup::sign_signup))
        .route(
            "/{id}/documents",
            post(handlers::documents::upload_document)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/{id}/documents/{key}", get(handlers::documents::download_document))
        .route("/{id}/contract", get(handlers::documents::get_contract))
        .route("/{id}/contract.pdf", get(handlers::documents::get_contract_pdf));

    let subscription_routes = Router::new()
        .route("/{id}", get(handlers::subscription::get_subscription))
        .route("/{id}/status", get(handlers::subscription::get_status))
        .route("/{id}/sign", post(handlers::subscription::sign_subscription))
        .route("/{id}/cancel", post(handlers::subscription::cancel_subscription))
        .route(
            "/{id}/return-tracking",
            post(handlers::subscription::submit_return_tracking),
        );

    // Rotas da equipe (protegidas pelo middleware)
    let admin_routes = Router::new()
        .route("/signup-requests", get(handlers::admin_signup::list_signups))
        .route("/signup-requests/{id}", patch(handlers::admin_signup::update_signup))
        .route(
            "/signup-requests/{id}/approve",
            post(handlers::admin_signup::approve_signup),
        )
        .route(
            "/signup-requests/{id}/reject",
            post(handlers::admin_signup::reject_signup),
        )
        .route(
            "/subscriptions",
            post(handlers::admin_subscription::create_subscription)
                .get(handlers::admin_subscription::list_subscriptions),
        )
        .route(
            "/subscriptions/from-signup/{signup_id}",
            post(handlers::admin_subscription::create_from_signup),
        )
        .route(
            "/subscriptions/{id}/transition",
            post(handlers::admin_subscription::transition_subscription),
        )
        .route(
            "/subscriptions/{id}/cancel",
            post(handlers::admin_subscription::cancel_subscription),
        )
        .route(
            "/subscriptions/{id}/mark-return-received",
            post(handlers::admin_subscription::mark_return_received),
        )
        .route(
            "/subscriptions/{id}/mark-fee-due",
            post(handlers::admin_subscription::mark_fee_due),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // O login fica fora do guard
    let admin_auth_routes = Router::new().route("/login", post(handlers::auth::login));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/signup-requests", signup_routes)
        .nest("/api/subscriptions", subscription_routes)
        .nest("/api/admin/auth", admin_auth_routes)
        .nest("/api/admin", admin_routes)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new().await?;
    let addr = app_state.config.bind_addr.clone();

    let app = app_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
