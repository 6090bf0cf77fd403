// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Signup (público) ---
        handlers::signup::save_signup,
        handlers::signup::get_signup,
        handlers::signup::sign_signup,
        handlers::documents::upload_document,
        handlers::documents::download_document,
        handlers::documents::get_contract,
        handlers::documents::get_contract_pdf,

        // --- Subscription (público) ---
        handlers::subscription::get_subscription,
        handlers::subscription::get_status,
        handlers::subscription::sign_subscription,
        handlers::subscription::cancel_subscription,
        handlers::subscription::submit_return_tracking,

        // --- Auth ---
        handlers::auth::login,

        // --- Admin ---
        handlers::admin_signup::list_signups,
        handlers::admin_signup::update_signup,
        handlers::admin_signup::approve_signup,
        handlers::admin_signup::reject_signup,
        handlers::admin_subscription::list_subscriptions,
        handlers::admin_subscription::create_subscription,
        handlers::admin_subscription::create_from_signup,
        handlers::admin_subscription::transition_subscription,
        handlers::admin_subscription::cancel_subscription,
        handlers::admin_subscription::mark_return_received,
        handlers::admin_subscription::mark_fee_due,
    ),
    components(
        schemas(
            // --- Signup ---
            models::signup::PersonType,
            models::signup::PaymentMethod,
            models::signup::SignupStatus,
            models::signup::SignupAction,
            models::signup::Address,
            models::signup::Vehicle,
            models::signup::DocumentEntry,
            models::signup::SignupRequest,
            models::signup::SignupForm,
            models::signup::SignupSummary,
            models::signup::SignupDetail,

            // --- Subscription ---
            models::subscription::SubscriptionStatus,
            models::subscription::EquipmentReturnStatus,
            models::subscription::Subscription,
            models::subscription::CreateSubscriptionPayload,
            models::subscription::StatusFlags,
            models::subscription::StatusView,
            models::subscription::SubscriptionSummary,
            models::subscription::SubscriptionDetail,

            // --- Comum ---
            models::history::Actor,
            models::history::StatusHistoryEntry,
            models::signature::SignatureConsent,
            models::action::ActionResponse,
            models::auth::LoginPayload,
            models::auth::AuthResponse,

            // --- Payloads ---
            handlers::signup::SaveSignupPayload,
            handlers::documents::UploadDocumentForm,
            handlers::admin_signup::RejectSignupPayload,
            handlers::subscription::CancelPayload,
            handlers::subscription::TrackingCodePayload,
            handlers::admin_subscription::TransitionPayload,
            handlers::admin_subscription::FeeDuePayload,
            services::subscription_service::TransitionAction,
        )
    ),
    tags(
        (name = "Signup", description = "Cadastro do cliente, documentos e assinatura"),
        (name = "Subscription", description = "Proposta do cliente: assinatura, cancelamento e devolução"),
        (name = "Auth", description = "Login do administrador"),
        (name = "Admin Signup", description = "Análise das solicitações de cadastro"),
        (name = "Admin Subscription", description = "Gestão das propostas e da devolução do equipamento")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
