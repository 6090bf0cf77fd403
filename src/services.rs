pub mod auth;
pub mod contract;
pub mod document_policy;
pub mod document_service;
pub mod signup_service;
pub mod subscription_service;
pub mod upload_policy;
