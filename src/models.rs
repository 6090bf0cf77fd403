pub mod action;
pub mod auth;
pub mod history;
pub mod signature;
pub mod signup;
pub mod subscription;
