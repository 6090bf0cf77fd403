pub mod admin_signup;
pub mod admin_subscription;
pub mod auth;
pub mod documents;
pub mod signup;
pub mod subscription;
