// src/middleware/client_info.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{HeaderMapExt, UserAgent};

use crate::models::signature::ClientContext;

/// IP e user agent de quem assina, guardados como evidência.
/// O IP vem do proxy (`x-forwarded-for`, primeiro salto) ou de `x-real-ip`.
pub struct ClientInfo(pub ClientContext);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let ip = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .or_else(|| header("x-real-ip"))
            .map(str::to_string);

        let user_agent = parts
            .headers
            .typed_get::<UserAgent>()
            .map(|ua| ua.as_str().to_string());

        Ok(ClientInfo(ClientContext { ip, user_agent }))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(req: Request<()>) -> ClientContext {
        let (mut parts, _) = req.into_parts();
        let ClientInfo(ctx) = ClientInfo::from_request_parts(&mut parts, &()).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn first_forwarded_hop_wins() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.1, 10.0.0.1")
            .header("x-real-ip", "10.0.0.2")
            .header("user-agent", "curl/8.0")
            .body(())
            .unwrap();
        let ctx = extract(req).await;
        assert_eq!(ctx.ip.as_deref(), Some("203.0.113.1"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[tokio::test]
    async fn falls_back_to_real_ip_or_nothing() {
        let req = Request::builder().header("x-real-ip", "10.0.0.2").body(()).unwrap();
        assert_eq!(extract(req).await.ip.as_deref(), Some("10.0.0.2"));

        let ctx = extract(Request::builder().body(()).unwrap()).await;
        assert!(ctx.ip.is_none());
        assert!(ctx.user_agent.is_none());
    }
}
