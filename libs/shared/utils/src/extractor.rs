use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use tracing::debug;

use shared_config::AppConfig;

/// Bearer token to present to the store for this request.
///
/// A caller's own JWT is forwarded so row-level security applies. Calls without one
/// (the chat tool layer) run with the service role key.
#[derive(Debug, Clone)]
pub struct StoreToken(pub String);

impl StoreToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<Arc<AppConfig>> for StoreToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppConfig>) -> Result<Self, Self::Rejection> {
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(auth)) => Ok(StoreToken(auth.token().to_string())),
            Err(_) => {
                debug!("No bearer token on request, using service role");
                Ok(StoreToken(state.service_token().to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    use crate::test_utils::TestConfig;

    async fn extract(request: Request<()>) -> StoreToken {
        let state = TestConfig::default().to_arc();
        let (mut parts, _) = request.into_parts();
        match StoreToken::from_request_parts(&mut parts, &state).await {
            Ok(token) => token,
            Err(never) => match never {},
        }
    }

    #[tokio::test]
    async fn test_forwards_caller_token() {
        let request = Request::builder()
            .header("Authorization", "Bearer user-jwt")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.as_str(), "user-jwt");
    }

    #[tokio::test]
    async fn test_falls_back_to_service_role() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(extract(request).await.as_str(), TestConfig::default().service_role_key);
    }
}
