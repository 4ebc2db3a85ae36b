//! Session resolution against the external identity provider.
//!
//! Handlers take an [`AuthUser`] argument; the extractor resolves the bearer
//! token per request, so nothing reads a "current user" ambiently.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::user::AuthUser;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Identity provider unreachable: {0}")]
    Provider(String),
}

/// Carried in `AppState` as `Arc<dyn IdentityProvider>`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self, token: &str) -> Result<AuthUser, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(alias = "sub")]
    id: String,
    email: String,
    #[serde(default, alias = "name", alias = "displayName")]
    display_name: Option<String>,
}

/// Resolves tokens with the provider's user-info endpoint.
pub struct RemoteIdentityProvider {
    client: Client,
    userinfo_url: String,
}

impl RemoteIdentityProvider {
    pub fn new(userinfo_url: String) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        Ok(Self {
            client,
            userinfo_url,
        })
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    async fn current_user(&self, token: &str) -> Result<AuthUser, IdentityError> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(IdentityError::Unauthenticated);
        }
        if !status.is_success() {
            warn!("Identity provider returned {status}");
            return Err(IdentityError::Provider(format!("status {status}")));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;
        debug!("Resolved session for user {}", info.id);
        Ok(AuthUser {
            id: info.id,
            email: info.email,
            display_name: info.display_name,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        Ok(state.identity.current_user(token).await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;

    /// Accepts `token-<id>` and signs in user `<id>`.
    pub(crate) struct StaticIdentity;

    #[async_trait]
    impl IdentityProvider for StaticIdentity {
        async fn current_user(&self, token: &str) -> Result<AuthUser, IdentityError> {
            let id = token
                .strip_prefix("token-")
                .ok_or(IdentityError::Unauthenticated)?;
            Ok(AuthUser {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                display_name: None,
            })
        }
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_userinfo_accepts_oidc_claims() {
        let info: UserInfo =
            serde_json::from_str(r#"{"sub": "u-1", "email": "a@b.c", "name": "Ada"}"#).unwrap();
        assert_eq!(info.id, "u-1");
        assert_eq!(info.display_name.as_deref(), Some("Ada"));
    }
}
