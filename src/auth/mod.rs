use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, ChatResult};

/// Source of the bearer token attached to authorized backend calls.
///
/// The streaming core treats tokens as opaque strings; where they come from
/// (login flow, environment, keychain) is the implementor's business.
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` when unauthenticated.
    fn bearer_token(&self) -> Option<String>;
}

/// Provider for unauthenticated use. Requests go out without an
/// Authorization header.
pub struct NoToken;

impl TokenProvider for NoToken {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// Holds a token set after login, replaceable when the session is refreshed.
#[derive(Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<String>>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write() = None;
    }
}

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
}

/// Client for the backend's login endpoints. On successful login the
/// returned token is stored in the shared provider so subsequent authorized
/// calls pick it up.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<StaticTokenProvider>,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<StaticTokenProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            tokens,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> ChatResult<TokenResponse> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ChatError::RequestFailed {
                detail: "Identifiants invalides".to_string(),
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|error| ChatError::RequestFailed {
                    detail: error.to_string(),
                })?;

        debug!(username, "Login succeeded");
        self.tokens.set_token(token.access_token.clone());
        Ok(token)
    }

    /// Fetch the authenticated user's profile.
    pub async fn current_user(&self) -> ChatResult<UserProfile> {
        let mut request = self.http.get(format!("{}/auth/me", self.base_url));
        if let Some(token) = self.tokens.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ChatError::RequestFailed {
                detail: "Session expirée".to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })
    }

    pub fn logout(&self) {
        self.tokens.clear();
    }
}
