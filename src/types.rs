use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::Result;
use crate::server::CALLBACK_PATH;

/// A GitHub OAuth access token.
///
/// Newtype over the raw token string so the secret never leaks through
/// `Debug` formatting or log sinks. Use [`AccessToken::secret`] at the
/// storage boundary.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value. Hand this only to the config collaborator or an
    /// `Authorization` header, never to a logger.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

/// The authenticated GitHub user record, fetched after token exchange and
/// handed to the config collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Configuration for the GitHub OAuth login flow
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth app client ID
    pub client_id: String,
    /// OAuth app client secret
    pub client_secret: String,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token exchange endpoint URL
    pub token_url: String,
    /// Authenticated user endpoint URL
    pub user_url: String,
    /// Scopes requested in the authorize URL
    pub scopes: Vec<String>,
    /// Address the callback listener binds to. Port 0 lets the OS pick an
    /// ephemeral port, so no fixed port or firewall rule is required.
    pub bind_addr: String,
}

impl OAuthConfig {
    /// Create a config for the given OAuth app, with GitHub's endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        OAuthConfigBuilder::default()
            .client_id(client_id)
            .client_secret(client_secret)
            .build()
    }

    /// Create a new config builder
    pub fn builder() -> OAuthConfigBuilder {
        OAuthConfigBuilder::default()
    }

    /// The redirect URI for a listener bound to `port`.
    pub fn redirect_uri(&self, port: u16) -> String {
        format!("http://127.0.0.1:{port}{CALLBACK_PATH}")
    }
}

/// Builder for OAuthConfig
#[derive(Debug, Clone, Default)]
pub struct OAuthConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_url: Option<String>,
    token_url: Option<String>,
    user_url: Option<String>,
    scopes: Option<Vec<String>>,
    bind_addr: Option<String>,
}

impl OAuthConfigBuilder {
    /// Set the OAuth app client ID
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the OAuth app client secret
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Set the authorization endpoint URL
    pub fn auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = Some(auth_url.into());
        self
    }

    /// Set the token exchange endpoint URL
    pub fn token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    /// Set the authenticated user endpoint URL
    pub fn user_url(mut self, user_url: impl Into<String>) -> Self {
        self.user_url = Some(user_url.into());
        self
    }

    /// Set the scopes requested in the authorize URL
    pub fn scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    /// Set the callback listener bind address
    pub fn bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = Some(bind_addr.into());
        self
    }

    /// Build the OAuthConfig
    pub fn build(self) -> OAuthConfig {
        OAuthConfig {
            client_id: self.client_id.unwrap_or_default(),
            client_secret: self.client_secret.unwrap_or_default(),
            auth_url: self
                .auth_url
                .unwrap_or_else(|| "https://github.com/login/oauth/authorize".to_string()),
            token_url: self
                .token_url
                .unwrap_or_else(|| "https://github.com/login/oauth/access_token".to_string()),
            user_url: self
                .user_url
                .unwrap_or_else(|| "https://api.github.com/user".to_string()),
            scopes: self
                .scopes
                .unwrap_or_else(|| vec!["read:user".to_string(), "user:email".to_string()]),
            bind_addr: self.bind_addr.unwrap_or_else(|| "127.0.0.1:0".to_string()),
        }
    }
}

/// One authorization round-trip's worth of request data.
///
/// Built once the callback listener is bound, since both the `state` value
/// and the redirect URI derive from the listener's port. Immutable;
/// discarded after the URL is emitted.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Port the callback listener is bound to
    pub port: u16,
    /// CSRF state embedded in the authorize URL, the stringified listen port
    pub state: String,
    /// Full authorize URL the user visits in the browser
    pub authorize_url: String,
}

impl AuthorizationRequest {
    pub fn new(config: &OAuthConfig, port: u16) -> Result<Self> {
        let state = port.to_string();

        let mut url = Url::parse(&config.auth_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("redirect_uri", &config.redirect_uri(port))
            .append_pair("state", &state);

        Ok(Self {
            port,
            state,
            authorize_url: url.to_string(),
        })
    }
}

/// Token response from GitHub's token endpoint (URL-encoded form body)
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    #[allow(dead_code)]
    pub token_type: Option<String>,
    #[allow(dead_code)]
    pub scope: Option<String>,
}
