use reqwest::header::ACCEPT;

use crate::types::TokenResponse;
use crate::{AccessToken, AuthError, GitHubUser, OAuthConfig, Result};

/// HTTP client for GitHub's OAuth token endpoint and REST API
///
/// Cheap to clone; the callback handler holds a clone so it can exchange the
/// authorization code synchronously before signalling completion.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl GitHubClient {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("github-auth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::ClientCreation(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Exchange an authorization code for an access token
    ///
    /// Performs a single form-encoded POST to the token endpoint. GitHub
    /// answers with a URL-encoded form body, not JSON.
    ///
    /// # Errors
    ///
    /// - [`AuthError::ExchangeRejected`] on a non-2xx response
    /// - [`AuthError::MalformedResponse`] if the body is not a form
    /// - [`AuthError::TokenMissing`] if the form lacks an `access_token`
    ///
    /// No retries: a network failure surfaces directly to the caller.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ExchangeRejected {
                status: status.as_u16(),
            });
        }

        // The body is not logged anywhere: it carries the token in cleartext.
        let body = response.text().await?;
        let fields: TokenResponse = serde_urlencoded::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        match fields.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
            _ => Err(AuthError::TokenMissing),
        }
    }

    /// Fetch the authenticated user record for a freshly exchanged token
    ///
    /// Any failure here (transport, non-2xx, undecodable body) maps to
    /// [`AuthError::ProfileFetch`]; the login flow treats it as fatal.
    pub async fn authenticated_user(&self, token: &AccessToken) -> Result<GitHubUser> {
        let response = self
            .http
            .get(&self.config.user_url)
            .bearer_auth(token.secret())
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| AuthError::ProfileFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ProfileFetch(format!(
                "GitHub user endpoint returned {status}"
            )));
        }

        response
            .json::<GitHubUser>()
            .await
            .map_err(|e| AuthError::ProfileFetch(e.to_string()))
    }
}
