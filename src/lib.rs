//! # github-auth
//!
//! GitHub OAuth 2.0 authorization-code login for command-line tools.
//!
//! No pre-registered redirect endpoint is required: a short-lived local
//! HTTP listener is bound to an OS-assigned port, the authorize URL embeds
//! that port as the `state` parameter, and the listener captures exactly
//! one redirect, exchanges the authorization code for an access token and
//! hands the result back to the foreground flow.
//!
//! ## Features
//!
//! - **Ephemeral callback server**: single-use axum listener on port 0
//! - **Single outcome**: at-most-once callback handling, duplicate
//!   redirects are discarded
//! - **State validation**: callbacks carrying a code with the wrong
//!   `state` are rejected
//! - **Browser integration**: auto-open browser for authorization
//!   (default `browser` feature)
//! - **Pluggable persistence/presentation**: session storage and outcome
//!   rendering are injected traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use github_auth::{AuthorizationRequest, CallbackReceiver, GitHubClient, OAuthConfig};
//!
//! #[tokio::main]
//! async fn main() -> github_auth::Result<()> {
//!     let config = OAuthConfig::new("client-id", "client-secret");
//!     let client = GitHubClient::new(config.clone())?;
//!
//!     let receiver = CallbackReceiver::start(&config, client.clone()).await?;
//!     let request = AuthorizationRequest::new(&config, receiver.port())?;
//!
//!     println!("Visit: {}", request.authorize_url);
//!
//!     // Blocks until the browser round-trip completes; the receiver has
//!     // already exchanged the code by the time this returns.
//!     let token = receiver.wait(None).await?;
//!
//!     let user = client.authenticated_user(&token).await?;
//!     println!("Logged in as {}", user.login);
//!     Ok(())
//! }
//! ```
//!
//! The full coordinator, including config persistence and outcome
//! presentation, is [`LoginFlow`].

mod client;
mod error;
mod login;
mod server;
mod types;

#[cfg(feature = "browser")]
mod browser;

// Public API exports
pub use client::GitHubClient;
pub use error::{AuthError, Result};
pub use login::{
    BrowserLauncher, LoginFlow, LoginOptions, LoginOutcome, LoginPresenter, UserConfigManager,
};
pub use server::{CALLBACK_PATH, CallbackReceiver};
pub use types::{AccessToken, AuthorizationRequest, GitHubUser, OAuthConfig, OAuthConfigBuilder};

#[cfg(feature = "browser")]
pub use browser::{SystemBrowser, open_browser};
