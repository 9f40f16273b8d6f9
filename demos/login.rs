//! Full automatic GitHub login with local callback server
//!
//! Browser auto-opens, the local listener captures the redirect, and the
//! resulting session is written to `github-auth-session.json` in the
//! current directory.
//!
//! Set GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET to your OAuth app's
//! credentials, then run with: cargo run --example login

use std::fs;

use github_auth::{
    AccessToken, GitHubUser, LoginFlow, LoginOptions, LoginOutcome, LoginPresenter, OAuthConfig,
    SystemBrowser, UserConfigManager,
};
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
struct FileSession {
    logged_in: bool,
    access_token: Option<String>,
    login: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

impl UserConfigManager for FileSession {
    fn set_logged_in(&mut self, logged_in: bool) {
        self.logged_in = logged_in;
    }

    fn set_access_token(&mut self, token: &AccessToken) {
        self.access_token = Some(token.secret().to_string());
    }

    fn populate_from_user(&mut self, user: &GitHubUser) {
        self.login = Some(user.login.clone());
        self.name = user.name.clone();
        self.email = user.email.clone();
    }

    fn write(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        fs::write(
            "github-auth-session.json",
            serde_json::to_vec_pretty(self)?,
        )?;
        Ok(())
    }
}

struct TerminalPresenter;

impl LoginPresenter for TerminalPresenter {
    fn present(&mut self, outcome: &LoginOutcome) {
        match outcome {
            LoginOutcome::Success => {
                println!("\n✅ Logged in! Session saved to github-auth-session.json");
            }
            LoginOutcome::Failure { reason } => println!("\n❌ Login failed: {reason}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "github_auth=info".into()),
        )
        .init();

    println!("=== GitHub OAuth login ===\n");

    let config = OAuthConfig::new(
        std::env::var("GITHUB_CLIENT_ID")?,
        std::env::var("GITHUB_CLIENT_SECRET")?,
    );

    let flow = LoginFlow::new(
        config,
        FileSession::default(),
        TerminalPresenter,
        SystemBrowser,
    )?
    .with_options(LoginOptions::default());

    flow.execute().await?;
    Ok(())
}
