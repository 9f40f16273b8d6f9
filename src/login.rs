use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::server::CallbackReceiver;
use crate::{AccessToken, AuthError, AuthorizationRequest, GitHubClient, GitHubUser, OAuthConfig, Result};

/// Persistent user-config collaborator
///
/// Owned by the caller; the login flow sets session fields and requests a
/// single durable write. The storage format is the caller's concern.
pub trait UserConfigManager {
    fn set_logged_in(&mut self, logged_in: bool);
    fn set_access_token(&mut self, token: &AccessToken);
    fn populate_from_user(&mut self, user: &GitHubUser);
    fn write(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Renders the login outcome to the caller (terminal text, HTTP body, ...)
///
/// Informed exactly once per flow, regardless of where a failure occurred.
pub trait LoginPresenter {
    fn present(&mut self, outcome: &LoginOutcome);
}

/// Best-effort browser launch. See [`crate::SystemBrowser`] for the default.
pub trait BrowserLauncher {
    fn open_url(&self, url: &str) -> Result<()>;
}

/// Outcome handed to the [`LoginPresenter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    Failure { reason: String },
}

/// Knobs for one login invocation
#[derive(Debug, Clone)]
pub struct LoginOptions {
    /// Pause between printing the authorize URL and opening the browser,
    /// giving the user a moment to read the guidance.
    pub browser_delay: Duration,
    /// Maximum time to wait for the callback. `None` blocks until the user
    /// completes or aborts the browser flow.
    pub wait_timeout: Option<Duration>,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            browser_delay: Duration::from_secs(4),
            wait_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingCallback,
    Persisting,
    Done,
}

/// Coordinates one GitHub login round-trip
///
/// Runs a single pass: start the callback listener, send the user to the
/// browser, wait for exactly one callback (the listener performs the token
/// exchange), fetch the authenticated user, persist the session, report the
/// outcome. No state is revisited and nothing is retried.
pub struct LoginFlow<C, P, B> {
    config: OAuthConfig,
    github: GitHubClient,
    user_config: C,
    presenter: P,
    browser: B,
    options: LoginOptions,
    phase: Phase,
}

impl<C, P, B> LoginFlow<C, P, B>
where
    C: UserConfigManager,
    P: LoginPresenter,
    B: BrowserLauncher,
{
    pub fn new(config: OAuthConfig, user_config: C, presenter: P, browser: B) -> Result<Self> {
        let github = GitHubClient::new(config.clone())?;
        Ok(Self {
            config,
            github,
            user_config,
            presenter,
            browser,
            options: LoginOptions::default(),
            phase: Phase::Idle,
        })
    }

    pub fn with_options(mut self, options: LoginOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the flow to completion
    ///
    /// The presenter is informed exactly once; the returned error (if any)
    /// is the same one the presenter saw, for the caller's exit code.
    pub async fn execute(mut self) -> Result<()> {
        let receiver = match CallbackReceiver::start(&self.config, self.github.clone()).await {
            Ok(receiver) => receiver,
            Err(err) => return Err(self.fail(err)),
        };

        let request = match AuthorizationRequest::new(&self.config, receiver.port()) {
            Ok(request) => request,
            Err(err) => return Err(self.fail(err)),
        };
        debug_assert_eq!(request.state, receiver.state());

        self.advance(Phase::AwaitingCallback);

        info!("You will be taken to your browser to connect your GitHub account...");
        info!("If your browser doesn't open automatically, go to the following link:");
        info!("{}", request.authorize_url);

        if !self.options.browser_delay.is_zero() {
            tokio::time::sleep(self.options.browser_delay).await;
        }

        if self.browser.open_url(&request.authorize_url).is_err() {
            warn!("Cannot open browser! Please visit the URL above.");
        }

        info!("Waiting for GitHub authorization... (press Ctrl-C to quit)");

        let token = match receiver.wait(self.options.wait_timeout).await {
            Ok(token) => token,
            Err(err) => return Err(self.fail(err)),
        };

        self.advance(Phase::Persisting);

        let user = match self.github.authenticated_user(&token).await {
            Ok(user) => user,
            Err(err) => return Err(self.fail(err)),
        };

        self.user_config.set_logged_in(true);
        self.user_config.set_access_token(&token);
        self.user_config.populate_from_user(&user);
        if let Err(err) = self.user_config.write() {
            return Err(self.fail(AuthError::Persist(err.to_string())));
        }

        self.advance(Phase::Done);
        self.presenter.present(&LoginOutcome::Success);
        Ok(())
    }

    fn advance(&mut self, next: Phase) {
        debug!(from = ?self.phase, to = ?next, "login phase transition");
        self.phase = next;
    }

    /// Single funnel for every failure path: the presenter hears about the
    /// error exactly once, then it propagates to the caller.
    fn fail(&mut self, err: AuthError) -> AuthError {
        self.advance(Phase::Done);
        error!("login failed: {err}");
        self.presenter.present(&LoginOutcome::Failure {
            reason: err.to_string(),
        });
        err
    }
}
