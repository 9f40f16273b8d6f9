use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{AccessToken, AuthError, GitHubClient, OAuthConfig, Result};

/// Path GitHub redirects the browser back to on the local listener
pub const CALLBACK_PATH: &str = "/github/oauth/callback";

const SUCCESS_PAGE: &str = "<h1>Success!</h1>\
    <p>Your GitHub account is now connected. You can close this tab and return to the terminal.</p>";

const COMPLETED_PAGE: &str = "<h1>Already completed</h1>\
    <p>This login attempt has already finished. You can close this tab.</p>";

fn failure_page(detail: &str) -> Html<String> {
    Html(format!(
        "<h1>Authorization failed</h1><p>{detail}</p><p>You can close this tab.</p>"
    ))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

struct HandlerShared {
    /// Taken exactly once; later redirect deliveries find `None` and are
    /// answered with a static page, their outcome discarded.
    outcome_tx: tokio::sync::Mutex<Option<oneshot::Sender<Result<AccessToken>>>>,
    expected_state: String,
    client: GitHubClient,
}

/// An ephemeral, single-use local listener for the OAuth redirect
///
/// Binds an OS-assigned port, owns its own router instance (nothing is
/// registered globally), and forwards exactly one callback outcome to the
/// coordinator through a oneshot channel. The channel carries the outcome
/// value itself, so receiving it is the happens-before edge; no shared slot
/// or separate done-signal is involved.
pub struct CallbackReceiver {
    port: u16,
    state: String,
    outcome_rx: oneshot::Receiver<Result<AccessToken>>,
    serve_err_rx: oneshot::Receiver<AuthError>,
    serve_task: JoinHandle<()>,
}

impl CallbackReceiver {
    /// Bind the listener and start serving in the background
    ///
    /// The expected `state` is derived from the bound port, matching the
    /// value [`crate::AuthorizationRequest`] embeds in the authorize URL.
    pub async fn start(config: &OAuthConfig, client: GitHubClient) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|e| AuthError::Bind(format!("{}: {e}", config.bind_addr)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Bind(e.to_string()))?
            .port();
        let state = port.to_string();

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let shared = Arc::new(HandlerShared {
            outcome_tx: tokio::sync::Mutex::new(Some(outcome_tx)),
            expected_state: state.clone(),
            client,
        });

        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(shared);

        let (err_tx, serve_err_rx) = oneshot::channel();
        let serve_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                let _ = err_tx.send(AuthError::Serve(e.to_string()));
            }
        });

        tracing::debug!(port, "callback listener bound");

        Ok(Self {
            port,
            state,
            outcome_rx,
            serve_err_rx,
            serve_task,
        })
    }

    /// Port the listener is bound to
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The `state` value callbacks must carry
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Block until the callback outcome arrives, the serve loop fails, or
    /// the optional deadline passes
    ///
    /// `timeout: None` waits indefinitely, relying on the hosting process's
    /// interrupt handling (Ctrl-C) for user abort. The listener is closed
    /// once an outcome or error is observed.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<AccessToken> {
        let deadline = async {
            match timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            outcome = &mut self.outcome_rx => match outcome {
                Ok(outcome) => outcome,
                Err(_) => Err(AuthError::Serve(
                    "callback handler dropped without producing an outcome".to_string(),
                )),
            },
            err = &mut self.serve_err_rx => Err(err.unwrap_or_else(|_| {
                AuthError::Serve("server task exited unexpectedly".to_string())
            })),
            _ = deadline => Err(AuthError::Timeout),
        };

        self.serve_task.abort();
        result
    }
}

async fn handle_callback(
    State(shared): State<Arc<HandlerShared>>,
    query: std::result::Result<Query<CallbackQuery>, QueryRejection>,
) -> Html<String> {
    // At-most-once: whoever takes the sender owns the flow's single outcome.
    let Some(tx) = shared.outcome_tx.lock().await.take() else {
        tracing::debug!("discarding redirect received after completion");
        return Html(COMPLETED_PAGE.to_string());
    };

    let Query(params) = match query {
        Ok(query) => query,
        Err(rejection) => {
            let _ = tx.send(Err(AuthError::MalformedRequest(rejection.to_string())));
            return failure_page("The callback request could not be parsed.");
        }
    };

    let Some(code) = params.code else {
        let reason = match params.error {
            Some(error) => format!("no code returned after authorization ({error})"),
            None => "no code returned after authorization".to_string(),
        };
        let _ = tx.send(Err(AuthError::Provider(reason)));
        return failure_page("GitHub did not return an authorization code.");
    };

    // A code is only trusted if it arrives with the state we sent out.
    if params.state.as_deref() != Some(shared.expected_state.as_str()) {
        let _ = tx.send(Err(AuthError::StateMismatch));
        return failure_page("State validation failed. Please retry the login.");
    }

    match shared.client.exchange_code(&code).await {
        Ok(token) => {
            let _ = tx.send(Ok(token));
            Html(SUCCESS_PAGE.to_string())
        }
        Err(err) => {
            let _ = tx.send(Err(err));
            failure_page("Exchanging the authorization code with GitHub failed.")
        }
    }
}
