use thiserror::Error;

/// Error types for the GitHub login flow
///
/// Every variant is terminal for the current login attempt: nothing in this
/// crate retries, the user re-invokes login instead.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("failed to create HTTP client: {0}")]
    ClientCreation(String),

    #[error("failed to bind local callback listener: {0}")]
    Bind(String),

    #[error("local callback server failed: {0}")]
    Serve(String),

    /// GitHub redirected back without granting a code (user denied, or the
    /// provider cancelled authorization).
    #[error("{0}")]
    Provider(String),

    #[error("malformed callback request: {0}")]
    MalformedRequest(String),

    /// The `state` returned by GitHub does not match the one embedded in the
    /// authorize URL. The code is untrusted and discarded.
    #[error("callback state does not match the originating request")]
    StateMismatch,

    #[error("received non-OK response from GitHub token endpoint: {status}")]
    ExchangeRejected { status: u16 },

    #[error("could not parse token endpoint response: {0}")]
    MalformedResponse(String),

    #[error("access token not found in token endpoint response")]
    TokenMissing,

    #[error("failed to fetch authenticated GitHub user: {0}")]
    ProfileFetch(String),

    #[error("failed to write user config: {0}")]
    Persist(String),

    #[cfg(feature = "browser")]
    #[error("failed to open browser: {0}")]
    BrowserLaunch(String),

    #[error("timed out waiting for GitHub authorization")]
    Timeout,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias for GitHub login operations
pub type Result<T> = std::result::Result<T, AuthError>;
