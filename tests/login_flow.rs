//! End-to-end tests for the login flow, with GitHub's endpoints mocked and
//! the browser redirect simulated by a plain HTTP GET against the local
//! callback listener.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use github_auth::{
    AccessToken, AuthError, AuthorizationRequest, BrowserLauncher, CallbackReceiver, GitHubClient,
    GitHubUser, LoginFlow, LoginOptions, LoginOutcome, LoginPresenter, OAuthConfig,
    UserConfigManager,
};
use mockito::Matcher;
use url::Url;

#[derive(Debug, Default)]
struct ConfigState {
    logged_in: bool,
    access_token: Option<String>,
    user_login: Option<String>,
    writes: usize,
    fail_write: bool,
}

#[derive(Debug, Default, Clone)]
struct RecordingConfig(Arc<Mutex<ConfigState>>);

impl UserConfigManager for RecordingConfig {
    fn set_logged_in(&mut self, logged_in: bool) {
        self.0.lock().unwrap().logged_in = logged_in;
    }

    fn set_access_token(&mut self, token: &AccessToken) {
        self.0.lock().unwrap().access_token = Some(token.secret().to_string());
    }

    fn populate_from_user(&mut self, user: &GitHubUser) {
        self.0.lock().unwrap().user_login = Some(user.login.clone());
    }

    fn write(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut state = self.0.lock().unwrap();
        if state.fail_write {
            return Err("disk full".into());
        }
        state.writes += 1;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
struct RecordingPresenter(Arc<Mutex<Vec<LoginOutcome>>>);

impl LoginPresenter for RecordingPresenter {
    fn present(&mut self, outcome: &LoginOutcome) {
        self.0.lock().unwrap().push(outcome.clone());
    }
}

#[derive(Debug, Default, Clone)]
struct RecordingBrowser(Arc<Mutex<Vec<String>>>);

impl BrowserLauncher for RecordingBrowser {
    fn open_url(&self, url: &str) -> github_auth::Result<()> {
        self.0.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

fn mocked_config(server: &mockito::ServerGuard) -> OAuthConfig {
    OAuthConfig::builder()
        .client_id("cid123")
        .client_secret("sec456")
        .auth_url("https://github.example/login/oauth/authorize")
        .token_url(format!("{}/login/oauth/access_token", server.url()))
        .user_url(format!("{}/user", server.url()))
        .build()
}

fn immediate_options() -> LoginOptions {
    LoginOptions {
        browser_delay: Duration::ZERO,
        wait_timeout: Some(Duration::from_secs(10)),
    }
}

/// Wait until the flow hands an authorize URL to the browser launcher, then
/// return the callback port parsed from its `state` parameter.
async fn port_from_browser(browser: &RecordingBrowser) -> u16 {
    for _ in 0..200 {
        if let Some(url) = browser.0.lock().unwrap().first().cloned() {
            let url = Url::parse(&url).unwrap();
            let (_, state) = url.query_pairs().find(|(k, _)| k == "state").unwrap();
            return state.parse().unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("authorize URL was never emitted");
}

#[tokio::test]
async fn full_flow_persists_session_and_presents_success() {
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/login/oauth/access_token")
        .match_body(Matcher::UrlEncoded("code".into(), "abc123".into()))
        .with_status(200)
        .with_body("access_token=tok_xyz&scope=&token_type=bearer")
        .create_async()
        .await;
    server
        .mock("GET", "/user")
        .match_header("authorization", "Bearer tok_xyz")
        .with_status(200)
        .with_body(r#"{"login":"octocat","id":583231}"#)
        .create_async()
        .await;

    let config = RecordingConfig::default();
    let presenter = RecordingPresenter::default();
    let browser = RecordingBrowser::default();

    let flow = LoginFlow::new(
        mocked_config(&server),
        config.clone(),
        presenter.clone(),
        browser.clone(),
    )
    .unwrap()
    .with_options(immediate_options());
    let flow_task = tokio::spawn(flow.execute());

    let port = port_from_browser(&browser).await;
    let response = reqwest::get(format!(
        "http://127.0.0.1:{port}/github/oauth/callback?code=abc123&state={port}"
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Success"));

    flow_task.await.unwrap().unwrap();
    token_mock.assert_async().await;

    let state = config.0.lock().unwrap();
    assert!(state.logged_in);
    assert_eq!(state.access_token.as_deref(), Some("tok_xyz"));
    assert_eq!(state.user_login.as_deref(), Some("octocat"));
    assert_eq!(state.writes, 1);
    assert_eq!(*presenter.0.lock().unwrap(), vec![LoginOutcome::Success]);
}

#[tokio::test]
async fn denied_authorization_fails_without_touching_exchange_or_config() {
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/login/oauth/access_token")
        .expect(0)
        .create_async()
        .await;

    let config = RecordingConfig::default();
    let presenter = RecordingPresenter::default();
    let browser = RecordingBrowser::default();

    let flow = LoginFlow::new(
        mocked_config(&server),
        config.clone(),
        presenter.clone(),
        browser.clone(),
    )
    .unwrap()
    .with_options(immediate_options());
    let flow_task = tokio::spawn(flow.execute());

    let port = port_from_browser(&browser).await;
    reqwest::get(format!(
        "http://127.0.0.1:{port}/github/oauth/callback?error=access_denied"
    ))
    .await
    .unwrap();

    let err = flow_task.await.unwrap().unwrap_err();
    assert!(matches!(err, AuthError::Provider(_)));
    assert!(err.to_string().contains("no code"));
    token_mock.assert_async().await;

    assert_eq!(config.0.lock().unwrap().writes, 0);
    let outcomes = presenter.0.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], LoginOutcome::Failure { ref reason } if reason.contains("no code")));
}

#[tokio::test]
async fn bind_failure_reports_before_any_url_is_emitted() {
    // 192.0.2.0/24 is TEST-NET; binding it fails without needing to exhaust
    // real ports.
    let oauth = OAuthConfig::builder()
        .client_id("cid123")
        .client_secret("sec456")
        .bind_addr("192.0.2.1:0")
        .build();

    let config = RecordingConfig::default();
    let presenter = RecordingPresenter::default();
    let browser = RecordingBrowser::default();

    let flow = LoginFlow::new(oauth, config.clone(), presenter.clone(), browser.clone())
        .unwrap()
        .with_options(immediate_options());
    let err = flow.execute().await.unwrap_err();

    assert!(matches!(err, AuthError::Bind(_)));
    assert!(browser.0.lock().unwrap().is_empty());
    let outcomes = presenter.0.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], LoginOutcome::Failure { .. }));
}

#[tokio::test]
async fn failed_config_write_is_fatal_after_exchange() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/login/oauth/access_token")
        .with_status(200)
        .with_body("access_token=tok_xyz")
        .create_async()
        .await;
    server
        .mock("GET", "/user")
        .with_status(200)
        .with_body(r#"{"login":"octocat","id":583231}"#)
        .create_async()
        .await;

    let config = RecordingConfig::default();
    config.0.lock().unwrap().fail_write = true;
    let presenter = RecordingPresenter::default();
    let browser = RecordingBrowser::default();

    let flow = LoginFlow::new(
        mocked_config(&server),
        config.clone(),
        presenter.clone(),
        browser.clone(),
    )
    .unwrap()
    .with_options(immediate_options());
    let flow_task = tokio::spawn(flow.execute());

    let port = port_from_browser(&browser).await;
    reqwest::get(format!(
        "http://127.0.0.1:{port}/github/oauth/callback?code=abc123&state={port}"
    ))
    .await
    .unwrap();

    let err = flow_task.await.unwrap().unwrap_err();
    assert!(matches!(err, AuthError::Persist(_)));
    assert_eq!(presenter.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn receiver_emits_exactly_one_outcome_for_duplicate_redirects() {
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/login/oauth/access_token")
        .expect(1)
        .with_status(200)
        .with_body("access_token=tok_once")
        .create_async()
        .await;

    let oauth = mocked_config(&server);
    let client = GitHubClient::new(oauth.clone()).unwrap();
    let receiver = CallbackReceiver::start(&oauth, client).await.unwrap();
    let port = receiver.port();
    let callback = format!("http://127.0.0.1:{port}/github/oauth/callback?code=abc123&state={port}");

    let first = reqwest::get(&callback).await.unwrap().text().await.unwrap();
    assert!(first.contains("Success"));

    // The provider double-delivers: accepted by the socket, outcome dropped.
    let second = reqwest::get(&callback).await.unwrap().text().await.unwrap();
    assert!(second.contains("Already completed"));

    let token = receiver.wait(Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(token.secret(), "tok_once");
    token_mock.assert_async().await;
}

#[tokio::test]
async fn receiver_rejects_code_with_wrong_state() {
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/login/oauth/access_token")
        .expect(0)
        .create_async()
        .await;

    let oauth = mocked_config(&server);
    let client = GitHubClient::new(oauth.clone()).unwrap();
    let receiver = CallbackReceiver::start(&oauth, client).await.unwrap();
    let port = receiver.port();

    reqwest::get(format!(
        "http://127.0.0.1:{port}/github/oauth/callback?code=abc123&state=000000"
    ))
    .await
    .unwrap();

    let err = receiver
        .wait(Some(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::StateMismatch));
    token_mock.assert_async().await;
}

#[tokio::test]
async fn receiver_times_out_when_no_callback_arrives() {
    let server = mockito::Server::new_async().await;
    let oauth = mocked_config(&server);
    let client = GitHubClient::new(oauth.clone()).unwrap();
    let receiver = CallbackReceiver::start(&oauth, client).await.unwrap();

    let err = receiver
        .wait(Some(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Timeout));
}

#[tokio::test]
async fn exchange_failure_surfaces_through_the_receiver() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/login/oauth/access_token")
        .with_status(502)
        .create_async()
        .await;

    let oauth = mocked_config(&server);
    let client = GitHubClient::new(oauth.clone()).unwrap();
    let receiver = CallbackReceiver::start(&oauth, client).await.unwrap();
    let port = receiver.port();

    let response = reqwest::get(format!(
        "http://127.0.0.1:{port}/github/oauth/callback?code=abc123&state={port}"
    ))
    .await
    .unwrap();
    // The browser tab still gets an answer instead of hanging.
    assert!(response.text().await.unwrap().contains("failed"));

    let err = receiver
        .wait(Some(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ExchangeRejected { status: 502 }));
}

#[tokio::test]
async fn authorize_url_matches_receiver_state() {
    let server = mockito::Server::new_async().await;
    let oauth = mocked_config(&server);
    let client = GitHubClient::new(oauth.clone()).unwrap();
    let receiver = CallbackReceiver::start(&oauth, client).await.unwrap();

    let request = AuthorizationRequest::new(&oauth, receiver.port()).unwrap();
    assert_eq!(request.state, receiver.state());
    assert!(request.authorize_url.contains(&format!("state={}", receiver.port())));
}
