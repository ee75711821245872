use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::{
    config::Settings,
    error,
    management::{CredentialManager, TokenStore},
    server::{EnrollmentState, start_enrollment_server},
    spotify::{
        Catalog, SpotifyClient,
        auth::{AccountsClient, Authorizer, authorize_url},
        client::http_client,
        normalize,
    },
    success,
    types::{Identity, PkceToken, Token},
    utils, warning,
};

/// How long the command waits for the browser to come back.
const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Connects the owner account used in single-owner mode.
///
/// Starts a local callback server on the configured address, opens the
/// authorization page in the browser and stores the resulting credential
/// under the owner identity.
pub async fn auth(settings: &Settings) {
    let http = match http_client() {
        Ok(http) => http,
        Err(e) => error!("{}", e),
    };
    let authorizer: Arc<dyn Authorizer> = Arc::new(AccountsClient::new(http.clone(), settings));

    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let login_state = utils::generate_session_id();

    let auth_url = match authorize_url(settings, &code_challenge, &login_state) {
        Ok(url) => url,
        Err(e) => error!("{}", e),
    };

    let shared_state = Arc::new(Mutex::new(Some(PkceToken {
        code_verifier,
        token: None,
    })));

    let enrollment = EnrollmentState {
        pkce: Arc::clone(&shared_state),
        authorizer: Arc::clone(&authorizer),
        expected_state: login_state,
    };
    let addr = settings.server_addr;
    let server = tokio::spawn(async move {
        if let Err(e) = start_enrollment_server(addr, enrollment).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    if webbrowser::open(auth_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let pb = utils::spinner("Waiting for authorization in the browser...");
    let token = wait_for_token(shared_state).await;
    pb.finish_and_clear();
    server.abort();

    let Some(token) = token else {
        error!("Authentication failed or timed out.")
    };

    let catalog = SpotifyClient::new(http, settings.api_url.clone(), token.access_token.clone());
    let profile = match catalog.current_user().await.and_then(normalize::user) {
        Ok(profile) => profile,
        Err(e) => error!("Cannot read the Spotify profile. Err: {}", e),
    };

    let credentials = CredentialManager::new(TokenStore::new(&settings.data_dir), authorizer);
    match credentials.enroll(&Identity::Owner, token, &profile).await {
        Ok(record) => success!(
            "Connected as {} (credential version {}).",
            record.display_name,
            record.version
        ),
        Err(e) => error!("Failed to store the credential. Err: {}", e),
    }
}

/// Forgets the stored owner credential.
pub async fn revoke(settings: &Settings) {
    let http = match http_client() {
        Ok(http) => http,
        Err(e) => error!("{}", e),
    };
    let authorizer: Arc<dyn Authorizer> = Arc::new(AccountsClient::new(http, settings));
    let credentials = CredentialManager::new(TokenStore::new(&settings.data_dir), authorizer);

    match credentials.revoke(&Identity::Owner).await {
        Ok(()) => success!("Owner credential removed."),
        Err(e) => error!("Failed to remove the credential. Err: {}", e),
    }
}

async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    let start = Instant::now();

    while start.elapsed() < AUTH_TIMEOUT {
        let lock = shared_state.lock().await;
        if let Some(token) = lock.as_ref().and_then(|pkce| pkce.token.clone()) {
            return Some(token);
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}
