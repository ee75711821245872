use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use tracing::warn;

use crate::{
    Res, config::Settings, error::Error, spotify::model::TokenResponse, types::Token,
};

/// Token lifetime assumed when the accounts service omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Builds the authorization URL for the PKCE authorization code flow.
///
/// `state` is echoed back on the callback and ties it to the pending login
/// that owns `code_challenge`'s verifier.
pub fn authorize_url(settings: &Settings, code_challenge: &str, state: &str) -> Res<Url> {
    Url::parse_with_params(
        &settings.auth_url,
        &[
            ("client_id", settings.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", settings.redirect_uri.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", settings.scope.as_str()),
            ("state", state),
            ("show_dialog", "true"),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid SPOTIFY_API_AUTH_URL: {}", e)))
}

/// The accounts-service side of OAuth: code exchange and refresh.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Exchanges an authorization code plus its PKCE verifier for a token.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Res<Token>;

    /// Exchanges a refresh token for a new access token. The refresh token
    /// may or may not be rotated.
    async fn refresh(&self, refresh_token: &str) -> Res<Token>;
}

#[derive(Clone)]
pub struct AccountsClient {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl AccountsClient {
    pub fn new(http: Client, settings: &Settings) -> Self {
        Self {
            http,
            token_url: settings.token_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
        }
    }

    async fn request_token(&self, form: &[(&str, &str)], grant: &str) -> Res<Token> {
        let mut request = self.http.post(&self.token_url).form(form);
        if let Some(secret) = &self.client_secret {
            request = request.basic_auth(&self.client_id, Some(secret));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("{} request failed: {}", grant, e)))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            warn!(grant, %status, "accounts service refused the grant");
            return Err(Error::Unauthenticated(format!(
                "{} refused: {}",
                grant,
                body.trim()
            )));
        }
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "{} returned {}",
                grant, status
            )));
        }

        let json: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("{} response: {}", grant, e)))?;

        Ok(Token {
            access_token: json.access_token,
            refresh_token: json.refresh_token.filter(|t| !t.is_empty()),
            scope: json.scope.unwrap_or_default(),
            token_type: json.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: json.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            obtained_at: Utc::now().timestamp(),
        })
    }
}

#[async_trait]
impl Authorizer for AccountsClient {
    async fn exchange_code(&self, code: &str, verifier: &str) -> Res<Token> {
        let token = self
            .request_token(
                &[
                    ("grant_type", "authorization_code"),
                    ("client_id", self.client_id.as_str()),
                    ("code", code),
                    ("code_verifier", verifier),
                    ("redirect_uri", self.redirect_uri.as_str()),
                ],
                "authorization_code",
            )
            .await?;

        if token.refresh_token.is_none() {
            return Err(Error::Unauthenticated(
                "authorization response carried no refresh token".to_string(),
            ));
        }
        Ok(token)
    }

    async fn refresh(&self, refresh_token: &str) -> Res<Token> {
        self.request_token(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
            ],
            "refresh_token",
        )
        .await
    }
}
