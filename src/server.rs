use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    Res, api,
    config::{DeploymentMode, Settings},
    management::{CredentialManager, SessionStore, TokenStore},
    spotify::{
        Catalog, CatalogFactory, SpotifyCatalogFactory,
        auth::{AccountsClient, Authorizer},
        client::http_client,
    },
    types::{Identity, PkceToken},
};

/// Everything a dashboard request needs, cloned into each handler.
#[derive(Clone)]
pub struct ServerState {
    pub settings: Arc<Settings>,
    pub credentials: Arc<CredentialManager>,
    pub sessions: Arc<SessionStore>,
    pub catalogs: Arc<dyn CatalogFactory>,
}

impl ServerState {
    pub fn new(
        settings: Settings,
        credentials: CredentialManager,
        catalogs: Arc<dyn CatalogFactory>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            credentials: Arc::new(credentials),
            sessions: Arc::new(SessionStore::new()),
            catalogs,
        }
    }

    /// Wires the reqwest-backed accounts and catalog clients.
    pub fn from_settings(settings: Settings) -> Res<Self> {
        let http = http_client()?;
        let authorizer: Arc<dyn Authorizer> = Arc::new(AccountsClient::new(http.clone(), &settings));
        let credentials = CredentialManager::new(TokenStore::new(&settings.data_dir), authorizer);
        let catalogs = Arc::new(SpotifyCatalogFactory::new(http, settings.api_url.clone()));
        Ok(Self::new(settings, credentials, catalogs))
    }

    pub fn mode(&self) -> DeploymentMode {
        self.settings.mode
    }

    /// Runs `op` against a catalog authorized as `identity`, with one
    /// refresh-and-retry if the upstream rejects the access token.
    pub async fn run<T, F, Fut>(&self, identity: &Identity, op: F) -> Res<T>
    where
        F: Fn(Arc<dyn Catalog>) -> Fut,
        Fut: Future<Output = Res<T>>,
    {
        self.credentials
            .run_authorized(identity, |token| op(self.catalogs.catalog(&token)))
            .await
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(api::dashboard))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/logout", get(api::logout))
        .route("/health", get(api::health))
        .route("/top_albums", get(api::top_albums))
        .route("/top_songs", get(api::top_songs))
        .route("/top_artists", get(api::top_artists))
        .route("/top_playlists", get(api::top_playlists))
        .route("/hidden_gems", get(api::hidden_gems))
        .route(
            "/artists_standing_test_of_time",
            get(api::artists_standing_test_of_time),
        )
        .route("/artists_falling_off", get(api::artists_falling_off))
        .route("/release_year_trends", get(api::release_year_trends))
        .route("/music_variety_by_season", get(api::music_variety_by_season))
        .with_state(state)
}

/// Serves the dashboard until the process is stopped.
pub async fn start_api_server(settings: Settings) -> Res<()> {
    let addr = settings.server_addr;
    let mode = settings.mode;
    let state = ServerState::from_settings(settings)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, %mode, "dashboard listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// State of the temporary callback server used by `euterpe auth`.
#[derive(Clone)]
pub struct EnrollmentState {
    pub pkce: Arc<Mutex<Option<PkceToken>>>,
    pub authorizer: Arc<dyn Authorizer>,
    pub expected_state: String,
}

pub fn enrollment_router(state: EnrollmentState) -> Router {
    Router::new()
        .route("/callback", get(api::enrollment_callback))
        .with_state(state)
}

pub async fn start_enrollment_server(addr: SocketAddr, state: EnrollmentState) -> Res<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "waiting for the authorization callback");
    axum::serve(listener, enrollment_router(state)).await?;
    Ok(())
}
