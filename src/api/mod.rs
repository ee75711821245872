//! # API Module
//!
//! HTTP handlers of the dashboard server and of the temporary callback
//! server used by `euterpe auth`.
//!
//! ## Endpoints
//!
//! - Analytics views (see [`analytics`]): JSON, `time_range` query where it
//!   applies.
//! - Sign-in: [`login`], [`callback`], [`logout`] for per-user deployments.
//! - [`dashboard`] and [`health`].
//!
//! ## Status codes
//!
//! A request without a usable credential fails with 401 in per-user mode
//! and 503 in single-owner mode. Upstream failures map to 502. Bodies are
//! always `{"error": "..."}`.

use std::{future::Future, sync::Arc};

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    Res,
    config::DeploymentMode,
    error::Error,
    management::SESSION_COOKIE,
    server::ServerState,
    spotify::Catalog,
    types::Identity,
};

mod analytics;
mod auth;
mod callback;
mod health;

pub use analytics::{
    TimeRangeQuery, artists_falling_off, artists_standing_test_of_time, hidden_gems,
    music_variety_by_season, release_year_trends, top_albums, top_artists, top_playlists,
    top_songs,
};
pub use auth::{callback, dashboard, login, logout};
pub use callback::enrollment_callback;
pub use health::health;

/// A pipeline failure, rendered according to the deployment mode.
#[derive(Debug)]
pub struct ApiError {
    mode: DeploymentMode,
    error: Error,
}

impl ApiError {
    pub fn new(mode: DeploymentMode, error: Error) -> Self {
        Self { mode, error }
    }

    pub fn status(&self) -> StatusCode {
        match (&self.error, self.mode) {
            (Error::Unauthenticated(_), DeploymentMode::PerUser) => StatusCode::UNAUTHORIZED,
            (Error::Unauthenticated(_), DeploymentMode::SingleOwner) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            (
                Error::UpstreamUnavailable(_)
                | Error::PartialResolution { .. }
                | Error::MalformedUpstreamRecord(_),
                _,
            ) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match (&self.error, self.mode) {
            (Error::Unauthenticated(_), DeploymentMode::PerUser) => {
                "not signed in with Spotify".to_string()
            }
            (Error::Unauthenticated(_), DeploymentMode::SingleOwner) => {
                "owner account is not connected".to_string()
            }
            (Error::UpstreamUnavailable(_), _) => "Spotify is unavailable".to_string(),
            (e, _) => e.to_string(),
        };

        if status.is_server_error() {
            warn!(%status, error = %self.error, "request failed");
        } else {
            debug!(%status, error = %self.error, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// The identity whose credential serves this request.
///
/// Single-owner deployments always act as the owner. Per-user deployments
/// need a live session cookie.
#[derive(Debug, Clone)]
pub struct Acting(pub Identity);

/// User id behind the request's session cookie, if any.
pub(crate) fn session_user(jar: &CookieJar, state: &ServerState) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.user_for(cookie.value()))
}

impl FromRequestParts<ServerState> for Acting {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        match state.mode() {
            DeploymentMode::SingleOwner => Ok(Acting(Identity::Owner)),
            DeploymentMode::PerUser => {
                let jar = CookieJar::from_headers(&parts.headers);
                session_user(&jar, state)
                    .map(|user| Acting(Identity::User(user)))
                    .ok_or_else(|| {
                        ApiError::new(
                            state.mode(),
                            Error::Unauthenticated("no session".to_string()),
                        )
                    })
            }
        }
    }
}

/// Runs an analytics pipeline for `identity` and wraps the result as JSON.
pub(crate) async fn respond<T, F, Fut>(
    state: &ServerState,
    identity: &Identity,
    op: F,
) -> Result<Json<T>, ApiError>
where
    F: Fn(Arc<dyn Catalog>) -> Fut,
    Fut: Future<Output = Res<T>>,
{
    state
        .run(identity, op)
        .await
        .map(Json)
        .map_err(|e| ApiError::new(state.mode(), e))
}
