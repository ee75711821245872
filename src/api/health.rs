use axum::{extract::State, response::Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};
use tracing::debug;

use crate::{api::session_user, config::DeploymentMode, server::ServerState, types::Identity};

/// Liveness plus whether a credential is on file for the acting identity.
/// Never refreshes or calls the upstream.
pub async fn health(State(state): State<ServerState>, jar: CookieJar) -> Json<Value> {
    let identity = match state.mode() {
        DeploymentMode::SingleOwner => Some(Identity::Owner),
        DeploymentMode::PerUser => session_user(&jar, &state).map(Identity::User),
    };

    let display_name = match &identity {
        Some(identity) => match state.credentials.current(identity).await {
            Ok(record) => record.map(|r| r.display_name),
            Err(e) => {
                debug!(%identity, error = %e, "credential record unreadable");
                None
            }
        },
        None => None,
    };

    Json(match state.mode() {
        DeploymentMode::PerUser => json!({
            "status": "healthy",
            "authenticated": display_name.is_some(),
            "user": display_name,
        }),
        DeploymentMode::SingleOwner => json!({
            "status": "healthy",
            "connected": display_name.is_some(),
            "owner": display_name,
        }),
    })
}
