use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    Res,
    api::session_user,
    config::DeploymentMode,
    error::Error,
    management::SESSION_COOKIE,
    server::ServerState,
    spotify::{auth::authorize_url, normalize},
    types::{Identity, UserProfile},
    utils,
};

const DASHBOARD_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Euterpe</title></head>
<body>
<h1>Euterpe</h1>
<ul>
<li><a href="/top_songs">Top songs</a></li>
<li><a href="/top_artists">Top artists</a></li>
<li><a href="/top_albums">Top albums</a></li>
<li><a href="/top_playlists">Top playlists</a></li>
<li><a href="/hidden_gems">Hidden gems</a></li>
<li><a href="/artists_standing_test_of_time">Standing the test of time</a></li>
<li><a href="/artists_falling_off">Falling off</a></li>
<li><a href="/release_year_trends">Release year trends</a></li>
<li><a href="/music_variety_by_season">Music variety by season</a></li>
</ul>
<p>Add <code>?time_range=short_term</code>, <code>medium_term</code> or <code>long_term</code> where it applies.</p>
</body>
</html>"#;

/// `message` is inserted as markup and must be a fixed string.
fn failure_page(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        Html(format!(
            "<h2>Sign-in failed.</h2><p>{}</p><p><a href=\"/login\">Try again</a></p>",
            message
        )),
    )
        .into_response()
}

fn owner_mode_page() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html("<h4>This dashboard runs in single-owner mode. Connect the owner account with <code>euterpe auth</code>.</h4>"),
    )
        .into_response()
}

pub async fn dashboard(State(state): State<ServerState>, jar: CookieJar) -> Response {
    if state.mode() == DeploymentMode::PerUser && session_user(&jar, &state).is_none() {
        return Redirect::to("/login").into_response();
    }
    Html(DASHBOARD_HTML).into_response()
}

/// Starts the authorization code flow with a fresh PKCE verifier.
pub async fn login(State(state): State<ServerState>) -> Response {
    if state.mode() == DeploymentMode::SingleOwner {
        return owner_mode_page();
    }

    let (login_state, verifier) = state.sessions.begin_login();
    let challenge = utils::generate_code_challenge(&verifier);
    match authorize_url(&state.settings, &challenge, &login_state) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => {
            warn!(error = %e, "cannot build authorization url");
            failure_page(StatusCode::INTERNAL_SERVER_ERROR, "Sign-in is misconfigured.")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

async fn complete_login(state: &ServerState, code: &str, verifier: &str) -> Res<UserProfile> {
    let token = state
        .credentials
        .authorizer()
        .exchange_code(code, verifier)
        .await?;
    let profile = normalize::user(
        state
            .catalogs
            .catalog(&token.access_token)
            .current_user()
            .await?,
    )?;
    state
        .credentials
        .enroll(&Identity::User(profile.id.clone()), token, &profile)
        .await?;
    Ok(profile)
}

/// Finishes sign-in: token exchange, profile lookup, credential storage and
/// the session cookie.
pub async fn callback(
    State(state): State<ServerState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    if state.mode() == DeploymentMode::SingleOwner {
        return owner_mode_page();
    }
    if let Some(reason) = params.error {
        // The value comes from the query string and is never rendered.
        warn!(%reason, "authorization denied upstream");
        return failure_page(StatusCode::BAD_REQUEST, "Spotify did not grant access.");
    }
    let (Some(code), Some(login_state)) = (params.code, params.state) else {
        return failure_page(StatusCode::BAD_REQUEST, "Missing authorization code.");
    };
    let Some(verifier) = state.sessions.finish_login(&login_state) else {
        return failure_page(StatusCode::BAD_REQUEST, "This sign-in link expired.");
    };

    match complete_login(&state, &code, &verifier).await {
        Ok(profile) => {
            info!(user = %profile.id, "user signed in");
            let session_id = state.sessions.create(&profile.id);
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true)
                .secure(state.settings.secure_cookies)
                .same_site(SameSite::Lax);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(Error::Unauthenticated(reason)) => {
            warn!(%reason, "authorization code rejected");
            failure_page(StatusCode::UNAUTHORIZED, "Spotify rejected the authorization.")
        }
        Err(e) => {
            warn!(error = %e, "sign-in failed");
            failure_page(StatusCode::BAD_GATEWAY, "Could not reach Spotify.")
        }
    }
}

/// Ends the session. The stored credential stays so the next sign-in is
/// quick.
pub async fn logout(State(state): State<ServerState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.end(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login")).into_response()
}
