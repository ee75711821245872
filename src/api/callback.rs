use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::Html,
};

use crate::{server::EnrollmentState, warning};

/// Callback of the local server started by `euterpe auth`.
///
/// Exchanges the code with the verifier held in the shared state and
/// leaves the token there for the waiting command to pick up.
pub async fn enrollment_callback(
    State(enrollment): State<EnrollmentState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    if params.get("state") != Some(&enrollment.expected_state) {
        return Html("<h4>Unexpected authorization state.</h4>");
    }
    let Some(code) = params.get("code") else {
        return Html("<h4>Missing authorization code.</h4>");
    };

    let mut state = enrollment.pkce.lock().await;
    let Some(pkce_state) = state.as_mut() else {
        return Html("<h4>Missing PKCE code verifier.</h4>");
    };

    match enrollment
        .authorizer
        .exchange_code(code, &pkce_state.code_verifier)
        .await
    {
        Ok(token) => {
            pkce_state.token = Some(token);
            Html("<h2>Authentication successful.</h2><p>Close this browser window.</p>")
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            Html("<h4>Login failed.</h4>")
        }
    }
}
