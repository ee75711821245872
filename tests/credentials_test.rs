use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use euterpe::{
    Res,
    error::Error,
    management::{CredentialManager, TokenStore},
    spotify::auth::Authorizer,
    types::{Identity, Token, UserProfile},
};
use tempfile::TempDir;
use tokio::task::JoinSet;

fn token(access: &str, refresh: Option<&str>, expires_in: u64) -> Token {
    Token {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        scope: "user-top-read".to_string(),
        token_type: "Bearer".to_string(),
        expires_in,
        obtained_at: Utc::now().timestamp(),
    }
}

fn profile() -> UserProfile {
    UserProfile {
        id: "owner-id".to_string(),
        display_name: "Owner".to_string(),
    }
}

#[derive(Default)]
struct CountingAuthorizer {
    refreshes: AtomicUsize,
    delay_ms: u64,
}

#[async_trait]
impl Authorizer for CountingAuthorizer {
    async fn exchange_code(&self, code: &str, _verifier: &str) -> Res<Token> {
        Ok(token(&format!("access-{}", code), Some("refresh-1"), 3600))
    }

    async fn refresh(&self, refresh_token: &str) -> Res<Token> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        if refresh_token == "revoked" {
            return Err(Error::Unauthenticated("invalid_grant".into()));
        }
        Ok(token(&format!("refreshed-{}", n), None, 3600))
    }
}

fn manager(dir: &TempDir, authorizer: Arc<CountingAuthorizer>) -> CredentialManager {
    CredentialManager::new(TokenStore::new(dir.path()), authorizer)
}

#[tokio::test]
async fn test_fresh_credential_is_used_as_is() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(CountingAuthorizer::default());
    let credentials = manager(&dir, authorizer.clone());

    credentials
        .enroll(&Identity::Owner, token("a1", Some("r1"), 3600), &profile())
        .await
        .unwrap();

    let record = credentials.valid_credential(&Identity::Owner).await.unwrap();
    assert_eq!(record.access_token, "a1");
    assert_eq!(record.version, 1);
    assert_eq!(authorizer.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expiring_credential_is_refreshed_and_persisted() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(CountingAuthorizer::default());
    let credentials = manager(&dir, authorizer.clone());

    // Inside the two minute leeway.
    credentials
        .enroll(&Identity::Owner, token("a1", Some("r1"), 60), &profile())
        .await
        .unwrap();

    let record = credentials.valid_credential(&Identity::Owner).await.unwrap();
    assert_eq!(record.access_token, "refreshed-1");
    assert_eq!(record.refresh_token, "r1");
    assert_eq!(record.version, 2);

    // A second manager over the same directory sees the persisted record.
    let reloaded = manager(&dir, Arc::new(CountingAuthorizer::default()));
    let stored = reloaded.current(&Identity::Owner).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "refreshed-1");
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(CountingAuthorizer {
        delay_ms: 50,
        ..Default::default()
    });
    let credentials = Arc::new(manager(&dir, authorizer.clone()));

    credentials
        .enroll(&Identity::Owner, token("stale", Some("r1"), 0), &profile())
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let credentials = Arc::clone(&credentials);
        tasks.spawn(async move {
            credentials
                .valid_credential(&Identity::Owner)
                .await
                .map(|r| r.access_token)
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert_eq!(result.unwrap().unwrap(), "refreshed-1");
    }
    assert_eq!(authorizer.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_identities_do_not_share_records() {
    let dir = TempDir::new().unwrap();
    let credentials = manager(&dir, Arc::new(CountingAuthorizer::default()));
    let alice = Identity::User("alice".into());

    credentials
        .enroll(&alice, token("alice-token", Some("r"), 3600), &profile())
        .await
        .unwrap();

    assert!(credentials.current(&Identity::Owner).await.unwrap().is_none());
    let err = credentials
        .valid_credential(&Identity::User("bob".into()))
        .await
        .unwrap_err();
    assert!(err.is_unauthenticated());
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_once_and_retried() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(CountingAuthorizer::default());
    let credentials = manager(&dir, authorizer.clone());
    credentials
        .enroll(&Identity::Owner, token("revoked-upstream", Some("r1"), 3600), &profile())
        .await
        .unwrap();

    let attempts = AtomicUsize::new(0);
    let result = credentials
        .run_authorized(&Identity::Owner, |access_token| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if access_token == "revoked-upstream" {
                    Err(Error::Unauthenticated("401".into()))
                } else {
                    Ok(access_token)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result, "refreshed-1");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(authorizer.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_happens_only_once() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(CountingAuthorizer::default());
    let credentials = manager(&dir, authorizer.clone());
    credentials
        .enroll(&Identity::Owner, token("a1", Some("r1"), 3600), &profile())
        .await
        .unwrap();

    let attempts = AtomicUsize::new(0);
    let err = credentials
        .run_authorized(&Identity::Owner, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::Unauthenticated("401".into())) }
        })
        .await
        .unwrap_err();

    assert!(err.is_unauthenticated());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(authorizer.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upstream_failure_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(CountingAuthorizer::default());
    let credentials = manager(&dir, authorizer.clone());
    credentials
        .enroll(&Identity::Owner, token("a1", Some("r1"), 3600), &profile())
        .await
        .unwrap();

    let attempts = AtomicUsize::new(0);
    let err = credentials
        .run_authorized(&Identity::Owner, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::UpstreamUnavailable("503".into())) }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UpstreamUnavailable(_)));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(authorizer.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refused_refresh_is_unauthenticated() {
    let dir = TempDir::new().unwrap();
    let credentials = manager(&dir, Arc::new(CountingAuthorizer::default()));
    credentials
        .enroll(&Identity::Owner, token("a1", Some("revoked"), 0), &profile())
        .await
        .unwrap();

    let err = credentials
        .valid_credential(&Identity::Owner)
        .await
        .unwrap_err();
    assert!(err.is_unauthenticated());
}

#[tokio::test]
async fn test_reenroll_bumps_version_and_revoke_forgets() {
    let dir = TempDir::new().unwrap();
    let credentials = manager(&dir, Arc::new(CountingAuthorizer::default()));

    credentials
        .enroll(&Identity::Owner, token("a1", Some("r1"), 3600), &profile())
        .await
        .unwrap();
    let second = credentials
        .enroll(&Identity::Owner, token("a2", Some("r2"), 3600), &profile())
        .await
        .unwrap();
    assert_eq!(second.version, 2);

    credentials.revoke(&Identity::Owner).await.unwrap();
    assert!(credentials.current(&Identity::Owner).await.unwrap().is_none());
}
