use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::{
    Res,
    error::Error,
    management::store::{CredentialRecord, TokenStore},
    spotify::auth::Authorizer,
    types::{Identity, Token, UserProfile},
};

/// Access tokens expiring within this window are refreshed before use.
pub const REFRESH_LEEWAY_SECS: i64 = 120;

/// Hands out valid access tokens per identity.
///
/// Check-expiry, refresh and persist for one identity run inside that
/// identity's async lock. A request that waited on the lock re-reads the
/// record and takes the fresh token if the version moved while it waited.
pub struct CredentialManager {
    store: TokenStore,
    authorizer: Arc<dyn Authorizer>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    leeway: Duration,
}

impl CredentialManager {
    pub fn new(store: TokenStore, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            store,
            authorizer,
            locks: Mutex::new(HashMap::new()),
            leeway: Duration::seconds(REFRESH_LEEWAY_SECS),
        }
    }

    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        Arc::clone(&self.authorizer)
    }

    fn lock_for(&self, identity: &Identity) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(identity.key()).or_default())
    }

    /// The stored record, if any, without refreshing.
    pub async fn current(&self, identity: &Identity) -> Res<Option<CredentialRecord>> {
        self.store.load(identity).await
    }

    async fn load_required(&self, identity: &Identity) -> Res<CredentialRecord> {
        self.store
            .load(identity)
            .await?
            .ok_or_else(|| Error::Unauthenticated(format!("no credential stored for {}", identity)))
    }

    /// A record whose access token is valid for at least the leeway window.
    pub async fn valid_credential(&self, identity: &Identity) -> Res<CredentialRecord> {
        let record = self.load_required(identity).await?;
        if !record.expires_within(self.leeway) {
            return Ok(record);
        }
        self.refresh_after(identity, record.version).await
    }

    /// Refreshes the credential unless a newer version than `observed_version`
    /// was written while waiting for the lock.
    pub async fn refresh_after(
        &self,
        identity: &Identity,
        observed_version: u64,
    ) -> Res<CredentialRecord> {
        let lock = self.lock_for(identity);
        let _guard = lock.lock().await;

        let current = self.load_required(identity).await?;
        if current.version > observed_version && !current.expires_within(self.leeway) {
            debug!(%identity, version = current.version, "credential refreshed concurrently, reusing it");
            return Ok(current);
        }

        info!(%identity, "refreshing access token");
        let token = self.authorizer.refresh(&current.refresh_token).await?;
        let updated = current.refreshed(token);
        self.store.persist(&updated).await?;
        Ok(updated)
    }

    /// Stores the credential obtained from a completed authorization.
    pub async fn enroll(
        &self,
        identity: &Identity,
        token: Token,
        profile: &UserProfile,
    ) -> Res<CredentialRecord> {
        let lock = self.lock_for(identity);
        let _guard = lock.lock().await;

        let version = match self.store.load(identity).await {
            Ok(Some(previous)) => previous.version + 1,
            Ok(None) => 1,
            Err(e) => {
                warn!(%identity, error = %e, "unreadable credential record, overwriting");
                1
            }
        };
        let record = CredentialRecord::new(identity, token, profile, version)?;
        self.store.persist(&record).await?;
        Ok(record)
    }

    pub async fn revoke(&self, identity: &Identity) -> Res<()> {
        let lock = self.lock_for(identity);
        let _guard = lock.lock().await;
        self.store.remove(identity).await
    }

    /// Runs `op` with a valid access token. If the upstream rejects the
    /// token anyway, refreshes once and runs `op` a second time.
    pub async fn run_authorized<T, F, Fut>(&self, identity: &Identity, op: F) -> Res<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Res<T>>,
    {
        let record = self.valid_credential(identity).await?;
        match op(record.access_token.clone()).await {
            Err(e) if e.is_unauthenticated() => {
                warn!(%identity, error = %e, "access token rejected, refreshing once");
                let refreshed = self.refresh_after(identity, record.version).await?;
                op(refreshed.access_token).await
            }
            other => other,
        }
    }
}
