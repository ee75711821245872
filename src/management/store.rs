use std::{io::ErrorKind, path::PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Res,
    error::Error,
    types::{Identity, Token, UserProfile},
};

/// The stored credential of one identity.
///
/// `version` increases by one on every write, which lets a request that
/// waited on a refresh lock tell whether somebody else already refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub identity: String,
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub version: u64,
    pub spotify_user_id: String,
    pub display_name: String,
    pub updated_at: DateTime<Utc>,
}

fn expiry_of(token: &Token) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(token.obtained_at + token.expires_in as i64, 0)
        .unwrap_or_else(Utc::now)
}

impl CredentialRecord {
    pub fn new(identity: &Identity, token: Token, profile: &UserProfile, version: u64) -> Res<Self> {
        let expires_at = expiry_of(&token);
        let refresh_token = token.refresh_token.ok_or_else(|| {
            Error::Unauthenticated("token without refresh token cannot be stored".to_string())
        })?;

        Ok(Self {
            identity: identity.key(),
            access_token: token.access_token,
            refresh_token,
            scope: token.scope,
            token_type: token.token_type,
            expires_at,
            version,
            spotify_user_id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            updated_at: Utc::now(),
        })
    }

    /// True when the access token is expired or expires within `leeway`.
    pub fn expires_within(&self, leeway: Duration) -> bool {
        self.expires_at <= Utc::now() + leeway
    }

    /// The record after a successful refresh. Keeps the old refresh token
    /// unless the accounts service rotated it.
    pub fn refreshed(&self, token: Token) -> Self {
        let expires_at = expiry_of(&token);
        Self {
            identity: self.identity.clone(),
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .unwrap_or_else(|| self.refresh_token.clone()),
            scope: if token.scope.is_empty() {
                self.scope.clone()
            } else {
                token.scope
            },
            token_type: token.token_type,
            expires_at,
            version: self.version + 1,
            spotify_user_id: self.spotify_user_id.clone(),
            display_name: self.display_name.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// JSON file per identity under `<data dir>/tokens/`.
#[derive(Debug, Clone)]
pub struct TokenStore {
    root: PathBuf,
}

impl TokenStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let mut root = data_dir.into();
        root.push("tokens");
        Self { root }
    }

    pub async fn load(&self, identity: &Identity) -> Res<Option<CredentialRecord>> {
        let path = self.token_path(&identity.key())?;
        let content = match async_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: CredentialRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    pub async fn persist(&self, record: &CredentialRecord) -> Res<()> {
        let path = self.token_path(&record.identity)?;
        async_fs::create_dir_all(&self.root).await?;

        let json = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub async fn remove(&self, identity: &Identity) -> Res<()> {
        let path = self.token_path(&identity.key())?;
        match async_fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn token_path(&self, key: &str) -> Res<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("identity '{}' cannot be used as a file name", key),
            )));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(refresh: Option<&str>) -> Token {
        Token {
            access_token: "access".into(),
            refresh_token: refresh.map(String::from),
            scope: "user-top-read".into(),
            token_type: "Bearer".into(),
            expires_in: 3600,
            obtained_at: Utc::now().timestamp(),
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: "someone".into(),
            display_name: "Someone".into(),
        }
    }

    #[test]
    fn refresh_keeps_unrotated_refresh_token() {
        let record = CredentialRecord::new(&Identity::Owner, token(Some("r1")), &profile(), 1).unwrap();
        let next = record.refreshed(token(None));
        assert_eq!(next.refresh_token, "r1");
        assert_eq!(next.version, 2);

        let rotated = next.refreshed(token(Some("r2")));
        assert_eq!(rotated.refresh_token, "r2");
        assert_eq!(rotated.version, 3);
    }

    #[test]
    fn expiry_window() {
        let record = CredentialRecord::new(&Identity::Owner, token(Some("r1")), &profile(), 1).unwrap();
        assert!(!record.expires_within(Duration::seconds(120)));
        assert!(record.expires_within(Duration::seconds(7200)));
    }

    #[test]
    fn record_needs_refresh_token() {
        assert!(CredentialRecord::new(&Identity::Owner, token(None), &profile(), 1).is_err());
    }

    #[tokio::test]
    async fn persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        let identity = Identity::User("someone".into());

        assert!(store.load(&identity).await.unwrap().is_none());

        let record = CredentialRecord::new(&identity, token(Some("r1")), &profile(), 1).unwrap();
        store.persist(&record).await.unwrap();
        assert_eq!(store.load(&identity).await.unwrap(), Some(record));

        store.remove(&identity).await.unwrap();
        assert!(store.load(&identity).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_path_like_identities() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        let identity = Identity::User("../escape".into());
        assert!(store.load(&identity).await.is_err());
    }
}
