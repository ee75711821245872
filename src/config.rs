//! Configuration management for Euterpe.
//!
//! Values come from the process environment and from a `.env` file in the
//! local data directory, in that order of priority:
//! - Linux: `~/.local/share/euterpe/.env`
//! - macOS: `~/Library/Application Support/euterpe/.env`
//! - Windows: `%LOCALAPPDATA%/euterpe/.env`
//!
//! [`Settings::from_env`] reads everything once at startup. Missing required
//! values are reported as [`Error::Config`].

use std::{env, fmt, net::SocketAddr, path::PathBuf, str::FromStr};

use crate::{Res, error::Error};

pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SPOTIFY_SCOPE: &str =
    "user-top-read playlist-read-private playlist-read-collaborative";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";

/// Returns the directory holding `.env` and the credential store.
pub fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("euterpe");
    path
}

/// Loads environment variables from the `.env` file in the data directory.
///
/// A missing file is not an error: every value can also come from the
/// process environment. Creates the directory so the user knows where to
/// put the file.
pub async fn load_env() -> Res<()> {
    let dir = default_data_dir();
    async_fs::create_dir_all(&dir).await?;

    let path = dir.join(".env");
    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| Error::Config(e.to_string()))?;
    }
    Ok(())
}

/// Which credential-resolution strategy feeds the analytics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    /// Every visitor signs in with their own account.
    #[default]
    PerUser,
    /// One operator's credential serves every visitor.
    SingleOwner,
}

impl FromStr for DeploymentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_user" | "per-user" => Ok(DeploymentMode::PerUser),
            "single_owner" | "single-owner" | "owner" => Ok(DeploymentMode::SingleOwner),
            other => Err(Error::Config(format!(
                "EUTERPE_MODE must be per_user or single_owner, got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::PerUser => f.write_str("per_user"),
            DeploymentMode::SingleOwner => f.write_str("single_owner"),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
    pub server_addr: SocketAddr,
    pub api_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub mode: DeploymentMode,
    pub data_dir: PathBuf,
    /// Marks the session cookie `Secure`. Defaults to on when the redirect
    /// URI is served over https.
    pub secure_cookies: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("server_addr", &self.server_addr)
            .field("api_url", &self.api_url)
            .field("mode", &self.mode)
            .field("data_dir", &self.data_dir)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Res<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Res<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{} must be set", key)))
        };

        let server_addr = get("SERVER_ADDRESS")
            .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("SERVER_ADDRESS is not a socket address: {}", e)))?;

        let mode = match get("EUTERPE_MODE") {
            Some(raw) => raw.parse()?,
            None => DeploymentMode::default(),
        };

        let redirect_uri = required("SPOTIFY_REDIRECT_URI")?;
        let secure_cookies = match get("EUTERPE_SECURE_COOKIES").as_deref() {
            Some("true" | "1" | "yes") => true,
            Some("false" | "0" | "no") => false,
            Some(other) => {
                return Err(Error::Config(format!(
                    "EUTERPE_SECURE_COOKIES must be true or false, got '{}'",
                    other
                )));
            }
            None => redirect_uri.starts_with("https://"),
        };

        Ok(Self {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: get("SPOTIFY_CLIENT_SECRET"),
            redirect_uri,
            scope: get("SPOTIFY_SCOPE").unwrap_or_else(|| DEFAULT_SPOTIFY_SCOPE.to_string()),
            server_addr,
            api_url: get("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.to_string()),
            auth_url: get("SPOTIFY_API_AUTH_URL")
                .unwrap_or_else(|| DEFAULT_SPOTIFY_AUTH_URL.to_string()),
            token_url: get("SPOTIFY_API_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_SPOTIFY_TOKEN_URL.to_string()),
            mode,
            data_dir: get("EUTERPE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            secure_cookies,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() {
        let settings = Settings::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "client"),
            ("SPOTIFY_REDIRECT_URI", "http://127.0.0.1:8080/callback"),
        ]))
        .unwrap();

        assert_eq!(settings.mode, DeploymentMode::PerUser);
        assert_eq!(settings.api_url, DEFAULT_SPOTIFY_API_URL);
        assert_eq!(settings.scope, DEFAULT_SPOTIFY_SCOPE);
        assert_eq!(settings.server_addr.port(), 8080);
        assert!(settings.client_secret.is_none());
        assert!(!settings.secure_cookies);
    }

    #[test]
    fn secure_cookies_follow_redirect_scheme_unless_set() {
        let https = Settings::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "client"),
            ("SPOTIFY_REDIRECT_URI", "https://euterpe.example/callback"),
        ]))
        .unwrap();
        assert!(https.secure_cookies);

        let forced_off = Settings::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "client"),
            ("SPOTIFY_REDIRECT_URI", "https://euterpe.example/callback"),
            ("EUTERPE_SECURE_COOKIES", "false"),
        ]))
        .unwrap();
        assert!(!forced_off.secure_cookies);

        let err = Settings::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "client"),
            ("SPOTIFY_REDIRECT_URI", "http://127.0.0.1:8080/callback"),
            ("EUTERPE_SECURE_COOKIES", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("EUTERPE_SECURE_COOKIES")));
    }

    #[test]
    fn missing_client_id_is_a_config_error() {
        let err = Settings::from_lookup(lookup(&[(
            "SPOTIFY_REDIRECT_URI",
            "http://127.0.0.1:8080/callback",
        )]))
        .unwrap_err();

        assert!(matches!(err, Error::Config(msg) if msg.contains("SPOTIFY_CLIENT_ID")));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let err = Settings::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "   "),
            ("SPOTIFY_REDIRECT_URI", "http://127.0.0.1:8080/callback"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn owner_mode_is_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("SPOTIFY_CLIENT_ID", "client"),
            ("SPOTIFY_REDIRECT_URI", "http://127.0.0.1:8080/callback"),
            ("EUTERPE_MODE", "single_owner"),
        ]))
        .unwrap();
        assert_eq!(settings.mode, DeploymentMode::SingleOwner);

        assert!("multi".parse::<DeploymentMode>().is_err());
    }
}
