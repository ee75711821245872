//! Error taxonomy shared by the catalog adapter, the analytics engines and
//! the HTTP boundary.
//!
//! Only [`Error::Unauthenticated`] and [`Error::UpstreamUnavailable`] ever
//! escape an analytics pipeline. [`Error::PartialResolution`] and
//! [`Error::MalformedUpstreamRecord`] are produced by sub-fetches and record
//! normalization, logged, and turned into smaller results.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No valid credential exists for the acting identity, or the upstream
    /// rejected the one we presented.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// Transport failure, rate limiting or a 5xx from the upstream API.
    #[error("upstream catalog unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A sub-fetch needed for completeness failed.
    #[error("could not resolve {what}: {reason}")]
    PartialResolution { what: String, reason: String },

    /// An upstream record is missing a field we cannot do without.
    #[error("malformed upstream record: {0}")]
    MalformedUpstreamRecord(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Error::Unauthenticated(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status == reqwest::StatusCode::UNAUTHORIZED => {
                Error::Unauthenticated(err.to_string())
            }
            _ => Error::UpstreamUnavailable(err.to_string()),
        }
    }
}
