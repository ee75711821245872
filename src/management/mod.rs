mod credentials;
mod session;
mod store;

pub use credentials::CredentialManager;
pub use credentials::REFRESH_LEEWAY_SECS;
pub use session::SESSION_COOKIE;
pub use session::SESSION_TTL;
pub use session::SessionStore;
pub use store::CredentialRecord;
pub use store::TokenStore;
