//! # CLI Module
//!
//! User-facing commands. Each command loads what it needs from
//! [`crate::config::Settings`], reports progress with the console macros and
//! exits with a message on failure.
//!
//! - [`serve`] runs the dashboard.
//! - [`auth`] connects the owner account for single-owner deployments;
//!   [`revoke`] forgets it.
//! - [`top`] prints the owner's top tracks, artists or albums as a table.
//!
//! ```bash
//! euterpe auth
//! euterpe top --kind artists --time-range long_term
//! EUTERPE_MODE=single_owner euterpe serve
//! ```

mod auth;
mod serve;
mod top;

pub use auth::auth;
pub use auth::revoke;
pub use serve::serve;
pub use top::top;
