//! Euterpe: Spotify listening analytics
//!
//! Turns a user's top tracks, artists and playlists into dashboard views:
//! hidden gems, artists standing the test of time or falling off, playlist
//! affinity, release-year trends and genre variety per season. The views
//! are served by a small axum server, either per signed-in visitor or for a
//! single owner account.
//!
//! # Modules
//!
//! - `analytics` - Windowed fetch helper, comparison, ranking and temporal engines, response shapes
//! - `api` - HTTP handlers for the dashboard and the OAuth callbacks
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Crate error type
//! - `management` - Credential store, refresh coordination and sessions
//! - `server` - Router and server startup
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use euterpe::{config, server};
//!
//! #[tokio::main]
//! async fn main() -> euterpe::Res<()> {
//!     config::load_env().await?;
//!     let settings = config::Settings::from_env()?;
//!     server::start_api_server(settings).await
//! }
//! ```

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Result alias used throughout the crate.
pub type Res<T> = std::result::Result<T, error::Error>;

/// Console line with a blue `o`, for progress of CLI commands.
///
/// ```ignore
/// info!("Starting dashboard on http://{}", addr);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Console line with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Console line with a red `!`, then exits with status 1.
///
/// Only for CLI commands that cannot continue. Library and server code
/// return [`error::Error`] instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Console line with a yellow `!` for problems the command recovers from.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
