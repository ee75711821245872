//! # Analytics
//!
//! Request-scoped pipelines from the upstream catalog to dashboard views.
//!
//! ```text
//! fetch      bounded, ordered top lists per time window
//!   ↓
//! compare    membership across the short, medium and long windows
//! ranking    hidden gems, playlist affinity
//! temporal   release years, genre variety per season
//!   ↓
//! response   JSON shapes served by the api module
//! ```
//!
//! The engines are plain functions over fetched slices and cannot fail.
//! Each engine has an async `fetch_*` companion that pulls its inputs through
//! a [`crate::spotify::Catalog`] first. Nothing is cached between requests.

pub mod compare;
pub mod fetch;
pub mod ranking;
pub mod response;
pub mod temporal;

/// Items requested per window by the dashboard views.
pub const DEFAULT_LIMIT: usize = 50;
