//! # Spotify Integration Module
//!
//! The catalog client adapter. Everything the analytics layer needs from the
//! upstream service goes through the [`Catalog`] capability trait, which
//! hands back wire records from [`model`]. The analytics layer turns those
//! into internal records with [`normalize`].
//!
//! ```text
//! Analytics Layer (fetch helpers, engines)
//!          ↓
//! Catalog capability (this module)
//!     ├── Top items (tracks, artists) per time window
//!     ├── Playlists and playlist items
//!     └── Batch lookups (tracks, artists, albums)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! [`auth`] talks to the accounts service: building the PKCE authorization
//! URL, exchanging codes and refreshing tokens.
//!
//! ## Error mapping
//!
//! - 401 from the Web API → [`crate::error::Error::Unauthenticated`]
//! - transport errors, 429 and 5xx → [`crate::error::Error::UpstreamUnavailable`]
//!
//! Nothing in this module retries. The credential layer does one
//! refresh-and-retry when a call comes back unauthenticated.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Res,
    types::TimeWindow,
};

pub mod auth;
pub mod client;
pub mod model;
pub mod normalize;

pub use client::{SpotifyCatalogFactory, SpotifyClient};

use model::{
    AlbumObject, ArtistObject, Paging, PlaylistItemObject, PlaylistObject, TrackObject,
    UserObject,
};

/// Upper bound for `limit` on paginated endpoints.
pub const MAX_PAGE_SIZE: u32 = 50;
/// Maximum ids per `GET /artists` call.
pub const MAX_ARTIST_BATCH: usize = 50;
/// Maximum ids per `GET /albums` call.
pub const MAX_ALBUM_BATCH: usize = 20;

/// An already-authenticated handle on the upstream catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn top_tracks(
        &self,
        window: TimeWindow,
        limit: u32,
        offset: u32,
    ) -> Res<Paging<TrackObject>>;

    async fn top_artists(
        &self,
        window: TimeWindow,
        limit: u32,
        offset: u32,
    ) -> Res<Paging<ArtistObject>>;

    async fn playlists(&self, limit: u32, offset: u32) -> Res<Paging<PlaylistObject>>;

    async fn playlist_items(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Res<Paging<PlaylistItemObject>>;

    /// Entries are `None` for ids the upstream does not know.
    async fn artists(&self, ids: &[String]) -> Res<Vec<Option<ArtistObject>>>;

    async fn albums(&self, ids: &[String]) -> Res<Vec<Option<AlbumObject>>>;

    async fn current_user(&self) -> Res<UserObject>;
}

/// Builds a [`Catalog`] bound to one access token.
pub trait CatalogFactory: Send + Sync {
    fn catalog(&self, access_token: &str) -> Arc<dyn Catalog>;
}
