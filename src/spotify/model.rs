//! Wire shapes of the Spotify Web API.
//!
//! Every field the upstream might leave out is optional here; deciding what
//! counts as a usable record is the job of [`super::normalize`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleArtistObject {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleAlbumObject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
    #[serde(default)]
    pub artists: Vec<SimpleArtistObject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<SimpleArtistObject>,
    pub album: Option<SimpleAlbumObject>,
    pub popularity: Option<u32>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtistObject {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlbumObject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub artists: Vec<SimpleArtistObject>,
    pub popularity: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistTracksRef {
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistObject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub tracks: Option<PlaylistTracksRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistTrackRef {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistItemObject {
    pub track: Option<PlaylistTrackRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserObject {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeveralArtistsResponse {
    #[serde(default)]
    pub artists: Vec<Option<ArtistObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeveralAlbumsResponse {
    #[serde(default)]
    pub albums: Vec<Option<AlbumObject>>,
}

/// Body returned by the accounts service token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}
