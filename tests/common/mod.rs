#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::Utc;
use euterpe::{
    Res,
    error::Error,
    spotify::{
        Catalog, CatalogFactory,
        auth::Authorizer,
        model::{
            AlbumObject, ArtistObject, Paging, PlaylistItemObject, PlaylistObject,
            PlaylistTrackRef, PlaylistTracksRef, SimpleAlbumObject, SimpleArtistObject,
            TrackObject, UserObject,
        },
    },
    types::{AlbumRef, Artist, ArtistRef, ReleaseDate, TimeWindow, Token, Track},
};

pub fn raw_track(id: &str, popularity: u32, release_date: &str, artist_ids: &[&str]) -> TrackObject {
    raw_track_on_album(id, popularity, release_date, artist_ids, &format!("album-{}", id))
}

pub fn raw_track_on_album(
    id: &str,
    popularity: u32,
    release_date: &str,
    artist_ids: &[&str],
    album_id: &str,
) -> TrackObject {
    let artists: Vec<SimpleArtistObject> = artist_ids
        .iter()
        .map(|a| SimpleArtistObject {
            id: Some(a.to_string()),
            name: Some(format!("Artist {}", a)),
        })
        .collect();
    TrackObject {
        id: Some(id.to_string()),
        name: Some(format!("Track {}", id)),
        artists: artists.clone(),
        album: Some(SimpleAlbumObject {
            id: Some(album_id.to_string()),
            name: Some(format!("Album {}", album_id)),
            release_date: Some(release_date.to_string()),
            release_date_precision: None,
            artists,
        }),
        popularity: Some(popularity),
        is_local: false,
    }
}

pub fn raw_artist(id: &str, genres: &[&str]) -> ArtistObject {
    ArtistObject {
        id: Some(id.to_string()),
        name: Some(format!("Artist {}", id)),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        popularity: Some(50),
    }
}

pub fn raw_playlist(id: &str, total: u32) -> PlaylistObject {
    PlaylistObject {
        id: Some(id.to_string()),
        name: Some(format!("Playlist {}", id)),
        tracks: Some(PlaylistTracksRef { total: Some(total) }),
    }
}

pub fn track(id: &str, popularity: u8, release_date: Option<&str>, artist_ids: &[&str]) -> Track {
    Track {
        id: id.to_string(),
        name: format!("Track {}", id),
        artists: artist_ids
            .iter()
            .map(|a| ArtistRef {
                id: a.to_string(),
                name: format!("Artist {}", a),
            })
            .collect(),
        album: AlbumRef {
            id: format!("album-{}", id),
            name: format!("Album {}", id),
            artist: String::new(),
            release_date: release_date.map(str::to_string),
        },
        release_date: release_date.and_then(ReleaseDate::parse),
        popularity,
    }
}

pub fn artist(id: &str) -> Artist {
    Artist {
        id: id.to_string(),
        name: format!("Artist {}", id),
        genres: vec![],
        popularity: 50,
    }
}

pub fn artists(ids: &[&str]) -> Vec<Artist> {
    ids.iter().map(|id| artist(id)).collect()
}

pub fn ids<T>(items: &[T], id: impl Fn(&T) -> String) -> Vec<String> {
    items.iter().map(id).collect()
}

fn page<T: Clone>(all: &[T], limit: u32, offset: u32) -> Paging<T> {
    let start = (offset as usize).min(all.len());
    let end = (start + limit as usize).min(all.len());
    let next = (end < all.len()).then(|| format!("offset={}", end));
    Paging {
        items: all[start..end].to_vec(),
        next,
        total: Some(all.len() as u32),
    }
}

/// In-memory catalog. Every call is recorded in `calls`.
#[derive(Default)]
pub struct FakeCatalog {
    pub top_tracks: HashMap<TimeWindow, Vec<TrackObject>>,
    pub top_artists: HashMap<TimeWindow, Vec<ArtistObject>>,
    pub playlists: Vec<PlaylistObject>,
    pub playlist_items: HashMap<String, Vec<String>>,
    pub failing_playlists: HashSet<String>,
    pub artists: HashMap<String, ArtistObject>,
    pub fail_artist_lookups: bool,
    pub albums: HashMap<String, AlbumObject>,
    pub fail_album_lookups: bool,
    pub user: Option<UserObject>,
    /// Makes every call fail as if the access token was rejected.
    pub reject_token: bool,
    /// Makes every call fail as if the upstream was down.
    pub unavailable: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_tracks(mut self, window: TimeWindow, tracks: Vec<TrackObject>) -> Self {
        self.top_tracks.insert(window, tracks);
        self
    }

    pub fn with_top_artists(mut self, window: TimeWindow, ids: &[&str]) -> Self {
        self.top_artists
            .insert(window, ids.iter().map(|id| raw_artist(id, &[])).collect());
        self
    }

    pub fn with_artist(mut self, id: &str, genres: &[&str]) -> Self {
        self.artists.insert(id.to_string(), raw_artist(id, genres));
        self
    }

    pub fn with_playlist(mut self, id: &str, track_ids: &[&str]) -> Self {
        self.playlists.push(raw_playlist(id, track_ids.len() as u32));
        self.playlist_items.insert(
            id.to_string(),
            track_ids.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) -> Res<()> {
        self.calls.lock().unwrap().push(call);
        if self.reject_token {
            return Err(Error::Unauthenticated("token rejected".into()));
        }
        if self.unavailable {
            return Err(Error::UpstreamUnavailable("503 Service Unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn top_tracks(&self, window: TimeWindow, limit: u32, offset: u32) -> Res<Paging<TrackObject>> {
        self.record(format!("top_tracks:{}:{}:{}", window, limit, offset))?;
        Ok(page(
            self.top_tracks.get(&window).map(Vec::as_slice).unwrap_or(&[]),
            limit,
            offset,
        ))
    }

    async fn top_artists(&self, window: TimeWindow, limit: u32, offset: u32) -> Res<Paging<ArtistObject>> {
        self.record(format!("top_artists:{}:{}:{}", window, limit, offset))?;
        Ok(page(
            self.top_artists.get(&window).map(Vec::as_slice).unwrap_or(&[]),
            limit,
            offset,
        ))
    }

    async fn playlists(&self, limit: u32, offset: u32) -> Res<Paging<PlaylistObject>> {
        self.record(format!("playlists:{}:{}", limit, offset))?;
        Ok(page(&self.playlists, limit, offset))
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Res<Paging<PlaylistItemObject>> {
        self.record(format!("playlist_items:{}:{}:{}", playlist_id, limit, offset))?;
        if self.failing_playlists.contains(playlist_id) {
            return Err(Error::UpstreamUnavailable("playlist items returned 500".into()));
        }
        let items: Vec<PlaylistItemObject> = self
            .playlist_items
            .get(playlist_id)
            .map(|ids| {
                ids.iter()
                    .map(|id| PlaylistItemObject {
                        track: Some(PlaylistTrackRef {
                            id: Some(id.clone()),
                            kind: Some("track".into()),
                        }),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(page(&items, limit, offset))
    }

    async fn artists(&self, ids: &[String]) -> Res<Vec<Option<ArtistObject>>> {
        self.record(format!("artists:{}", ids.len()))?;
        if self.fail_artist_lookups {
            return Err(Error::UpstreamUnavailable("artists returned 502".into()));
        }
        Ok(ids.iter().map(|id| self.artists.get(id).cloned()).collect())
    }

    async fn albums(&self, ids: &[String]) -> Res<Vec<Option<AlbumObject>>> {
        self.record(format!("albums:{}", ids.len()))?;
        if self.fail_album_lookups {
            return Err(Error::UpstreamUnavailable("albums returned 503".into()));
        }
        Ok(ids.iter().map(|id| self.albums.get(id).cloned()).collect())
    }

    async fn current_user(&self) -> Res<UserObject> {
        self.record("current_user".into())?;
        self.user
            .clone()
            .ok_or_else(|| Error::UpstreamUnavailable("no profile".into()))
    }
}

/// Hands out the same fake catalog for every token and remembers the
/// tokens it was asked for.
pub struct FakeCatalogFactory {
    pub catalog: Arc<FakeCatalog>,
    pub tokens: Mutex<Vec<String>>,
    /// Tokens whose catalog rejects every call.
    pub rejected_tokens: HashSet<String>,
}

impl FakeCatalogFactory {
    pub fn new(catalog: FakeCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            tokens: Mutex::new(Vec::new()),
            rejected_tokens: HashSet::new(),
        }
    }
}

impl CatalogFactory for FakeCatalogFactory {
    fn catalog(&self, access_token: &str) -> Arc<dyn Catalog> {
        self.tokens.lock().unwrap().push(access_token.to_string());
        if self.rejected_tokens.contains(access_token) {
            return Arc::new(FakeCatalog {
                reject_token: true,
                ..FakeCatalog::default()
            });
        }
        self.catalog.clone()
    }
}

pub fn token(access: &str, refresh: Option<&str>, expires_in: u64) -> Token {
    Token {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        scope: "user-top-read".to_string(),
        token_type: "Bearer".to_string(),
        expires_in,
        obtained_at: Utc::now().timestamp(),
    }
}

/// Accounts service that accepts every code and numbers its refreshes.
#[derive(Default)]
pub struct FakeAuthorizer {
    pub refreshes: Mutex<usize>,
}

#[async_trait]
impl Authorizer for FakeAuthorizer {
    async fn exchange_code(&self, code: &str, _verifier: &str) -> Res<Token> {
        if code == "bad-code" {
            return Err(Error::Unauthenticated("invalid_grant".into()));
        }
        Ok(token(&format!("access-{}", code), Some("refresh-1"), 3600))
    }

    async fn refresh(&self, _refresh_token: &str) -> Res<Token> {
        let n = {
            let mut refreshes = self.refreshes.lock().unwrap();
            *refreshes += 1;
            *refreshes
        };
        Ok(token(&format!("refreshed-{}", n), None, 3600))
    }
}
