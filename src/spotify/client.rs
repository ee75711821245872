use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    Res,
    error::Error,
    spotify::{
        Catalog, CatalogFactory,
        model::{
            AlbumObject, ArtistObject, Paging, PlaylistItemObject, PlaylistObject,
            SeveralAlbumsResponse, SeveralArtistsResponse, TrackObject,
            UserObject,
        },
    },
    types::TimeWindow,
};

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Builds the shared HTTP client. Timeouts live here; nothing above the
/// adapter has its own cancellation contract.
pub fn http_client() -> Res<Client> {
    Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .user_agent(concat!("euterpe/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))
}

/// Web API client bound to one access token.
#[derive(Clone)]
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(http: Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Res<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path, "GET");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("GET {}: {}", path, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthenticated(format!(
                "GET {} rejected the access token",
                path
            )));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            warn!(path, retry_after, "rate limited by the Web API");
            return Err(Error::UpstreamUnavailable(format!(
                "GET {} rate limited, retry after {} seconds",
                path, retry_after
            )));
        }

        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "GET {} returned {}",
                path, status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("GET {}: unexpected body: {}", path, e)))
    }

    fn page_query(limit: u32, offset: u32) -> Vec<(&'static str, String)> {
        vec![
            ("limit", limit.min(super::MAX_PAGE_SIZE).to_string()),
            ("offset", offset.to_string()),
        ]
    }
}

#[async_trait]
impl Catalog for SpotifyClient {
    async fn top_tracks(
        &self,
        window: TimeWindow,
        limit: u32,
        offset: u32,
    ) -> Res<Paging<TrackObject>> {
        let mut query = Self::page_query(limit, offset);
        query.push(("time_range", window.as_query().to_string()));
        self.get_json("/me/top/tracks", &query).await
    }

    async fn top_artists(
        &self,
        window: TimeWindow,
        limit: u32,
        offset: u32,
    ) -> Res<Paging<ArtistObject>> {
        let mut query = Self::page_query(limit, offset);
        query.push(("time_range", window.as_query().to_string()));
        self.get_json("/me/top/artists", &query).await
    }

    async fn playlists(&self, limit: u32, offset: u32) -> Res<Paging<PlaylistObject>> {
        self.get_json("/me/playlists", &Self::page_query(limit, offset))
            .await
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Res<Paging<PlaylistItemObject>> {
        let mut query = Self::page_query(limit, offset);
        query.push(("fields", "items(track(id,type)),next,total".to_string()));
        self.get_json(&format!("/playlists/{}/tracks", playlist_id), &query)
            .await
    }

    async fn artists(&self, ids: &[String]) -> Res<Vec<Option<ArtistObject>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let res: SeveralArtistsResponse = self
            .get_json("/artists", &[("ids", ids.join(","))])
            .await?;
        Ok(res.artists)
    }

    async fn albums(&self, ids: &[String]) -> Res<Vec<Option<AlbumObject>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let res: SeveralAlbumsResponse = self
            .get_json("/albums", &[("ids", ids.join(","))])
            .await?;
        Ok(res.albums)
    }

    async fn current_user(&self) -> Res<UserObject> {
        self.get_json("/me", &[]).await
    }
}

/// Hands out [`SpotifyClient`]s sharing one connection pool.
#[derive(Clone)]
pub struct SpotifyCatalogFactory {
    http: Client,
    base_url: String,
}

impl SpotifyCatalogFactory {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl CatalogFactory for SpotifyCatalogFactory {
    fn catalog(&self, access_token: &str) -> Arc<dyn Catalog> {
        Arc::new(SpotifyClient::new(
            self.http.clone(),
            self.base_url.clone(),
            access_token,
        ))
    }
}
