use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{
    analytics::{
        DEFAULT_LIMIT, compare, fetch,
        ranking,
        response::{
            self, AlbumView, ArtistSummary, ArtistView, PlaylistMatch, SeasonVarietyView, SongView,
        },
        temporal,
    },
    api::{Acting, ApiError, respond},
    server::ServerState,
    types::TimeWindow,
};

#[derive(Debug, Default, Deserialize)]
pub struct TimeRangeQuery {
    pub time_range: Option<String>,
}

impl TimeRangeQuery {
    /// Missing or unrecognized values select `medium_term`.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_query(self.time_range.as_deref())
    }
}

pub async fn top_albums(
    State(state): State<ServerState>,
    Acting(identity): Acting,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<Vec<AlbumView>>, ApiError> {
    let window = query.window();
    respond(&state, &identity, |catalog| async move {
        let albums = fetch::fetch_top_albums(catalog.as_ref(), window, DEFAULT_LIMIT).await?;
        Ok(response::albums(&albums))
    })
    .await
}

pub async fn top_songs(
    State(state): State<ServerState>,
    Acting(identity): Acting,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<Vec<SongView>>, ApiError> {
    let window = query.window();
    respond(&state, &identity, |catalog| async move {
        let tracks = fetch::fetch_top_tracks(catalog.as_ref(), window, DEFAULT_LIMIT).await?;
        Ok(response::songs(&tracks))
    })
    .await
}

pub async fn top_artists(
    State(state): State<ServerState>,
    Acting(identity): Acting,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<Vec<ArtistView>>, ApiError> {
    let window = query.window();
    respond(&state, &identity, |catalog| async move {
        let artists = fetch::fetch_top_artists(catalog.as_ref(), window, DEFAULT_LIMIT).await?;
        Ok(response::artists(&artists))
    })
    .await
}

pub async fn top_playlists(
    State(state): State<ServerState>,
    Acting(identity): Acting,
) -> Result<Json<Vec<PlaylistMatch>>, ApiError> {
    respond(&state, &identity, |catalog| async move {
        let ranked = ranking::fetch_top_playlists(catalog.as_ref()).await?;
        Ok(response::playlist_matches(&ranked))
    })
    .await
}

pub async fn hidden_gems(
    State(state): State<ServerState>,
    Acting(identity): Acting,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<Vec<SongView>>, ApiError> {
    let window = query.window();
    respond(&state, &identity, |catalog| async move {
        let gems = ranking::fetch_hidden_gems(catalog.as_ref(), window).await?;
        Ok(response::songs(&gems))
    })
    .await
}

pub async fn artists_standing_test_of_time(
    State(state): State<ServerState>,
    Acting(identity): Acting,
) -> Result<Json<Vec<ArtistSummary>>, ApiError> {
    respond(&state, &identity, |catalog| async move {
        let artists = compare::fetch_standing_test_of_time(catalog.as_ref()).await?;
        Ok(response::artist_summaries(&artists))
    })
    .await
}

pub async fn artists_falling_off(
    State(state): State<ServerState>,
    Acting(identity): Acting,
) -> Result<Json<Vec<ArtistSummary>>, ApiError> {
    respond(&state, &identity, |catalog| async move {
        let artists = compare::fetch_fallen_off(catalog.as_ref()).await?;
        Ok(response::artist_summaries(&artists))
    })
    .await
}

pub async fn release_year_trends(
    State(state): State<ServerState>,
    Acting(identity): Acting,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<BTreeMap<String, usize>>, ApiError> {
    let window = query.window();
    respond(&state, &identity, |catalog| async move {
        let trends = temporal::fetch_release_year_trends(catalog.as_ref(), window).await?;
        Ok(response::year_trends(&trends))
    })
    .await
}

pub async fn music_variety_by_season(
    State(state): State<ServerState>,
    Acting(identity): Acting,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<SeasonVarietyView>, ApiError> {
    let window = query.window();
    respond(&state, &identity, |catalog| async move {
        let variety = temporal::fetch_music_variety_by_season(catalog.as_ref(), window).await?;
        Ok(response::season_variety(&variety))
    })
    .await
}
