//! Popularity ranking and playlist affinity.

use std::collections::HashSet;

use tracing::warn;

use crate::{
    Res,
    analytics::{
        DEFAULT_LIMIT,
        fetch::{fetch_playlist_track_ids, fetch_playlists, fetch_top_tracks},
    },
    error::Error,
    spotify::Catalog,
    types::{Playlist, PlaylistTracks, RankedItem, TimeWindow, Track},
};

/// Number of playlists `top_playlists` reports.
pub const TOP_PLAYLISTS: usize = 10;

/// Tracks by ascending popularity. Ties keep their fetch order.
pub fn hidden_gems(tracks: &[Track]) -> Vec<Track> {
    let mut gems = tracks.to_vec();
    gems.sort_by_key(|t| t.popularity);
    gems
}

/// Ranks playlists by how many of `user_top` they contain.
///
/// Playlists without a single match are left out. Equal counts keep listing
/// order. Repeated ids inside one playlist count once.
pub fn top_playlists_by_affinity(
    user_top: &[Track],
    playlists: &[PlaylistTracks],
    k: usize,
) -> Vec<RankedItem<Playlist>> {
    let top: HashSet<&str> = user_top.iter().map(|t| t.id.as_str()).collect();

    let mut scored: Vec<(u32, &Playlist)> = playlists
        .iter()
        .filter_map(|entry| {
            let distinct: HashSet<&str> = entry.track_ids.iter().map(String::as_str).collect();
            let count = distinct.iter().filter(|id| top.contains(*id)).count() as u32;
            (count > 0).then_some((count, &entry.playlist))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(k);

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, playlist))| RankedItem {
            rank: i + 1,
            score,
            item: playlist.clone(),
        })
        .collect()
}

pub async fn fetch_hidden_gems(catalog: &dyn Catalog, window: TimeWindow) -> Res<Vec<Track>> {
    let tracks = fetch_top_tracks(catalog, window, DEFAULT_LIMIT).await?;
    Ok(hidden_gems(&tracks))
}

/// Scores every playlist of the user against their medium-term top tracks.
///
/// Playlists whose items cannot be fetched are skipped. An unauthenticated
/// failure still aborts so the caller can refresh the credential.
pub async fn fetch_top_playlists(catalog: &dyn Catalog) -> Res<Vec<RankedItem<Playlist>>> {
    let user_top = fetch_top_tracks(catalog, TimeWindow::Medium, DEFAULT_LIMIT).await?;
    let playlists = fetch_playlists(catalog).await?;

    let mut with_tracks = Vec::with_capacity(playlists.len());
    for playlist in playlists {
        if playlist.track_count == Some(0) {
            continue;
        }
        match fetch_playlist_track_ids(catalog, &playlist.id).await {
            Ok(track_ids) => with_tracks.push(PlaylistTracks {
                playlist,
                track_ids,
            }),
            Err(e) if e.is_unauthenticated() => return Err(e),
            Err(e) => {
                let e = Error::PartialResolution {
                    what: format!("items of playlist {}", playlist.id),
                    reason: e.to_string(),
                };
                warn!(error = %e, "skipping playlist");
            }
        }
    }

    Ok(top_playlists_by_affinity(
        &user_top,
        &with_tracks,
        TOP_PLAYLISTS,
    ))
}
