//! JSON shapes of the analytics endpoints.
//!
//! Conversions here only rename and flatten. Sequence order is whatever the
//! engine produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    analytics::temporal::YearTrends,
    types::{Album, Artist, Playlist, RankedItem, Season, Track},
    utils::join_names,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumView {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub popularity: u8,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongView {
    pub id: String,
    pub name: String,
    /// All credited artists, comma separated.
    pub artist: String,
    pub album: String,
    pub popularity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistView {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistMatch {
    pub playlist_id: String,
    pub name: String,
    pub match_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonVarietyView {
    pub winter: usize,
    pub spring: usize,
    pub summer: usize,
    pub fall: usize,
}

impl From<&Album> for AlbumView {
    fn from(album: &Album) -> Self {
        Self {
            id: album.id.clone(),
            name: album.name.clone(),
            artist: album.artist.clone(),
            popularity: album.popularity,
            release_date: album.release_date.clone(),
        }
    }
}

impl From<&Track> for SongView {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            name: track.name.clone(),
            artist: join_names(track.artists.iter().map(|a| a.name.as_str())),
            album: track.album.name.clone(),
            popularity: track.popularity,
        }
    }
}

impl From<&Artist> for ArtistView {
    fn from(artist: &Artist) -> Self {
        Self {
            id: artist.id.clone(),
            name: artist.name.clone(),
            genres: artist.genres.clone(),
            popularity: artist.popularity,
        }
    }
}

impl From<&Artist> for ArtistSummary {
    fn from(artist: &Artist) -> Self {
        Self {
            id: artist.id.clone(),
            name: artist.name.clone(),
        }
    }
}

impl From<&RankedItem<Playlist>> for PlaylistMatch {
    fn from(ranked: &RankedItem<Playlist>) -> Self {
        Self {
            playlist_id: ranked.item.id.clone(),
            name: ranked.item.name.clone(),
            match_count: ranked.score,
        }
    }
}

impl From<&BTreeMap<Season, usize>> for SeasonVarietyView {
    fn from(variety: &BTreeMap<Season, usize>) -> Self {
        let get = |season: Season| variety.get(&season).copied().unwrap_or(0);
        Self {
            winter: get(Season::Winter),
            spring: get(Season::Spring),
            summer: get(Season::Summer),
            fall: get(Season::Fall),
        }
    }
}

pub fn albums(albums: &[Album]) -> Vec<AlbumView> {
    albums.iter().map(AlbumView::from).collect()
}

pub fn songs(tracks: &[Track]) -> Vec<SongView> {
    tracks.iter().map(SongView::from).collect()
}

pub fn artists(artists: &[Artist]) -> Vec<ArtistView> {
    artists.iter().map(ArtistView::from).collect()
}

pub fn artist_summaries(artists: &[Artist]) -> Vec<ArtistSummary> {
    artists.iter().map(ArtistSummary::from).collect()
}

pub fn playlist_matches(ranked: &[RankedItem<Playlist>]) -> Vec<PlaylistMatch> {
    ranked.iter().map(PlaylistMatch::from).collect()
}

/// `{"<year>": n, ..., "unknown": n}`. The `unknown` key is always present.
pub fn year_trends(trends: &YearTrends) -> BTreeMap<String, usize> {
    let mut out: BTreeMap<String, usize> = trends
        .by_year
        .iter()
        .map(|(year, count)| (year.to_string(), *count))
        .collect();
    out.insert("unknown".to_string(), trends.unknown);
    out
}

pub fn season_variety(variety: &BTreeMap<Season, usize>) -> SeasonVarietyView {
    SeasonVarietyView::from(variety)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlbumRef, ArtistRef};

    #[test]
    fn song_view_joins_artists() {
        let track = Track {
            id: "t1".into(),
            name: "Song".into(),
            artists: vec![
                ArtistRef {
                    id: "a1".into(),
                    name: "First".into(),
                },
                ArtistRef {
                    id: "a2".into(),
                    name: "Second".into(),
                },
            ],
            album: AlbumRef {
                id: "al".into(),
                name: "Record".into(),
                artist: "First".into(),
                release_date: None,
            },
            release_date: None,
            popularity: 12,
        };
        let view = SongView::from(&track);
        assert_eq!(view.artist, "First, Second");
        assert_eq!(view.album, "Record");
    }

    #[test]
    fn year_trends_always_reports_unknown() {
        let shaped = year_trends(&YearTrends::default());
        assert_eq!(shaped.get("unknown"), Some(&0));
        assert_eq!(shaped.len(), 1);
    }
}
