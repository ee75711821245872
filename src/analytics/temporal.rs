//! Release-year histogram and per-season genre variety.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::{
    Res,
    analytics::{DEFAULT_LIMIT, fetch::fetch_top_tracks},
    error::Error,
    spotify::{Catalog, MAX_ARTIST_BATCH, normalize},
    types::{Season, TimeWindow, Track},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearTrends {
    pub by_year: BTreeMap<i32, usize>,
    /// Tracks without a usable release date.
    pub unknown: usize,
}

impl YearTrends {
    pub fn total(&self) -> usize {
        self.by_year.values().sum::<usize>() + self.unknown
    }
}

pub fn release_year_trends(tracks: &[Track]) -> YearTrends {
    let mut trends = YearTrends::default();
    for track in tracks {
        match track.release_date {
            Some(date) => *trends.by_year.entry(date.year).or_default() += 1,
            None => trends.unknown += 1,
        }
    }
    trends
}

/// Meteorological seasons: Dec-Feb winter, Mar-May spring, Jun-Aug summer,
/// Sep-Nov fall. `None` outside 1..=12.
pub fn season_for_month(month: u32) -> Option<Season> {
    match month {
        12 | 1 | 2 => Some(Season::Winter),
        3..=5 => Some(Season::Spring),
        6..=8 => Some(Season::Summer),
        9..=11 => Some(Season::Fall),
        _ => None,
    }
}

/// Distinct genres per season of release month.
///
/// `genres_by_artist` maps artist ids to their genre tags. Artists missing
/// from it are unresolved. A track with no release month, or with none of
/// its artists resolved, is skipped. Every season is present in the output.
pub fn music_variety_by_season(
    tracks: &[Track],
    genres_by_artist: &HashMap<String, Vec<String>>,
) -> BTreeMap<Season, usize> {
    let mut genres: HashMap<Season, HashSet<&str>> = HashMap::new();

    for track in tracks {
        let Some(season) = track
            .release_date
            .and_then(|d| d.month)
            .and_then(season_for_month)
        else {
            continue;
        };

        let mut resolved = track
            .artists
            .iter()
            .filter_map(|a| genres_by_artist.get(&a.id))
            .peekable();
        if resolved.peek().is_none() {
            continue;
        }

        let bucket = genres.entry(season).or_default();
        for tags in resolved {
            bucket.extend(tags.iter().map(String::as_str));
        }
    }

    Season::ALL
        .into_iter()
        .map(|season| (season, genres.get(&season).map_or(0, HashSet::len)))
        .collect()
}

/// Genre tags for the artists of `tracks` that have a release month.
/// Batches that fail leave their artists out of the map.
pub async fn resolve_artist_genres(
    catalog: &dyn Catalog,
    tracks: &[Track],
) -> Res<HashMap<String, Vec<String>>> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = tracks
        .iter()
        .filter(|t| t.release_date.and_then(|d| d.month).is_some())
        .flat_map(|t| t.artists.iter())
        .filter(|a| seen.insert(a.id.as_str()))
        .map(|a| a.id.clone())
        .collect();

    let mut resolved = HashMap::new();
    for chunk in ids.chunks(MAX_ARTIST_BATCH) {
        match catalog.artists(chunk).await {
            Ok(batch) => {
                for artist in batch.into_iter().flatten() {
                    if let Ok(artist) = normalize::artist(artist) {
                        resolved.entry(artist.id).or_insert(artist.genres);
                    }
                }
            }
            Err(e) if e.is_unauthenticated() => return Err(e),
            Err(e) => {
                let e = Error::PartialResolution {
                    what: format!("genres of {} artists", chunk.len()),
                    reason: e.to_string(),
                };
                warn!(error = %e, "leaving artists unresolved");
            }
        }
    }
    Ok(resolved)
}

pub async fn fetch_release_year_trends(catalog: &dyn Catalog, window: TimeWindow) -> Res<YearTrends> {
    let tracks = fetch_top_tracks(catalog, window, DEFAULT_LIMIT).await?;
    Ok(release_year_trends(&tracks))
}

pub async fn fetch_music_variety_by_season(
    catalog: &dyn Catalog,
    window: TimeWindow,
) -> Res<BTreeMap<Season, usize>> {
    let tracks = fetch_top_tracks(catalog, window, DEFAULT_LIMIT).await?;
    let genres = resolve_artist_genres(catalog, &tracks).await?;
    Ok(music_variety_by_season(&tracks, &genres))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_month_has_a_season() {
        let expected = [
            Season::Winter,
            Season::Winter,
            Season::Spring,
            Season::Spring,
            Season::Spring,
            Season::Summer,
            Season::Summer,
            Season::Summer,
            Season::Fall,
            Season::Fall,
            Season::Fall,
            Season::Winter,
        ];
        for (month, season) in (1..=12).zip(expected) {
            assert_eq!(season_for_month(month), Some(season), "month {}", month);
        }
        assert_eq!(season_for_month(0), None);
        assert_eq!(season_for_month(13), None);
    }
}
