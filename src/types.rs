use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One of the three lookback periods the upstream defines for "top items".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeWindow {
    /// About four weeks.
    #[serde(rename = "short_term")]
    Short,
    /// About six months.
    #[default]
    #[serde(rename = "medium_term")]
    Medium,
    /// Roughly all-time.
    #[serde(rename = "long_term")]
    Long,
}

impl TimeWindow {
    pub fn as_query(&self) -> &'static str {
        match self {
            TimeWindow::Short => "short_term",
            TimeWindow::Medium => "medium_term",
            TimeWindow::Long => "long_term",
        }
    }

    /// Strict parse of the upstream token.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "short_term" => Some(TimeWindow::Short),
            "medium_term" => Some(TimeWindow::Medium),
            "long_term" => Some(TimeWindow::Long),
            _ => None,
        }
    }

    /// Lenient parse used for the `time_range` query parameter: anything
    /// missing or unrecognized selects the medium window.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw {
            None => TimeWindow::default(),
            Some(value) => Self::parse(value).unwrap_or_else(|| {
                tracing::debug!(time_range = value, "unrecognized time_range, using medium_term");
                TimeWindow::default()
            }),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "invalid time range '{}'. Use short_term, medium_term or long_term",
                s
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Track,
    Artist,
    Album,
}

/// Release date at whatever precision the upstream gave us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReleaseDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl ReleaseDate {
    /// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD`. A year of `0000` is what the
    /// upstream sends for unknown dates and counts as unparsable.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('-');

        let year_part = parts.next()?;
        if year_part.len() != 4 {
            return None;
        }
        let year: i32 = year_part.parse().ok()?;
        if year <= 0 {
            return None;
        }

        let month = match parts.next() {
            Some(m) => {
                let m: u32 = m.parse().ok()?;
                if !(1..=12).contains(&m) {
                    return None;
                }
                Some(m)
            }
            None => None,
        };

        let day = match parts.next() {
            Some(d) => {
                let d: u32 = d.parse().ok()?;
                if !(1..=31).contains(&d) {
                    return None;
                }
                Some(d)
            }
            None => None,
        };

        if parts.next().is_some() {
            return None;
        }

        Some(Self { year, month, day })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: String,
    pub name: String,
    /// Primary album artist name.
    pub artist: String,
    /// Raw upstream release date string.
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    /// Primary artist first.
    pub artists: Vec<ArtistRef>,
    pub album: AlbumRef,
    pub release_date: Option<ReleaseDate>,
    pub popularity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub release_date: Option<String>,
    pub popularity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    /// `None` when the listing did not say how many tracks it holds.
    pub track_count: Option<u32>,
}

/// A playlist together with the track ids fetched for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistTracks {
    pub playlist: Playlist,
    pub track_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum TopItems {
    Tracks(Vec<Track>),
    Artists(Vec<Artist>),
    Albums(Vec<Album>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedItem<T> {
    /// 1-based.
    pub rank: usize,
    pub score: u32,
    pub item: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];
}

/// Whose credential an analytics request runs under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Owner,
    User(String),
}

impl Identity {
    /// Stable key used for the credential store and the refresh locks.
    pub fn key(&self) -> String {
        match self {
            Identity::Owner => "owner".to_string(),
            Identity::User(id) => format!("user-{}", id),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Result of a token exchange or refresh against the accounts service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// Absent on refresh responses that do not rotate the refresh token.
    pub refresh_token: Option<String>,
    pub scope: String,
    pub token_type: String,
    pub expires_in: u64,
    pub obtained_at: i64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
}

#[derive(Tabled)]
pub struct TopTableRow {
    pub rank: usize,
    pub name: String,
    pub detail: String,
    pub popularity: u8,
}
