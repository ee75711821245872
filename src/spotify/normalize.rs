//! Conversion from wire records to the internal records of [`crate::types`].
//!
//! Anything that lacks an identifier or a name is rejected with
//! [`Error::MalformedUpstreamRecord`]. A missing release date is not a reason
//! to reject a track: the temporal views count it as unknown.

use std::collections::HashSet;

use crate::{
    Res,
    error::Error,
    spotify::model::{
        AlbumObject, ArtistObject, PlaylistItemObject, PlaylistObject, SimpleArtistObject,
        TrackObject, UserObject,
    },
    types::{Album, AlbumRef, Artist, ArtistRef, Playlist, ReleaseDate, Track, UserProfile},
};

fn required(value: Option<String>, what: &str, record: &str) -> Res<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::MalformedUpstreamRecord(format!(
            "{} without {}",
            record, what
        ))),
    }
}

fn popularity(value: u32) -> u8 {
    value.min(100) as u8
}

fn artist_refs(artists: Vec<SimpleArtistObject>) -> Vec<ArtistRef> {
    artists
        .into_iter()
        .filter_map(|a| match (a.id, a.name) {
            (Some(id), Some(name)) if !id.is_empty() => Some(ArtistRef { id, name }),
            _ => None,
        })
        .collect()
}

pub fn track(raw: TrackObject) -> Res<Track> {
    if raw.is_local {
        return Err(Error::MalformedUpstreamRecord(
            "local file has no catalog identity".to_string(),
        ));
    }

    let id = required(raw.id, "id", "track")?;
    let name = required(raw.name, "name", "track")?;
    let popularity = raw.popularity.map(popularity).ok_or_else(|| {
        Error::MalformedUpstreamRecord(format!("track {} without popularity", id))
    })?;

    let artists = artist_refs(raw.artists);
    if artists.is_empty() {
        return Err(Error::MalformedUpstreamRecord(format!(
            "track {} without artists",
            id
        )));
    }

    let album = raw.album.ok_or_else(|| {
        Error::MalformedUpstreamRecord(format!("track {} without album", id))
    })?;
    let album_id = required(album.id, "album id", "track")?;
    let album_name = required(album.name, "album name", "track")?;
    let album_artist = artist_refs(album.artists)
        .into_iter()
        .next()
        .map(|a| a.name)
        .unwrap_or_else(|| artists[0].name.clone());
    let release_date = album.release_date.as_deref().and_then(ReleaseDate::parse);

    Ok(Track {
        id,
        name,
        artists,
        album: AlbumRef {
            id: album_id,
            name: album_name,
            artist: album_artist,
            release_date: album.release_date,
        },
        release_date,
        popularity,
    })
}

pub fn artist(raw: ArtistObject) -> Res<Artist> {
    let id = required(raw.id, "id", "artist")?;
    let name = required(raw.name, "name", "artist")?;

    let mut seen = HashSet::new();
    let genres = raw
        .genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty() && seen.insert(g.clone()))
        .collect();

    Ok(Artist {
        id,
        name,
        genres,
        popularity: raw.popularity.map(popularity).unwrap_or(0),
    })
}

pub fn album(raw: AlbumObject) -> Res<Album> {
    let id = required(raw.id, "id", "album")?;
    let name = required(raw.name, "name", "album")?;
    let artist = artist_refs(raw.artists)
        .into_iter()
        .next()
        .map(|a| a.name)
        .unwrap_or_default();

    Ok(Album {
        id,
        name,
        artist,
        release_date: raw.release_date,
        popularity: raw.popularity.map(popularity).unwrap_or(0),
    })
}

pub fn playlist(raw: PlaylistObject) -> Res<Playlist> {
    let id = required(raw.id, "id", "playlist")?;
    let name = raw.name.unwrap_or_default();

    Ok(Playlist {
        id,
        name,
        track_count: raw.tracks.and_then(|t| t.total),
    })
}

/// Track id of a playlist entry. Episodes, local files and removed tracks
/// have none.
pub fn playlist_item_track_id(raw: PlaylistItemObject) -> Option<String> {
    let track = raw.track?;
    match track.kind.as_deref() {
        None | Some("track") => track.id.filter(|id| !id.is_empty()),
        Some(_) => None,
    }
}

pub fn user(raw: UserObject) -> Res<UserProfile> {
    let id = required(raw.id, "id", "user")?;
    let display_name = raw
        .display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| id.clone());

    Ok(UserProfile { id, display_name })
}
