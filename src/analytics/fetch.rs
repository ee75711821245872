//! Windowed fetch helper: bounded, ordered top lists for one time window.

use std::{collections::HashMap, future::Future};

use tracing::{debug, warn};

use crate::{
    Res,
    error::Error,
    spotify::{Catalog, MAX_ALBUM_BATCH, MAX_PAGE_SIZE, model::Paging, normalize},
    types::{Album, AlbumRef, Artist, ItemKind, Playlist, TimeWindow, TopItems, Track},
};

/// Walks offset pages until `limit` normalized items are collected or the
/// upstream runs out. Items keep upstream order. Records that fail
/// normalization are skipped and do not count toward `limit`.
pub(crate) async fn collect_pages<W, T, F, Fut, N>(
    limit: usize,
    mut fetch_page: F,
    normalize: N,
) -> Res<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Res<Paging<W>>>,
    N: Fn(W) -> Res<T>,
{
    let mut items = Vec::with_capacity(limit.min(MAX_PAGE_SIZE as usize));
    let mut offset: u32 = 0;

    while items.len() < limit {
        let want = (limit - items.len()).min(MAX_PAGE_SIZE as usize) as u32;
        let page = fetch_page(want, offset).await?;
        let received = page.items.len();

        for raw in page.items {
            match normalize(raw) {
                Ok(item) if items.len() < limit => items.push(item),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping upstream record"),
            }
        }

        if received == 0 || page.next.is_none() {
            break;
        }
        offset += received as u32;
    }

    Ok(items)
}

/// Fetches the user's top tracks for one time window.
///
/// Pages through `/me/top/tracks` until `limit` usable tracks are collected
/// or the upstream has no more. Tracks stay in upstream ranking order and
/// are never re-sorted here.
///
/// # Arguments
///
/// * `catalog` - Authenticated catalog of the acting identity
/// * `window` - Lookback period to rank over
/// * `limit` - Maximum number of tracks to return; may exceed one page
///
/// # Errors
///
/// Returns `Unauthenticated` when the access token is rejected and
/// `UpstreamUnavailable` when a page cannot be fetched. Malformed records
/// are skipped, not reported.
///
/// # Example
///
/// ```
/// let tracks = fetch_top_tracks(catalog.as_ref(), TimeWindow::Short, 50).await?;
/// ```
pub async fn fetch_top_tracks(
    catalog: &dyn Catalog,
    window: TimeWindow,
    limit: usize,
) -> Res<Vec<Track>> {
    collect_pages(
        limit,
        |page_limit, offset| catalog.top_tracks(window, page_limit, offset),
        normalize::track,
    )
    .await
}

/// Fetches the user's top artists for one time window.
///
/// Same paging and ordering rules as [`fetch_top_tracks`].
///
/// # Arguments
///
/// * `catalog` - Authenticated catalog of the acting identity
/// * `window` - Lookback period to rank over
/// * `limit` - Maximum number of artists to return
pub async fn fetch_top_artists(
    catalog: &dyn Catalog,
    window: TimeWindow,
    limit: usize,
) -> Res<Vec<Artist>> {
    collect_pages(
        limit,
        |page_limit, offset| catalog.top_artists(window, page_limit, offset),
        normalize::artist,
    )
    .await
}

/// Albums of the window's top tracks, in order of first appearance.
///
/// Popularity comes from the album batch lookup. Albums the lookup cannot
/// resolve fall back to the mean popularity of their top tracks.
pub async fn fetch_top_albums(
    catalog: &dyn Catalog,
    window: TimeWindow,
    limit: usize,
) -> Res<Vec<Album>> {
    let tracks = fetch_top_tracks(catalog, window, limit.max(MAX_PAGE_SIZE as usize)).await?;

    let mut albums: Vec<AlbumRef> = Vec::new();
    let mut track_popularity: HashMap<String, Vec<u8>> = HashMap::new();
    for track in &tracks {
        let entry = track_popularity.entry(track.album.id.clone()).or_default();
        if entry.is_empty() {
            albums.push(track.album.clone());
        }
        entry.push(track.popularity);
    }
    albums.truncate(limit);

    let ids: Vec<String> = albums.iter().map(|a| a.id.clone()).collect();
    let mut resolved: HashMap<String, u8> = HashMap::new();
    for chunk in ids.chunks(MAX_ALBUM_BATCH) {
        match catalog.albums(chunk).await {
            Ok(batch) => {
                for album in batch.into_iter().flatten() {
                    if let Ok(album) = normalize::album(album) {
                        resolved.entry(album.id).or_insert(album.popularity);
                    }
                }
            }
            Err(e) if e.is_unauthenticated() => return Err(e),
            Err(e) => {
                let e = Error::PartialResolution {
                    what: format!("popularity of {} albums", chunk.len()),
                    reason: e.to_string(),
                };
                warn!(error = %e, "falling back to track popularity");
            }
        }
    }

    Ok(albums
        .into_iter()
        .map(|album| {
            let popularity = resolved.get(&album.id).copied().unwrap_or_else(|| {
                mean(track_popularity.get(&album.id).map(Vec::as_slice).unwrap_or(&[]))
            });
            Album {
                id: album.id,
                name: album.name,
                artist: album.artist,
                release_date: album.release_date,
                popularity,
            }
        })
        .collect())
}

fn mean(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let sum: u32 = values.iter().map(|&v| v as u32).sum();
    ((sum as f64) / (values.len() as f64)).round() as u8
}

/// Top list of any of the three item kinds for one window.
///
/// # Arguments
///
/// * `catalog` - Authenticated catalog of the acting identity
/// * `kind` - Tracks, artists or albums
/// * `window` - Lookback period to rank over
/// * `limit` - Maximum number of items to return
///
/// # Example
///
/// ```
/// match fetch_top_items(catalog, ItemKind::Album, TimeWindow::Long, 20).await? {
///     TopItems::Albums(albums) => println!("{} albums", albums.len()),
///     _ => unreachable!(),
/// }
/// ```
pub async fn fetch_top_items(
    catalog: &dyn Catalog,
    kind: ItemKind,
    window: TimeWindow,
    limit: usize,
) -> Res<TopItems> {
    Ok(match kind {
        ItemKind::Track => TopItems::Tracks(fetch_top_tracks(catalog, window, limit).await?),
        ItemKind::Artist => TopItems::Artists(fetch_top_artists(catalog, window, limit).await?),
        ItemKind::Album => TopItems::Albums(fetch_top_albums(catalog, window, limit).await?),
    })
}

/// Every playlist of the current user, in listing order.
pub async fn fetch_playlists(catalog: &dyn Catalog) -> Res<Vec<Playlist>> {
    collect_pages(
        usize::MAX,
        |page_limit, offset| catalog.playlists(page_limit, offset),
        normalize::playlist,
    )
    .await
}

/// Track ids of one playlist, in playlist order.
///
/// Entries without a track id are skipped. Every page is fetched.
pub async fn fetch_playlist_track_ids(catalog: &dyn Catalog, playlist_id: &str) -> Res<Vec<String>> {
    collect_pages(
        usize::MAX,
        |page_limit, offset| catalog.playlist_items(playlist_id, page_limit, offset),
        |item| {
            normalize::playlist_item_track_id(item).ok_or_else(|| {
                Error::MalformedUpstreamRecord("playlist entry without track id".to_string())
            })
        },
    )
    .await
}
