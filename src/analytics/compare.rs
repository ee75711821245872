//! Artist membership across the three time windows.

use std::collections::HashSet;

use crate::{
    Res,
    analytics::{DEFAULT_LIMIT, fetch::fetch_top_artists},
    spotify::Catalog,
    types::{Artist, TimeWindow},
};

fn ids(list: &[Artist]) -> HashSet<&str> {
    list.iter().map(|a| a.id.as_str()).collect()
}

/// Keeps the first occurrence of each artist id in `long` that passes `keep`.
fn filter_long<'a>(long: &'a [Artist], keep: impl Fn(&str) -> bool) -> Vec<Artist> {
    let mut seen = HashSet::new();
    long.iter()
        .filter(|a| keep(&a.id) && seen.insert(a.id.as_str()))
        .cloned()
        .collect()
}

/// Artists present in all three windows, in long-window order.
pub fn standing_test_of_time(short: &[Artist], medium: &[Artist], long: &[Artist]) -> Vec<Artist> {
    if short.is_empty() || medium.is_empty() {
        return Vec::new();
    }
    let (short, medium) = (ids(short), ids(medium));
    filter_long(long, |id| short.contains(id) && medium.contains(id))
}

/// Artists of the long window absent from both the short and the medium
/// window, in long-window order.
pub fn fallen_off(short: &[Artist], medium: &[Artist], long: &[Artist]) -> Vec<Artist> {
    let (short, medium) = (ids(short), ids(medium));
    filter_long(long, |id| !short.contains(id) && !medium.contains(id))
}

async fn fetch_all_windows(catalog: &dyn Catalog) -> Res<(Vec<Artist>, Vec<Artist>, Vec<Artist>)> {
    tokio::try_join!(
        fetch_top_artists(catalog, TimeWindow::Short, DEFAULT_LIMIT),
        fetch_top_artists(catalog, TimeWindow::Medium, DEFAULT_LIMIT),
        fetch_top_artists(catalog, TimeWindow::Long, DEFAULT_LIMIT),
    )
}

/// Fetches the top 50 artists of all three windows concurrently and keeps
/// the ones present in each.
///
/// # Arguments
///
/// * `catalog` - Authenticated catalog of the acting identity
///
/// # Errors
///
/// Fails as soon as any of the three window fetches fails.
pub async fn fetch_standing_test_of_time(catalog: &dyn Catalog) -> Res<Vec<Artist>> {
    let (short, medium, long) = fetch_all_windows(catalog).await?;
    Ok(standing_test_of_time(&short, &medium, &long))
}

/// Counterpart of [`fetch_standing_test_of_time`] for artists only the
/// long window still holds.
pub async fn fetch_fallen_off(catalog: &dyn Catalog) -> Res<Vec<Artist>> {
    let (short, medium, long) = fetch_all_windows(catalog).await?;
    Ok(fallen_off(&short, &medium, &long))
}
