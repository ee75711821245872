use std::sync::Arc;

use tabled::Table;

use crate::{
    analytics::fetch::fetch_top_items,
    config::Settings,
    error,
    management::{CredentialManager, TokenStore},
    spotify::{
        CatalogFactory, SpotifyCatalogFactory,
        auth::{AccountsClient, Authorizer},
        client::http_client,
    },
    types::{Identity, ItemKind, TimeWindow, TopItems, TopTableRow},
    utils, warning,
};

/// Prints the owner's top items for one window as a table.
pub async fn top(settings: &Settings, kind: ItemKind, window: TimeWindow, limit: usize) {
    let http = match http_client() {
        Ok(http) => http,
        Err(e) => error!("{}", e),
    };
    let authorizer: Arc<dyn Authorizer> = Arc::new(AccountsClient::new(http.clone(), settings));
    let credentials = CredentialManager::new(TokenStore::new(&settings.data_dir), authorizer);
    let catalogs = SpotifyCatalogFactory::new(http, settings.api_url.clone());

    let pb = utils::spinner(format!("Fetching top items for {}...", window));
    let result = credentials
        .run_authorized(&Identity::Owner, |token| {
            let catalog = catalogs.catalog(&token);
            async move { fetch_top_items(catalog.as_ref(), kind, window, limit).await }
        })
        .await;
    pb.finish_and_clear();

    let items = match result {
        Ok(items) => items,
        Err(e) if e.is_unauthenticated() => {
            error!("Owner account is not connected. Run euterpe auth first. Err: {}", e)
        }
        Err(e) => error!("Failed to fetch top items. Err: {}", e),
    };

    let rows = table_rows(items);
    if rows.is_empty() {
        warning!("No top items for {} yet.", window);
        return;
    }
    println!("{}", Table::new(rows));
}

fn table_rows(items: TopItems) -> Vec<TopTableRow> {
    let rows = match items {
        TopItems::Tracks(tracks) => tracks
            .into_iter()
            .map(|t| TopTableRow {
                rank: 0,
                detail: utils::join_names(t.artists.iter().map(|a| a.name.as_str())),
                name: t.name,
                popularity: t.popularity,
            })
            .collect::<Vec<_>>(),
        TopItems::Artists(artists) => artists
            .into_iter()
            .map(|a| TopTableRow {
                rank: 0,
                detail: a.genres.iter().take(3).cloned().collect::<Vec<_>>().join(","),
                name: a.name,
                popularity: a.popularity,
            })
            .collect(),
        TopItems::Albums(albums) => albums
            .into_iter()
            .map(|a| TopTableRow {
                rank: 0,
                detail: a.artist,
                name: a.name,
                popularity: a.popularity,
            })
            .collect(),
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| TopTableRow { rank: i + 1, ..row })
        .collect()
}
