//! Client-side row model loading.

use crate::api::query::Page;
use crate::api::query::Query;
use crate::backend::Backend;
use crate::error::Error;

/// Loads every row and column of `table` with an exact count.
///
/// Used when the grid sorts, filters and groups on its own.
pub async fn fetch_all<B: Backend + ?Sized>(backend: &B, table: &str) -> Result<Page, Error> {
    let query = Query::new(table).include_count();

    let page = match backend.fetch(&query).await {
        Ok(page) => page,
        Err(e) => {
            log::error!("Error fetching data from {}: {}", table, e);
            return Err(e);
        }
    };

    log::info!("Fetched {} rows from {}", page.len(), table);
    if let Some(first) = page.rows().first() {
        log::debug!("First row: {:?}", first);
    }
    match page.total_count() {
        Some(total) => log::info!("Total count reported: {}", total),
        None => log::info!("No total count reported"),
    }

    Ok(page)
}
