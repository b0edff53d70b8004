//! Pagination query parameters.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};

use crate::application::services::stats_service::DEFAULT_PAGE_SIZE;

/// Pagination query parameters for the visit log.
///
/// Uses `serde_with` to parse page numbers from query strings as integers.
/// Range checks happen in the stats service so that API and CLI callers
/// share them.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<i64>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl PaginationParams {
    /// `(page, page_size)` with defaults applied.
    ///
    /// # Defaults
    ///
    /// - `page`: 1
    /// - `page_size`: 50
    pub fn resolve(&self) -> (i64, i64) {
        (
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}
