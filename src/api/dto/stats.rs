//! DTOs for visit analytics.

use serde::Serialize;

use crate::application::services::stats_service::VisitPage;
use crate::domain::entities::Visit;

/// Pagination metadata for responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

/// One page of a link's visit log.
#[derive(Debug, Serialize)]
pub struct VisitLogResponse {
    pub link_id: i64,
    pub pagination: PaginationMeta,
    pub items: Vec<Visit>,
}

impl VisitLogResponse {
    pub fn new(link_id: i64, page: VisitPage) -> Self {
        Self {
            link_id,
            pagination: PaginationMeta {
                page: page.page,
                page_size: page.page_size,
                total_items: page.total,
                total_pages: page.total_pages,
            },
            items: page.items,
        }
    }
}

/// The latest visits of a link.
#[derive(Debug, Serialize)]
pub struct RecentVisitsResponse {
    pub link_id: i64,
    pub items: Vec<Visit>,
}
