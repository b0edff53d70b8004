//! Owner-scoped visit analytics.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::entities::{Link, Visit};
use crate::domain::repositories::{
    DailyCount, GroupCount, LinkRepository, VisitField, VisitRepository,
};
use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;
pub const RECENT_VISITS_LIMIT: i64 = 100;
const TOP_COUNTRIES_LIMIT: i64 = 10;
const DAILY_WINDOW_DAYS: i64 = 30;

/// Per-link entry of the summary. `click_count` is the link's counter, which
/// can run ahead of the number of visit rows if visit writes failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub id: i64,
    pub code: String,
    pub destination: String,
    pub click_count: i64,
}

impl From<&Link> for LinkSummary {
    fn from(link: &Link) -> Self {
        Self {
            id: link.id,
            code: link.code.clone(),
            destination: link.destination.clone(),
            click_count: link.click_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    /// Visit rows across all of the owner's links.
    pub total_clicks: i64,
    /// Distinct non-empty public IPs.
    pub unique_visitors: i64,
    pub top_countries: Vec<GroupCount>,
    /// Visit rows per link id; every owned link is present.
    pub clicks_by_link: BTreeMap<i64, i64>,
    pub devices: Vec<GroupCount>,
    pub referrers: Vec<GroupCount>,
    /// One entry per UTC day of the window, oldest first, zero-filled.
    pub daily: Vec<DailyCount>,
    pub links: Vec<LinkSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitPage {
    pub items: Vec<Visit>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

pub struct StatsService {
    links: Arc<dyn LinkRepository>,
    visits: Arc<dyn VisitRepository>,
}

impl StatsService {
    pub fn new(links: Arc<dyn LinkRepository>, visits: Arc<dyn VisitRepository>) -> Self {
        Self { links, visits }
    }

    /// Aggregates every link owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on storage errors.
    pub async fn summary(&self, owner_id: i64) -> Result<StatsSummary, AppError> {
        let links = self.links.list_by_owner(owner_id).await?;
        let ids: Vec<i64> = links.iter().map(|l| l.id).collect();
        let since = window_start(Utc::now());

        let (total_clicks, unique_visitors, top_countries, per_link, devices, referrers, daily) =
            tokio::try_join!(
                self.visits.count_by_links(&ids),
                self.visits.distinct_public_ips_by_links(&ids),
                self.visits
                    .group_count_by(VisitField::Country, &ids, Some(TOP_COUNTRIES_LIMIT)),
                self.visits.group_count_by(VisitField::LinkId, &ids, None),
                self.visits.group_count_by(VisitField::DeviceType, &ids, None),
                self.visits.group_count_by(VisitField::ReferrerType, &ids, None),
                self.visits.daily_counts(&ids, since),
            )?;

        let mut clicks_by_link: BTreeMap<i64, i64> = ids.iter().map(|id| (*id, 0)).collect();
        for group in per_link {
            if let Ok(id) = group.key.parse::<i64>()
                && let Some(count) = clicks_by_link.get_mut(&id)
            {
                *count = group.count;
            }
        }

        Ok(StatsSummary {
            total_clicks,
            unique_visitors,
            top_countries,
            clicks_by_link,
            devices,
            referrers,
            daily: fill_days(since, DAILY_WINDOW_DAYS, daily),
            links: links.iter().map(LinkSummary::from).collect(),
        })
    }

    /// One page of a link's visits, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for `page < 1` or a page size outside
    /// `1..=500`, and [`AppError::NotFound`] when the link does not exist or
    /// belongs to someone else.
    pub async fn visit_log(
        &self,
        owner_id: i64,
        link_id: i64,
        page: i64,
        page_size: i64,
    ) -> Result<VisitPage, AppError> {
        if page < 1 {
            return Err(AppError::bad_request(
                "page must be at least 1",
                json!({ "page": page }),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::bad_request(
                format!("page_size must be between 1 and {MAX_PAGE_SIZE}"),
                json!({ "page_size": page_size }),
            ));
        }

        self.owned_link(owner_id, link_id).await?;

        let offset = (page - 1).saturating_mul(page_size);
        let ids = [link_id];
        let (total, items) = tokio::try_join!(
            self.visits.count_by_links(&ids),
            self.visits.paginate(link_id, offset, page_size),
        )?;

        Ok(VisitPage {
            items,
            total,
            page,
            page_size,
            total_pages: (total + page_size - 1) / page_size,
        })
    }

    /// The latest visits of a link, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] when the link does not exist or belongs
    /// to someone else.
    pub async fn recent_visits(&self, owner_id: i64, link_id: i64) -> Result<Vec<Visit>, AppError> {
        self.owned_link(owner_id, link_id).await?;
        self.visits.paginate(link_id, 0, RECENT_VISITS_LIMIT).await
    }

    async fn owned_link(&self, owner_id: i64, link_id: i64) -> Result<Link, AppError> {
        self.links
            .find_by_id(link_id)
            .await?
            .filter(|link| link.is_owned_by(owner_id))
            .ok_or_else(|| AppError::not_found("Link not found", json!({ "link_id": link_id })))
    }
}

/// Midnight UTC at the start of the daily window ending today.
fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() - Duration::days(DAILY_WINDOW_DAYS - 1))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

fn fill_days(since: DateTime<Utc>, days: i64, counts: Vec<DailyCount>) -> Vec<DailyCount> {
    let counts: BTreeMap<_, _> = counts.into_iter().map(|d| (d.day, d.count)).collect();
    let first = since.date_naive();

    (0..days)
        .map(|offset| {
            let day = first + Duration::days(offset);
            DailyCount {
                day,
                count: counts.get(&day).copied().unwrap_or(0),
            }
        })
        .collect()
}
