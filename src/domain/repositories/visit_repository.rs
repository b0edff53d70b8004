//! Repository trait for visit records and their aggregates.

use crate::domain::entities::{NewVisit, Visit};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Visit attribute that aggregate queries can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitField {
    LinkId,
    Country,
    DeviceType,
    ReferrerType,
}

impl VisitField {
    /// SQL expression producing the grouping key as text.
    pub fn sql_expr(&self) -> &'static str {
        match self {
            Self::LinkId => "link_id::text",
            Self::Country => "geo->>'country'",
            Self::DeviceType => "device_type",
            Self::ReferrerType => "referrer_type",
        }
    }

    /// Grouping key of a stored visit; `None` rows are left out of the groups.
    pub fn key_of(&self, visit: &Visit) -> Option<String> {
        match self {
            Self::LinkId => Some(visit.link_id.to_string()),
            Self::Country => visit
                .geo
                .as_ref()
                .and_then(|g| g.country.clone())
                .filter(|c| !c.is_empty()),
            Self::DeviceType => Some(visit.device.device_type.as_str().to_string()),
            Self::ReferrerType => Some(visit.referrer.referrer_type.as_str().to_string()),
        }
    }
}

/// One bucket of a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

/// Visits per UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// Sorts buckets by count descending, then key ascending.
pub fn sort_groups(groups: &mut [GroupCount]) {
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
}

/// Repository interface for visits.
///
/// All aggregate queries take an explicit link-id set; scoping to an owner is
/// done by the caller.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgVisitRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryVisitRepository`] - in-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitRepository: Send + Sync {
    /// Persists a visit; `created_at` is set at persistence time.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the link does not exist.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn create(&self, new_visit: NewVisit) -> Result<Visit, AppError>;

    /// Counts visits belonging to any of `link_ids`.
    async fn count_by_links(&self, link_ids: &[i64]) -> Result<i64, AppError>;

    /// Counts distinct non-empty public IPs across `link_ids`.
    async fn distinct_public_ips_by_links(&self, link_ids: &[i64]) -> Result<i64, AppError>;

    /// Groups visits of `link_ids` by `field`, sorted by count descending then
    /// key ascending, truncated to `limit` when given.
    async fn group_count_by(
        &self,
        field: VisitField,
        link_ids: &[i64],
        limit: Option<i64>,
    ) -> Result<Vec<GroupCount>, AppError>;

    /// Visits of one link, newest first (id descending on equal timestamps).
    async fn paginate(&self, link_id: i64, offset: i64, limit: i64)
    -> Result<Vec<Visit>, AppError>;

    /// Visits per day since `since`, ascending by day. Days without visits are omitted.
    async fn daily_counts(
        &self,
        link_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_groups_is_stable_on_ties() {
        let mut groups = vec![
            GroupCount { key: "mobile".into(), count: 2 },
            GroupCount { key: "bot".into(), count: 5 },
            GroupCount { key: "desktop".into(), count: 2 },
        ];

        sort_groups(&mut groups);

        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, ["bot", "desktop", "mobile"]);
    }
}
