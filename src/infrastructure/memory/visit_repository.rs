use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::MemoryStore;
use crate::domain::entities::{NewVisit, Visit};
use crate::domain::repositories::{
    DailyCount, GroupCount, VisitField, VisitRepository, sort_groups,
};
use crate::error::AppError;

/// Visit storage backed by [`MemoryStore`].
pub struct MemoryVisitRepository {
    store: Arc<MemoryStore>,
}

impl MemoryVisitRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn visits_for(&self, link_ids: &[i64]) -> Vec<Visit> {
        let wanted: HashSet<i64> = link_ids.iter().copied().collect();

        self.store
            .visits
            .iter()
            .filter(|entry| wanted.contains(&entry.link_id))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl VisitRepository for MemoryVisitRepository {
    async fn create(&self, new_visit: NewVisit) -> Result<Visit, AppError> {
        // The link guard is held until the visit is inserted, so a concurrent
        // delete either sees the visit in its cascade or happens first.
        let Some(_link) = self.store.links.get(&new_visit.link_id) else {
            return Err(AppError::bad_request(
                "Referenced record does not exist",
                json!({ "link_id": new_visit.link_id }),
            ));
        };

        let visit = new_visit.into_visit(self.store.next_visit_id(), Utc::now());
        self.store.visits.insert(visit.id, visit.clone());
        Ok(visit)
    }

    async fn count_by_links(&self, link_ids: &[i64]) -> Result<i64, AppError> {
        Ok(self.visits_for(link_ids).len() as i64)
    }

    async fn distinct_public_ips_by_links(&self, link_ids: &[i64]) -> Result<i64, AppError> {
        let ips: HashSet<String> = self
            .visits_for(link_ids)
            .into_iter()
            .map(|v| v.public_ip)
            .filter(|ip| !ip.is_empty())
            .collect();

        Ok(ips.len() as i64)
    }

    async fn group_count_by(
        &self,
        field: VisitField,
        link_ids: &[i64],
        limit: Option<i64>,
    ) -> Result<Vec<GroupCount>, AppError> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for visit in self.visits_for(link_ids) {
            if let Some(key) = field.key_of(&visit) {
                *counts.entry(key).or_insert(0) += 1;
            }
        }

        let mut groups: Vec<GroupCount> = counts
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect();
        sort_groups(&mut groups);

        if let Some(limit) = limit {
            groups.truncate(limit.max(0) as usize);
        }
        Ok(groups)
    }

    async fn paginate(
        &self,
        link_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Visit>, AppError> {
        let mut visits = self.visits_for(&[link_id]);
        visits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(visits
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn daily_counts(
        &self,
        link_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, AppError> {
        let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for visit in self.visits_for(link_ids) {
            if visit.created_at >= since {
                *days.entry(visit.created_at.date_naive()).or_insert(0) += 1;
            }
        }

        Ok(days
            .into_iter()
            .map(|(day, count)| DailyCount { day, count })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        DeviceInfo, DeviceType, GeoDescriptor, NewLink, ReferrerInfo,
    };
    use crate::domain::repositories::LinkRepository;
    use crate::infrastructure::memory::MemoryLinkRepository;

    async fn setup() -> (Arc<MemoryStore>, i64) {
        let store = Arc::new(MemoryStore::new());
        let link = MemoryLinkRepository::new(Arc::clone(&store))
            .create(NewLink {
                code: "m1".into(),
                destination: "example.com".into(),
                domain: None,
                owner_id: 1,
                camera_enabled: false,
                location_enabled: false,
            })
            .await
            .unwrap();
        (store, link.id)
    }

    fn visit(link_id: i64, ip: &str, device_type: DeviceType, country: Option<&str>) -> NewVisit {
        NewVisit {
            link_id,
            public_ip: ip.to_string(),
            internal_ip: None,
            session_id: "s".into(),
            device: DeviceInfo {
                device_type,
                ..DeviceInfo::default()
            },
            referrer: ReferrerInfo::default(),
            headers: json!({}),
            geo: country.map(|c| GeoDescriptor {
                country: Some(c.to_string()),
                ..GeoDescriptor::default()
            }),
            photo_url: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_counts_and_distinct_ips() {
        let (store, link_id) = setup().await;
        let repo = MemoryVisitRepository::new(store);

        repo.create(visit(link_id, "1.1.1.1", DeviceType::Mobile, Some("DE"))).await.unwrap();
        repo.create(visit(link_id, "1.1.1.1", DeviceType::Desktop, Some("DE"))).await.unwrap();
        repo.create(visit(link_id, "", DeviceType::Mobile, None)).await.unwrap();

        assert_eq!(repo.count_by_links(&[link_id]).await.unwrap(), 3);
        assert_eq!(repo.distinct_public_ips_by_links(&[link_id]).await.unwrap(), 1);
        assert_eq!(repo.count_by_links(&[]).await.unwrap(), 0);

        let countries = repo
            .group_count_by(VisitField::Country, &[link_id], Some(10))
            .await
            .unwrap();
        assert_eq!(countries, vec![GroupCount { key: "DE".into(), count: 2 }]);

        let devices = repo
            .group_count_by(VisitField::DeviceType, &[link_id], None)
            .await
            .unwrap();
        assert_eq!(devices[0], GroupCount { key: "mobile".into(), count: 2 });
    }

    #[tokio::test]
    async fn test_visit_for_missing_link_rejected() {
        let (store, _) = setup().await;
        let repo = MemoryVisitRepository::new(store);

        let err = repo
            .create(visit(404, "1.1.1.1", DeviceType::Desktop, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_paginate_newest_first() {
        let (store, link_id) = setup().await;
        let repo = MemoryVisitRepository::new(store);

        for _ in 0..5 {
            repo.create(visit(link_id, "2.2.2.2", DeviceType::Desktop, None)).await.unwrap();
        }

        let page = repo.paginate(link_id, 0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].id > page[1].id);

        let tail = repo.paginate(link_id, 4, 2).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert!(repo.paginate(link_id, 10, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_link_cascades() {
        let (store, link_id) = setup().await;
        let repo = MemoryVisitRepository::new(Arc::clone(&store));
        repo.create(visit(link_id, "3.3.3.3", DeviceType::Desktop, None)).await.unwrap();

        MemoryLinkRepository::new(Arc::clone(&store))
            .delete(link_id)
            .await
            .unwrap();

        assert_eq!(store.visit_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_racing_inserts_leaves_no_orphans() {
        for _ in 0..20 {
            let (store, link_id) = setup().await;
            let repo = Arc::new(MemoryVisitRepository::new(Arc::clone(&store)));

            let mut writers = tokio::task::JoinSet::new();
            for _ in 0..8 {
                let repo = Arc::clone(&repo);
                writers.spawn(async move {
                    for _ in 0..25 {
                        let _ = repo
                            .create(visit(link_id, "4.4.4.4", DeviceType::Desktop, None))
                            .await;
                        tokio::task::yield_now().await;
                    }
                });
            }

            MemoryLinkRepository::new(Arc::clone(&store))
                .delete(link_id)
                .await
                .unwrap();
            while writers.join_next().await.is_some() {}

            assert_eq!(store.visit_count(), 0);
        }
    }
}
