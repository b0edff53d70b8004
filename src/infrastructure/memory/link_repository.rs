use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use std::sync::Arc;

use super::MemoryStore;
use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Link storage backed by [`MemoryStore`].
pub struct MemoryLinkRepository {
    store: Arc<MemoryStore>,
}

impl MemoryLinkRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

fn link_not_found(id: i64) -> AppError {
    AppError::not_found("Link not found", json!({ "link_id": id }))
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        match self.store.codes.entry(new_link.code.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(
                "Short code already exists",
                json!({ "code": new_link.code }),
            )),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let link = Link {
                    id: self.store.next_link_id(),
                    code: new_link.code,
                    destination: new_link.destination,
                    domain: new_link.domain,
                    owner_id: new_link.owner_id,
                    camera_enabled: new_link.camera_enabled,
                    location_enabled: new_link.location_enabled,
                    click_count: 0,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };

                self.store.links.insert(link.id, link.clone());
                slot.insert(link.id);
                Ok(link)
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let Some(id) = self.store.codes.get(code).map(|entry| *entry.value()) else {
            return Ok(None);
        };

        Ok(self.store.links.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        Ok(self.store.links.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError> {
        let mut links: Vec<Link> = self
            .store
            .links
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();

        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(links)
    }

    async fn increment_clicks(&self, id: i64) -> Result<(), AppError> {
        // The shard write lock makes read-modify-write atomic per link.
        let mut link = self.store.links.get_mut(&id).ok_or_else(|| link_not_found(id))?;
        link.click_count += 1;
        link.updated_at = Utc::now();
        Ok(())
    }

    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        let mut link = self.store.links.get_mut(&id).ok_or_else(|| link_not_found(id))?;
        patch.apply(&mut link);
        Ok(link.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let Some((_, link)) = self.store.links.remove(&id) else {
            return Ok(false);
        };

        self.store.codes.remove(&link.code);
        self.store.visits.retain(|_, visit| visit.link_id != id);
        Ok(true)
    }
}
