//! Owner-scoped link management.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::{generate_code, validate_custom_code};
use crate::utils::url_normalizer::validate_destination;

/// Input for [`LinkService::create`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateLink {
    pub original_url: String,
    pub domain: Option<String>,
    pub short_code: Option<String>,
    pub camera_enabled: bool,
    pub location_enabled: bool,
}

/// Service for creating and maintaining an owner's links.
///
/// Destinations are validated on write but stored as submitted; the resolver
/// normalizes them on every read. Every mutation invalidates the link cache.
pub struct LinkService {
    links: Arc<dyn LinkRepository>,
    cache: Arc<dyn CacheService>,
}

impl LinkService {
    pub fn new(links: Arc<dyn LinkRepository>, cache: Arc<dyn CacheService>) -> Self {
        Self { links, cache }
    }

    /// Creates a link for `owner_id`.
    ///
    /// # Code Generation
    ///
    /// - If `short_code` is provided, validates and uses it
    /// - Otherwise, generates a cryptographically secure random 12-character code
    /// - Retries up to 10 times on collision before failing
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the destination or the custom code
    /// is invalid.
    /// Returns [`AppError::Conflict`] if the custom code already exists.
    pub async fn create(&self, owner_id: i64, input: CreateLink) -> Result<Link, AppError> {
        let destination = input.original_url.trim().to_string();
        validate_destination(&destination).map_err(|e| {
            AppError::bad_request("Invalid destination URL", json!({ "reason": e.to_string() }))
        })?;

        let code = match input.short_code.filter(|c| !c.is_empty()) {
            Some(custom) => {
                validate_custom_code(&custom)?;
                custom
            }
            None => self.generate_unique_code().await?,
        };

        let link = self
            .links
            .create(NewLink {
                code,
                destination,
                domain: input.domain.filter(|d| !d.trim().is_empty()),
                owner_id,
                camera_enabled: input.camera_enabled,
                location_enabled: input.location_enabled,
            })
            .await?;

        info!(link_id = link.id, code = %link.code, owner_id, "Link created");
        Ok(link)
    }

    pub async fn list(&self, owner_id: i64) -> Result<Vec<Link>, AppError> {
        self.links.list_by_owner(owner_id).await
    }

    /// Applies `patch` to an owned link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown or foreign ids and
    /// [`AppError::Validation`] for an empty patch or an invalid destination.
    pub async fn update(&self, owner_id: i64, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        if patch.is_empty() {
            return Err(AppError::bad_request(
                "Nothing to update",
                json!({ "link_id": id }),
            ));
        }

        let patch = match patch.destination {
            Some(ref destination) => {
                let destination = destination.trim().to_string();
                validate_destination(&destination).map_err(|e| {
                    AppError::bad_request(
                        "Invalid destination URL",
                        json!({ "reason": e.to_string() }),
                    )
                })?;
                LinkPatch {
                    destination: Some(destination),
                    ..patch
                }
            }
            None => patch,
        };

        let current = self.owned(owner_id, id).await?;
        let updated = self.links.update(id, patch).await?;
        self.invalidate(&current.code).await;

        Ok(updated)
    }

    /// Deletes an owned link together with its visits.
    pub async fn delete(&self, owner_id: i64, id: i64) -> Result<(), AppError> {
        let current = self.owned(owner_id, id).await?;

        if !self.links.delete(id).await? {
            return Err(link_not_found(id));
        }
        self.invalidate(&current.code).await;

        info!(link_id = id, owner_id, "Link deleted");
        Ok(())
    }

    async fn owned(&self, owner_id: i64, id: i64) -> Result<Link, AppError> {
        self.links
            .find_by_id(id)
            .await?
            .filter(|link| link.is_owned_by(owner_id))
            .ok_or_else(|| link_not_found(id))
    }

    async fn invalidate(&self, code: &str) {
        if let Err(e) = self.cache.invalidate(code).await {
            warn!(code, error = %e, "Failed to invalidate cached link");
        }
    }

    /// Generates an unused short code, retrying on collision.
    async fn generate_unique_code(&self) -> Result<String, AppError> {
        const MAX_ATTEMPTS: usize = 10;

        for _ in 0..MAX_ATTEMPTS {
            let code = generate_code();

            if self.links.find_by_code(&code).await?.is_none() {
                return Ok(code);
            }
        }

        Err(AppError::internal(
            "Failed to generate unique code",
            json!({ "reason": "Too many collisions" }),
        ))
    }
}

fn link_not_found(id: i64) -> AppError {
    AppError::not_found("Link not found", json!({ "link_id": id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::NullCache;
    use chrono::Utc;

    fn stored(new_link: NewLink, id: i64) -> Link {
        let now = Utc::now();
        Link {
            id,
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
        }
    }

    fn existing(id: i64, owner_id: i64) -> Link {
        stored(
            NewLink {
                code: "abc".into(),
                destination: "example.com".into(),
                domain: None,
                owner_id,
                camera_enabled: false,
                location_enabled: false,
            },
            id,
        )
    }

    fn service(repo: MockLinkRepository) -> LinkService {
        LinkService::new(Arc::new(repo), Arc::new(NullCache::new()))
    }

    #[tokio::test]
    async fn test_create_with_custom_code_keeps_raw_destination() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create()
            .withf(|l| {
                l.code == "abc"
                    && l.destination == "example.com"
                    && l.domain.as_deref() == Some("x.test")
                    && l.owner_id == 4
            })
            .times(1)
            .returning(|l| Ok(stored(l, 1)));

        let link = service(repo)
            .create(
                4,
                CreateLink {
                    original_url: "example.com".into(),
                    domain: Some("x.test".into()),
                    short_code: Some("abc".into()),
                    ..CreateLink::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(link.code, "abc");
        assert_eq!(link.destination, "example.com");
    }

    #[tokio::test]
    async fn test_create_generates_code() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| Ok(None));
        repo.expect_create()
            .withf(|l| l.code.len() == 12)
            .returning(|l| Ok(stored(l, 2)));

        let link = service(repo)
            .create(
                1,
                CreateLink {
                    original_url: "https://example.com/a".into(),
                    ..CreateLink::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(link.code.len(), 12);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_destination() {
        for url in ["", "ftp://files.example.com", "exa mple.com"] {
            let err = service(MockLinkRepository::new())
                .create(
                    1,
                    CreateLink {
                        original_url: url.into(),
                        ..CreateLink::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }), "{url}");
        }
    }

    #[tokio::test]
    async fn test_create_rejects_reserved_code() {
        let err = service(MockLinkRepository::new())
            .create(
                1,
                CreateLink {
                    original_url: "example.com".into(),
                    short_code: Some("track".into()),
                    ..CreateLink::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_create_duplicate_code_conflicts() {
        let mut repo = MockLinkRepository::new();
        repo.expect_create().returning(|l| {
            Err(AppError::conflict(
                "Short code already exists",
                json!({ "code": l.code }),
            ))
        });

        let err = service(repo)
            .create(
                1,
                CreateLink {
                    original_url: "example.com".into(),
                    short_code: Some("taken".into()),
                    ..CreateLink::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_foreign_link_is_not_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(existing(id, 2))));
        repo.expect_update().times(0);

        let err = service(repo)
            .update(
                1,
                5,
                LinkPatch {
                    is_active: Some(false),
                    ..LinkPatch::default()
                },
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_owned_link() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(existing(id, 1))));
        repo.expect_update()
            .withf(|id, patch| *id == 5 && patch.camera_enabled == Some(true))
            .times(1)
            .returning(|id, patch| {
                let mut link = existing(id, 1);
                patch.apply(&mut link);
                Ok(link)
            });

        let link = service(repo)
            .update(
                1,
                5,
                LinkPatch {
                    camera_enabled: Some(true),
                    ..LinkPatch::default()
                },
            )
            .await
            .unwrap();

        assert!(link.camera_enabled);
    }

    #[tokio::test]
    async fn test_update_empty_patch_rejected() {
        let err = service(MockLinkRepository::new())
            .update(1, 5, LinkPatch::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_delete_owned_link() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(existing(id, 1))));
        repo.expect_delete().times(1).returning(|_| Ok(true));

        assert!(service(repo).delete(1, 5).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_unknown_link() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_delete().times(0);

        assert!(service(repo).delete(1, 5).await.unwrap_err().is_not_found());
    }
}
