//! Repository trait for link storage.

use crate::domain::entities::{Link, LinkPatch, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for short links.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryLinkRepository`] - in-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Creates a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code already exists.
    /// Returns [`AppError::Internal`] on storage errors.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by exact short code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Finds a link by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError>;

    /// Lists every link of an owner, newest first.
    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Link>, AppError>;

    /// Adds one to the click counter as a single atomic storage operation.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link no longer exists.
    async fn increment_clicks(&self, id: i64) -> Result<(), AppError>;

    /// Applies a partial update and refreshes `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link does not exist.
    async fn update(&self, id: i64, patch: LinkPatch) -> Result<Link, AppError>;

    /// Deletes a link together with all of its visits.
    ///
    /// Returns `Ok(false)` if there was nothing to delete.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}
