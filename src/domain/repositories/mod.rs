//! Repository trait definitions for the domain layer.
//!
//! Traits define the storage contract; implementations live in
//! `crate::infrastructure::persistence` (PostgreSQL) and
//! `crate::infrastructure::memory` (in-process). Mock implementations are
//! generated via `mockall` for unit tests.
//!
//! - [`LinkRepository`] - Links and the atomic click counter
//! - [`VisitRepository`] - Visit records and aggregate queries
//! - [`TokenRepository`] - API token authentication

pub mod link_repository;
pub mod token_repository;
pub mod visit_repository;

pub use link_repository::LinkRepository;
pub use token_repository::{ApiToken, TokenRepository};
pub use visit_repository::{DailyCount, GroupCount, VisitField, VisitRepository, sort_groups};

#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use token_repository::MockTokenRepository;
#[cfg(test)]
pub use visit_repository::MockVisitRepository;
