//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx runtime
//! queries against the schema in `migrations/`.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link storage, lookup and atomic click counting
//! - [`PgVisitRepository`] - Visit records and analytics aggregates
//! - [`PgTokenRepository`] - API token storage and validation

pub mod pg_link_repository;
pub mod pg_token_repository;
pub mod pg_visit_repository;

pub use pg_link_repository::PgLinkRepository;
pub use pg_token_repository::PgTokenRepository;
pub use pg_visit_repository::PgVisitRepository;
