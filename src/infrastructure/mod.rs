//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence, caching and the external
//! collaborators of the visit recorder.
//!
//! # Modules
//!
//! - [`cache`] - Resolved-link cache (Redis and no-op implementations)
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`memory`] - In-memory repository implementations
//! - [`upload`] - Photo object storage client
//! - [`geo`] - Geo-IP lookup client

pub mod cache;
pub mod geo;
pub mod memory;
pub mod persistence;
pub mod upload;
