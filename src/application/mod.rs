//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! validation, and business rules. Services consume repository traits and provide
//! a clean API for HTTP handlers.
//!
//! # Available Services
//!
//! - [`services::resolver::ShortCodeResolver`] - Short code to destination resolution
//! - [`services::recorder::VisitRecorder`] - Visit capture and click counting
//! - [`services::redirect_service::RedirectService`] - Visitor-facing orchestration
//! - [`services::stats_service::StatsService`] - Owner-scoped analytics
//! - [`services::link_service::LinkService`] - Link lifecycle
//! - [`services::auth_service::AuthService`] - API token authentication

pub mod services;
