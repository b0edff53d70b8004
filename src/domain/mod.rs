//! Domain layer containing business entities and logic.
//!
//! It defines entities, repository interfaces and the visit pipeline types,
//! independent of storage backends and HTTP.
//!
//! # Architecture
//!
//! - [`entities`] - Links and visits
//! - [`repositories`] - Data access trait definitions
//! - [`tracking_context`] - Typed request metadata consumed by the recorder
//! - [`visit_worker`] - Queue and worker that record visits off the hot path
//!
//! # Visit Processing Flow
//!
//! 1. HTTP handler resolves the short code and builds a [`tracking_context::TrackingContext`]
//! 2. A `VisitJob` is handed to [`visit_worker::VisitDispatcher`] (non-blocking)
//! 3. [`visit_worker::run_visit_worker`] runs the recorder for each job
//! 4. The visit row and the click increment are written via the repositories

pub mod entities;
pub mod repositories;
pub mod tracking_context;
pub mod visit_worker;
