//! In-memory repository implementations.
//!
//! Selected with `STORAGE_BACKEND=memory`. All three repositories share one
//! [`MemoryStore`], so deleting a link cascades to its visits exactly like the
//! foreign key does in PostgreSQL. Data lives for the lifetime of the process.

mod link_repository;
mod token_repository;
mod visit_repository;

use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::entities::{Link, Visit};
use crate::domain::repositories::ApiToken;

pub use link_repository::MemoryLinkRepository;
pub use token_repository::MemoryTokenRepository;
pub use visit_repository::MemoryVisitRepository;

/// Shared tables for the in-memory backend.
#[derive(Debug)]
pub struct MemoryStore {
    pub(crate) links: DashMap<i64, Link>,
    /// Short code → link id. Its entry lock serializes creation per code.
    pub(crate) codes: DashMap<String, i64>,
    pub(crate) visits: DashMap<i64, Visit>,
    pub(crate) tokens: DashMap<i64, ApiToken>,
    next_link_id: AtomicI64,
    next_visit_id: AtomicI64,
    next_token_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
            codes: DashMap::new(),
            visits: DashMap::new(),
            tokens: DashMap::new(),
            next_link_id: AtomicI64::new(1),
            next_visit_id: AtomicI64::new(1),
            next_token_id: AtomicI64::new(1),
        }
    }

    pub(crate) fn next_link_id(&self) -> i64 {
        self.next_link_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_visit_id(&self) -> i64 {
        self.next_visit_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_token_id(&self) -> i64 {
        self.next_token_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of stored visits across all links.
    pub fn visit_count(&self) -> usize {
        self.visits.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
