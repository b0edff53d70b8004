//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod links;
pub mod redirect;
pub mod stats;

pub use health::health_handler;
pub use links::{create_link_handler, delete_link_handler, list_links_handler, update_link_handler};
pub use redirect::{destination_handler, redirect_handler, track_handler};
pub use stats::{recent_visits_handler, summary_handler, visit_log_handler};
