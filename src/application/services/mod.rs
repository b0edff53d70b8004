//! Business logic services for the application layer.

pub mod auth_service;
pub mod link_service;
pub mod recorder;
pub mod redirect_service;
pub mod resolver;
pub mod stats_service;

pub use auth_service::{AuthService, Principal, hash_token};
pub use link_service::{CreateLink, LinkService};
pub use recorder::{CapturePayload, RecorderConfig, VisitJob, VisitRecorder};
pub use redirect_service::{DestinationInfo, RedirectOutcome, RedirectService, TrackAck};
pub use resolver::{RedirectStrategy, ResolvedLink, ShortCodeResolver};
pub use stats_service::{StatsService, StatsSummary, VisitPage};
