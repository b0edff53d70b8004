//! Link entity representing a short code and its destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short link owned by a principal.
///
/// `destination` is stored exactly as submitted; it is normalized to an
/// absolute URL when the link is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub code: String,
    pub destination: String,
    pub domain: Option<String>,
    pub owner_id: i64,
    pub camera_enabled: bool,
    pub location_enabled: bool,
    pub click_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// Returns true if the link belongs to `owner_id`.
    pub fn is_owned_by(&self, owner_id: i64) -> bool {
        self.owner_id == owner_id
    }
}

/// Input data for creating a new link.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub code: String,
    pub destination: String,
    pub domain: Option<String>,
    pub owner_id: i64,
    pub camera_enabled: bool,
    pub location_enabled: bool,
}

/// Partial update for an existing link. `None` fields are left unchanged.
///
/// The click counter is deliberately absent: only the recorder mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPatch {
    pub destination: Option<String>,
    pub camera_enabled: Option<bool>,
    pub location_enabled: Option<bool>,
    pub is_active: Option<bool>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        self.destination.is_none()
            && self.camera_enabled.is_none()
            && self.location_enabled.is_none()
            && self.is_active.is_none()
    }

    /// Applies the patch in place and refreshes `updated_at`.
    pub fn apply(&self, link: &mut Link) {
        if let Some(ref destination) = self.destination {
            link.destination = destination.clone();
        }
        if let Some(camera) = self.camera_enabled {
            link.camera_enabled = camera;
        }
        if let Some(location) = self.location_enabled {
            link.location_enabled = location;
        }
        if let Some(active) = self.is_active {
            link.is_active = active;
        }
        link.updated_at = Utc::now();
    }
}
