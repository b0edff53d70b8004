//! DTOs for link management endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::CreateLink;
use crate::domain::entities::{Link, LinkPatch};

/// Request body for `POST /api/links`.
///
/// Field names are accepted in snake_case or camelCase.
///
/// ```json
/// {
///   "originalUrl": "example.com",
///   "domain": "x.test",
///   "shortCode": "abc",
///   "cameraEnabled": false,
///   "locationEnabled": true
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    #[serde(alias = "originalUrl")]
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub original_url: String,

    #[validate(length(max = 255, message = "Domain must be at most 255 characters"))]
    pub domain: Option<String>,

    #[serde(alias = "shortCode")]
    pub short_code: Option<String>,

    #[serde(default, alias = "cameraEnabled")]
    pub camera_enabled: bool,

    #[serde(default, alias = "locationEnabled")]
    pub location_enabled: bool,
}

impl From<CreateLinkRequest> for CreateLink {
    fn from(req: CreateLinkRequest) -> Self {
        Self {
            original_url: req.original_url,
            domain: req.domain,
            short_code: req.short_code,
            camera_enabled: req.camera_enabled,
            location_enabled: req.location_enabled,
        }
    }
}

/// Request body for `PATCH /api/links/{id}`.
///
/// All fields are optional. Only provided fields are changed.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    #[serde(default, alias = "originalUrl")]
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub original_url: Option<String>,

    #[serde(default, alias = "cameraEnabled")]
    pub camera_enabled: Option<bool>,

    #[serde(default, alias = "locationEnabled")]
    pub location_enabled: Option<bool>,

    #[serde(default, alias = "isActive")]
    pub is_active: Option<bool>,
}

impl From<UpdateLinkRequest> for LinkPatch {
    fn from(req: UpdateLinkRequest) -> Self {
        Self {
            destination: req.original_url,
            camera_enabled: req.camera_enabled,
            location_enabled: req.location_enabled,
            is_active: req.is_active,
        }
    }
}

/// JSON representation of a link.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub id: i64,
    pub code: String,
    pub original_url: String,
    pub domain: Option<String>,
    pub camera_enabled: bool,
    pub location_enabled: bool,
    pub is_active: bool,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Link> for LinkResponse {
    fn from(link: Link) -> Self {
        Self {
            id: link.id,
            code: link.code,
            original_url: link.destination,
            domain: link.domain,
            camera_enabled: link.camera_enabled,
            location_enabled: link.location_enabled,
            is_active: link.is_active,
            click_count: link.click_count,
            created_at: link.created_at,
            updated_at: link.updated_at,
        }
    }
}
