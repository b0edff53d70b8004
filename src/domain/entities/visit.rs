//! Visit entity: one persisted record of a tracked request to a short code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{
    DefaultOnError, DisplayFromStr, PickFirst, TimestampMilliSeconds, formats::Flexible, serde_as,
};
use std::fmt;
use std::str::FromStr;

/// Device class derived from the user agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Desktop,
    Mobile,
    Tablet,
    Bot,
    Other,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Bot => "bot",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(Self::Desktop),
            "mobile" => Ok(Self::Mobile),
            "tablet" => Ok(Self::Tablet),
            "bot" => Ok(Self::Bot),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown device type '{}'", s)),
        }
    }
}

/// Traffic source class derived from the `Referer` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferrerType {
    #[default]
    Direct,
    Organic,
    Referral,
    Social,
    Email,
    Other,
}

impl ReferrerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Organic => "organic",
            Self::Referral => "referral",
            Self::Social => "social",
            Self::Email => "email",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ReferrerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferrerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "organic" => Ok(Self::Organic),
            "referral" => Ok(Self::Referral),
            "social" => Ok(Self::Social),
            "email" => Ok(Self::Email),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown referrer type '{}'", s)),
        }
    }
}

/// Parsed user-agent description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub os: Option<String>,
    pub browser: Option<String>,
    pub model: Option<String>,
    pub is_mobile: bool,
    pub is_bot: bool,
}

/// Classified `Referer` header. `url` keeps the raw header value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferrerInfo {
    pub referrer_type: ReferrerType,
    pub domain: Option<String>,
    pub url: Option<String>,
}

/// Geography returned by the external lookup service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoDescriptor {
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub isp: Option<String>,
}

/// Client-reported location reading.
///
/// Fields are taken as sent: numbers or numeric strings are accepted, anything
/// else in a field becomes `None` without rejecting the rest of the reading.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub accuracy: Option<f64>,

    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub altitude: Option<f64>,

    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub heading: Option<f64>,

    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    #[serde(default)]
    pub speed: Option<f64>,

    /// RFC 3339 string or epoch milliseconds.
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, TimestampMilliSeconds<i64, Flexible>)>>>")]
    #[serde(default, alias = "timestamp")]
    pub captured_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub source: Option<String>,
}

/// A persisted visit. Never updated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub link_id: i64,
    /// May be empty when no client address could be determined.
    pub public_ip: String,
    pub internal_ip: Option<String>,
    pub session_id: String,
    pub device: DeviceInfo,
    pub referrer: ReferrerInfo,
    pub headers: Value,
    pub geo: Option<GeoDescriptor>,
    pub photo_url: Option<String>,
    pub has_photo: bool,
    pub location: Option<LocationReading>,
    pub has_location: bool,
    pub created_at: DateTime<Utc>,
}

/// Input data for persisting a visit.
///
/// The `has_photo` / `has_location` flags are not stored here: they are derived
/// from the optional captures so they cannot disagree with them.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub link_id: i64,
    pub public_ip: String,
    pub internal_ip: Option<String>,
    pub session_id: String,
    pub device: DeviceInfo,
    pub referrer: ReferrerInfo,
    pub headers: Value,
    pub geo: Option<GeoDescriptor>,
    pub photo_url: Option<String>,
    pub location: Option<LocationReading>,
}

impl NewVisit {
    pub fn has_photo(&self) -> bool {
        self.photo_url.is_some()
    }

    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }

    /// Location reading with a missing capture time filled in with `persisted_at`.
    pub fn location_at(&self, persisted_at: DateTime<Utc>) -> Option<LocationReading> {
        self.location.clone().map(|mut reading| {
            reading.captured_at.get_or_insert(persisted_at);
            reading
        })
    }

    /// Builds the stored visit, stamping it with the persistence time.
    pub fn into_visit(self, id: i64, persisted_at: DateTime<Utc>) -> Visit {
        let location = self.location_at(persisted_at);

        Visit {
            id,
            link_id: self.link_id,
            has_photo: self.photo_url.is_some(),
            has_location: location.is_some(),
            public_ip: self.public_ip,
            internal_ip: self.internal_ip,
            session_id: self.session_id,
            device: self.device,
            referrer: self.referrer,
            headers: self.headers,
            geo: self.geo,
            photo_url: self.photo_url,
            location,
            created_at: persisted_at,
        }
    }
}
