//! Geo-IP lookup against an external HTTP API.
//!
//! `GEOIP_API_URL` is a template with an `{ip}` placeholder, for example
//! `http://ip-api.com/json/{ip}?fields=status,countryCode,regionName,city,lat,lon,isp`.
//! Answered lookups are cached per IP, including "unknown" answers, so a burst
//! of visits from one address triggers a single request. Transport and decoding
//! failures are not cached.

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{trace, warn};

use crate::domain::entities::GeoDescriptor;

const GEO_CACHE_TTL_SECS: u64 = 15 * 60;
const GEO_CACHE_MAX_CAPACITY: u64 = 10_000;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Returns the geography of `ip`, or `None` when it is unknown.
    async fn lookup(&self, ip: &str) -> Option<GeoDescriptor>;
}

/// Geo lookup used when `GEOIP_API_URL` is unset.
pub struct NoopGeoLookup;

#[async_trait]
impl GeoLookup for NoopGeoLookup {
    async fn lookup(&self, _ip: &str) -> Option<GeoDescriptor> {
        None
    }
}

pub struct ExternalGeoLookup {
    url_template: String,
    client: Client,
    cache: Cache<String, Option<GeoDescriptor>>,
}

impl ExternalGeoLookup {
    pub fn new(url_template: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("link-tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(GEO_CACHE_TTL_SECS))
            .max_capacity(GEO_CACHE_MAX_CAPACITY)
            .build();

        Ok(Self {
            url_template: url_template.to_string(),
            client,
            cache,
        })
    }

    async fn fetch(&self, ip: &str) -> Result<Option<GeoDescriptor>, reqwest::Error> {
        let url = self.url_template.replace("{ip}", ip);
        let body = self.client.get(&url).send().await?.json::<Value>().await?;

        Ok(parse_geo_response(&body))
    }
}

#[async_trait]
impl GeoLookup for ExternalGeoLookup {
    async fn lookup(&self, ip: &str) -> Option<GeoDescriptor> {
        if !is_public_ip(ip) {
            trace!(ip, "Skipping geo lookup for non-public address");
            return None;
        }

        match self
            .cache
            .try_get_with(ip.to_string(), self.fetch(ip))
            .await
        {
            Ok(geo) => geo,
            Err(e) => {
                warn!(ip, error = %e, "Geo lookup failed");
                None
            }
        }
    }
}

/// Loopback, private, link-local and unparsable addresses have no geography.
fn is_public_ip(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        Ok(IpAddr::V6(v6)) => {
            let unique_local = (v6.segments()[0] & 0xfe00) == 0xfc00;
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
        Err(_) => false,
    }
}

/// Reads the common field spellings of ip-api.com style responses.
fn parse_geo_response(body: &Value) -> Option<GeoDescriptor> {
    if body["status"].as_str() == Some("fail") {
        return None;
    }

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| body[*k].as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    let number = |keys: &[&str]| keys.iter().find_map(|k| body[*k].as_f64());

    let geo = GeoDescriptor {
        country: text(&["countryCode", "country_code", "country"]),
        city: text(&["city"]),
        region: text(&["regionName", "region"]),
        latitude: number(&["lat", "latitude"]),
        longitude: number(&["lon", "lng", "longitude"]),
        isp: text(&["isp", "org"]),
    };

    (geo != GeoDescriptor::default()).then_some(geo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ip_api_response() {
        let body = json!({
            "status": "success",
            "countryCode": "DE",
            "regionName": "Berlin",
            "city": "Berlin",
            "lat": 52.52,
            "lon": 13.40,
            "isp": "Example ISP"
        });

        let geo = parse_geo_response(&body).unwrap();
        assert_eq!(geo.country.as_deref(), Some("DE"));
        assert_eq!(geo.region.as_deref(), Some("Berlin"));
        assert_eq!(geo.latitude, Some(52.52));
        assert_eq!(geo.isp.as_deref(), Some("Example ISP"));
    }

    #[test]
    fn test_parse_failure_status() {
        assert!(parse_geo_response(&json!({ "status": "fail", "message": "private range" })).is_none());
        assert!(parse_geo_response(&json!({})).is_none());
    }

    #[test]
    fn test_public_ip_filter() {
        assert!(is_public_ip("8.8.8.8"));
        assert!(is_public_ip("2001:4860:4860::8888"));
        assert!(!is_public_ip("10.0.0.1"));
        assert!(!is_public_ip("127.0.0.1"));
        assert!(!is_public_ip("::1"));
        assert!(!is_public_ip("fd00::1"));
        assert!(!is_public_ip(""));
    }

    #[tokio::test]
    async fn test_private_address_never_queried() {
        // Unroutable template; any request would fail and be logged.
        let lookup =
            ExternalGeoLookup::new("http://192.0.2.1/{ip}", Duration::from_millis(50)).unwrap();
        assert!(lookup.lookup("192.168.1.10").await.is_none());
    }

    #[tokio::test]
    async fn test_failed_request_is_not_cached() {
        // Nothing listens on port 1, so the request fails to connect.
        let lookup =
            ExternalGeoLookup::new("http://127.0.0.1:1/{ip}", Duration::from_millis(500)).unwrap();

        assert!(lookup.lookup("8.8.8.8").await.is_none());
        assert!(!lookup.cache.contains_key("8.8.8.8"));
    }
}
