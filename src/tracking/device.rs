//! User-agent classification.

use regex::Regex;
use std::sync::LazyLock;
use woothee::parser::Parser;

use crate::domain::entities::{DeviceInfo, DeviceType};

/// Substrings that mark a user agent as automated, checked case-insensitively.
const BOT_MARKERS: &[&str] = &["bot", "crawl", "spider"];

/// Android UAs carry the model right before ` Build/`.
static ANDROID_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";\s*([^;()]+?)\s+Build/").expect("valid regex"));

/// Classifies a user agent into a [`DeviceInfo`].
///
/// Unknown or missing user agents produce a `desktop` device. `is_bot` is
/// decided by [`is_bot_user_agent`], never by the parser category alone.
pub fn classify_device(user_agent: Option<&str>) -> DeviceInfo {
    let ua = user_agent.map(str::trim).unwrap_or_default();
    let is_bot = is_bot_user_agent(ua);

    if ua.is_empty() {
        return DeviceInfo {
            is_bot,
            ..DeviceInfo::default()
        };
    }

    let parsed = Parser::new().parse(ua).unwrap_or_default();
    let lower = ua.to_ascii_lowercase();

    let device_type = match parsed.category {
        "pc" => DeviceType::Desktop,
        "smartphone" | "mobilephone" if looks_like_tablet(&lower) => DeviceType::Tablet,
        "smartphone" | "mobilephone" => DeviceType::Mobile,
        "crawler" => DeviceType::Bot,
        "appliance" | "misc" => DeviceType::Other,
        _ if looks_like_tablet(&lower) => DeviceType::Tablet,
        _ => DeviceType::Desktop,
    };

    DeviceInfo {
        device_type,
        os: known(parsed.os),
        browser: known(parsed.name),
        model: device_model(ua, parsed.vendor),
        is_mobile: matches!(device_type, DeviceType::Mobile | DeviceType::Tablet),
        is_bot,
    }
}

/// Returns true if the user agent contains a bot marker in any case.
pub fn is_bot_user_agent(user_agent: &str) -> bool {
    let lower = user_agent.to_ascii_lowercase();
    BOT_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn looks_like_tablet(lower: &str) -> bool {
    lower.contains("ipad")
        || lower.contains("tablet")
        || (lower.contains("android") && !lower.contains("mobile"))
}

fn known(value: &str) -> Option<String> {
    (!value.is_empty() && value != "UNKNOWN").then(|| value.to_string())
}

fn device_model(ua: &str, vendor: &str) -> Option<String> {
    if let Some(model) = ANDROID_MODEL
        .captures(ua)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|m| !m.is_empty())
    {
        return Some(model.to_string());
    }

    if ua.contains("iPad") {
        return Some("iPad".to_string());
    }
    if ua.contains("iPhone") {
        return Some("iPhone".to_string());
    }

    known(vendor)
}
