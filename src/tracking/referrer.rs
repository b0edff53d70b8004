//! Referrer classification.

use url::Url;

use crate::domain::entities::{ReferrerInfo, ReferrerType};

/// Social networks, matched on the host or any of its subdomains.
const SOCIAL_DOMAINS: &[&str] = &[
    "facebook.com",
    "fb.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "t.co",
    "linkedin.com",
    "lnkd.in",
    "reddit.com",
    "pinterest.com",
    "tiktok.com",
    "youtube.com",
    "youtu.be",
    "snapchat.com",
    "tumblr.com",
    "threads.net",
    "mastodon.social",
    "bsky.app",
    "vk.com",
    "t.me",
    "telegram.org",
    "whatsapp.com",
    "discord.com",
];

/// Webmail front-ends, matched like social domains.
const EMAIL_DOMAINS: &[&str] = &[
    "mail.google.com",
    "outlook.live.com",
    "outlook.office.com",
    "outlook.office365.com",
    "mail.yahoo.com",
    "mail.proton.me",
    "mail.aol.com",
    "mail.yandex.ru",
];

/// Search engines, matched as a substring of the host so that every
/// country domain (`google.de`, `www.google.co.uk`) is covered.
const SEARCH_PREFIXES: &[&str] = &[
    "google.",
    "bing.",
    "yahoo.",
    "duckduckgo.",
    "baidu.",
    "yandex.",
    "ecosia.",
    "search.brave.",
    "startpage.",
    "qwant.",
];

/// Classifies the raw `Referer` header.
///
/// - absent or blank → `direct`
/// - not a URL, or a URL without a host → `other` (raw value kept, no domain)
/// - webmail → `email`, social → `social`, search engine → `organic`
/// - any other host → `referral`
pub fn classify_referrer(referer: Option<&str>) -> ReferrerInfo {
    let Some(raw) = referer.map(str::trim).filter(|r| !r.is_empty()) else {
        return ReferrerInfo::default();
    };

    let host = Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()))
        .filter(|h| !h.is_empty());

    let Some(host) = host else {
        return ReferrerInfo {
            referrer_type: ReferrerType::Other,
            domain: None,
            url: Some(raw.to_string()),
        };
    };

    let referrer_type = if matches_domain(&host, EMAIL_DOMAINS) {
        ReferrerType::Email
    } else if matches_domain(&host, SOCIAL_DOMAINS) {
        ReferrerType::Social
    } else if SEARCH_PREFIXES.iter().any(|prefix| host.contains(prefix)) {
        ReferrerType::Organic
    } else {
        ReferrerType::Referral
    };

    ReferrerInfo {
        referrer_type,
        domain: Some(host),
        url: Some(raw.to_string()),
    }
}

fn matches_domain(host: &str, domains: &[&str]) -> bool {
    domains.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|rest| rest.ends_with('.'))
    })
}
