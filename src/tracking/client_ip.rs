//! Client address resolution from proxy headers and the socket peer.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Resolves `(public_ip, internal_ip)` for a request.
///
/// Public IP priority:
/// 1. first valid address in `X-Forwarded-For`
/// 2. first `for=` address in RFC 7239 `Forwarded`
/// 3. `X-Real-IP`
/// 4. the socket peer address
///
/// The public IP is an empty string when none of these yields an address.
/// The internal IP is always the socket peer, kept separate for debugging
/// requests that arrive through private networks.
pub fn resolve_client_ips(headers: &HeaderMap, peer: Option<SocketAddr>) -> (String, Option<String>) {
    let internal = peer.map(|addr| addr.ip());

    let public = from_x_forwarded_for(headers)
        .or_else(|| from_forwarded(headers))
        .or_else(|| from_x_real_ip(headers))
        .or(internal);

    (
        public.map(|ip| ip.to_string()).unwrap_or_default(),
        internal.map(|ip| ip.to_string()),
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, "x-forwarded-for")?
        .split(',')
        .find_map(parse_ip_token)
}

fn from_forwarded(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = header_str(headers, "forwarded")?;

    // Forwarded: for=192.0.2.60;proto=http, for="[2001:db8::1]:4711"
    forwarded
        .split(',')
        .flat_map(|element| element.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            key.eq_ignore_ascii_case("for").then_some(value)
        })
        .find_map(parse_ip_token)
}

fn from_x_real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, "x-real-ip").and_then(parse_ip_token)
}

/// Parses a header token that may carry quotes, brackets or a port.
fn parse_ip_token(token: &str) -> Option<IpAddr> {
    let token = token.trim().trim_matches('"');
    if token.is_empty() {
        return None;
    }

    if let Ok(ip) = token.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(addr) = token.parse::<SocketAddr>() {
        return Some(addr.ip());
    }

    // "[2001:db8::1]" without a port
    token
        .strip_prefix('[')
        .and_then(|rest| rest.split(']').next())
        .and_then(|inner| inner.parse().ok())
}
