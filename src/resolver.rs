/* src/resolver.rs */

use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{debug, trace};

use crate::reserved::is_private_address;

/// Type alias for header maps. Can be any map-like structure with string keys and values.
pub type HeaderMap = HashMap<String, String>;

/// Lowercase name of the `X-Real-IP` header.
pub const X_REAL_IP: &str = "x-real-ip";
/// Lowercase name of the `X-Forwarded-For` header.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
/// Lowercase name of the RFC 7239 `Forwarded` header.
pub const FORWARDED: &str = "forwarded";

/// The forwarding headers of one request, as seen by the [`Resolver`].
///
/// An absent header and an empty one are treated alike, except for
/// `x_forwarded_for` where only the number of occurrences counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSnapshot {
    /// Value of `X-Real-IP`.
    pub x_real_ip: String,
    /// Every occurrence of `X-Forwarded-For`, in the order received.
    pub x_forwarded_for: Vec<String>,
    /// Value of the RFC 7239 `Forwarded` header.
    pub forwarded: String,
}

impl HeaderSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `X-Real-IP` value.
    pub fn with_x_real_ip(mut self, value: impl Into<String>) -> Self {
        self.x_real_ip = value.into();
        self
    }

    /// Append one `X-Forwarded-For` occurrence.
    pub fn with_x_forwarded_for(mut self, value: impl Into<String>) -> Self {
        self.x_forwarded_for.push(value.into());
        self
    }

    /// Set the `Forwarded` value.
    pub fn with_forwarded(mut self, value: impl Into<String>) -> Self {
        self.forwarded = value.into();
        self
    }

    /// Build a snapshot from a plain header map, matching names case-insensitively.
    ///
    /// A map holds one value per name, so a present `X-Forwarded-For` entry
    /// becomes a single occurrence.
    pub fn from_map(headers: &HeaderMap) -> Self {
        let lookup = |name: &str| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        };

        Self {
            x_real_ip: lookup(X_REAL_IP).unwrap_or_default(),
            x_forwarded_for: lookup(X_FORWARDED_FOR).into_iter().collect(),
            forwarded: lookup(FORWARDED).unwrap_or_default(),
        }
    }

    /// True when no proxy metadata is present at all.
    pub fn is_empty(&self) -> bool {
        self.x_real_ip.is_empty() && self.x_forwarded_for.is_empty() && self.forwarded.is_empty()
    }
}

#[cfg(feature = "axum")]
impl From<&axum::http::HeaderMap> for HeaderSnapshot {
    fn from(headers: &axum::http::HeaderMap) -> Self {
        let decode = |value: &axum::http::HeaderValue| {
            String::from_utf8_lossy(value.as_bytes()).into_owned()
        };
        let first = |name: &str| headers.get(name).map(decode).unwrap_or_default();

        Self {
            x_real_ip: first(X_REAL_IP),
            x_forwarded_for: headers
                .get_all(X_FORWARDED_FOR)
                .iter()
                .map(decode)
                .collect(),
            forwarded: first(FORWARDED),
        }
    }
}

/// How the `for` parameter of a `Forwarded` element is recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForwardedKeyMatch {
    /// Any parameter whose text contains `for`, value included.
    #[default]
    Contains,
    /// Only parameters whose name is exactly `for`, ignoring case and whitespace.
    Exact,
}

/// Configuration for client address resolution.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    /// How the `Forwarded` header's `for` parameter is matched.
    pub forwarded_key_match: ForwardedKeyMatch,
}

impl Resolver {
    /// Create a resolver with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how the `for` parameter of the `Forwarded` header is matched.
    pub fn forwarded_key_match(mut self, mode: ForwardedKeyMatch) -> Self {
        self.forwarded_key_match = mode;
        self
    }

    /// Resolve the client address of a request.
    ///
    /// Without any forwarding header, this is `remote_addr` minus its port.
    /// Otherwise the first public address of `X-Forwarded-For` wins, then the
    /// first public `for=` of `Forwarded`, and finally `X-Real-IP` verbatim,
    /// which may be empty.
    pub fn resolve(&self, remote_addr: &str, headers: &HeaderSnapshot) -> String {
        if headers.is_empty() {
            let ip = strip_port(remote_addr);
            debug!(source = "remote_addr", ip, "resolved client address");
            return ip.to_string();
        }

        if let Some(ip) = self.from_forwarded_for(headers) {
            debug!(source = X_FORWARDED_FOR, ip, "resolved client address");
            return ip.to_string();
        }

        if let Some(ip) = self.from_forwarded(headers) {
            debug!(source = FORWARDED, ip, "resolved client address");
            return ip.to_string();
        }

        debug!(source = X_REAL_IP, ip = %headers.x_real_ip, "resolved client address");
        headers.x_real_ip.clone()
    }

    /// First public address across every `X-Forwarded-For` occurrence.
    fn from_forwarded_for<'a>(&self, headers: &'a HeaderSnapshot) -> Option<&'a str> {
        headers
            .x_forwarded_for
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .find(|candidate| is_public(candidate))
    }

    /// First public `for=` address of the `Forwarded` header.
    fn from_forwarded<'a>(&self, headers: &'a HeaderSnapshot) -> Option<&'a str> {
        headers
            .forwarded
            .split(';')
            .flat_map(|group| group.split(','))
            .filter_map(|pair| self.forwarded_for_value(pair))
            .find(|candidate| is_public(candidate))
    }

    /// Extract the unquoted, unbracketed value of a `for=` pair.
    fn forwarded_for_value<'a>(&self, pair: &'a str) -> Option<&'a str> {
        let matches_key = |key: &str| match self.forwarded_key_match {
            ForwardedKeyMatch::Contains => pair.contains("for"),
            ForwardedKeyMatch::Exact => key.trim().eq_ignore_ascii_case("for"),
        };

        let mut parts = pair.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) if matches_key(key) => Some(
                value
                    .trim()
                    .trim_start_matches(['"', '['])
                    .trim_end_matches([']', '"']),
            ),
            (Some(_), _, _) if matches_key(pair) => {
                trace!(pair, "skipping malformed forwarded parameter");
                None
            }
            _ => None,
        }
    }
}

/// True when `candidate` parses and is outside every reserved block.
fn is_public(candidate: &str) -> bool {
    match is_private_address(candidate) {
        Ok(false) => true,
        Ok(true) => {
            trace!(candidate, "skipping reserved address");
            false
        }
        Err(err) => {
            trace!(candidate, %err, "skipping unparseable address");
            false
        }
    }
}

/// Remove a trailing `:port` from a transport address.
///
/// `[host]:port` and `[host]` yield `host`, and a bare IP literal, including
/// an unbracketed IPv6 address, is returned unchanged. An opening bracket
/// without a closing one is returned unchanged too. Anything else is split on
/// its last colon.
pub fn strip_port(remote_addr: &str) -> &str {
    if let Some(rest) = remote_addr.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, _)) => host,
            None => remote_addr,
        };
    }

    if remote_addr.parse::<IpAddr>().is_ok() {
        return remote_addr;
    }

    match remote_addr.rsplit_once(':') {
        Some((host, _)) => host,
        None => remote_addr,
    }
}

/// Resolve the client address with the default [`Resolver`].
///
/// # Arguments
///
/// * `remote_addr` - Transport peer address, `host` or `host:port`
/// * `headers` - Forwarding headers of the request
///
/// # Examples
///
/// ```rust
/// use realip::{HeaderSnapshot, resolve};
///
/// let headers = HeaderSnapshot::new().with_x_forwarded_for("127.0.0.1, 144.12.54.87");
/// assert_eq!(resolve("10.0.0.2:41234", &headers), "144.12.54.87");
///
/// assert_eq!(resolve("13.182.55.11:8080", &HeaderSnapshot::new()), "13.182.55.11");
/// ```
pub fn resolve(remote_addr: &str, headers: &HeaderSnapshot) -> String {
    Resolver::default().resolve(remote_addr, headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_ADDR_1: &str = "144.12.54.87";
    const PUBLIC_ADDR_2: &str = "119.14.55.11";
    const LOCAL_ADDR: &str = "127.0.0.0";

    fn forwarded_for(values: &[&str]) -> HeaderSnapshot {
        values
            .iter()
            .fold(HeaderSnapshot::new(), |headers, value| headers.with_x_forwarded_for(*value))
    }

    #[test]
    fn test_no_header_strips_port() {
        assert_eq!(resolve("13.182.55.11:8080", &HeaderSnapshot::new()), "13.182.55.11");
    }

    #[test]
    fn test_no_header_without_port() {
        assert_eq!(resolve(PUBLIC_ADDR_1, &HeaderSnapshot::new()), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_no_header_and_no_remote_addr() {
        assert_eq!(resolve("", &HeaderSnapshot::new()), "");
    }

    #[test]
    fn test_x_forwarded_for() {
        assert_eq!(resolve("", &forwarded_for(&[PUBLIC_ADDR_1])), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_x_forwarded_for_comma_separated() {
        let headers = forwarded_for(&[&format!("{LOCAL_ADDR},{PUBLIC_ADDR_1}")]);
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_x_forwarded_for_comma_and_space() {
        let headers = forwarded_for(&[&format!("{LOCAL_ADDR}, {PUBLIC_ADDR_1}")]);
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_multiple_x_forwarded_for() {
        let headers = forwarded_for(&[LOCAL_ADDR, PUBLIC_ADDR_1, PUBLIC_ADDR_2]);
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_multiple_x_forwarded_for_with_lists() {
        let headers = forwarded_for(&[LOCAL_ADDR, &format!("{PUBLIC_ADDR_1},{PUBLIC_ADDR_2}")]);
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_x_forwarded_for_skips_garbage() {
        let headers = forwarded_for(&["", "unknown, 10.1.2.3", &format!(" {PUBLIC_ADDR_2} ")]);
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_2);
    }

    #[test]
    fn test_x_forwarded_for_wins_over_others() {
        let headers = forwarded_for(&[PUBLIC_ADDR_1])
            .with_forwarded(format!("for={PUBLIC_ADDR_2}"))
            .with_x_real_ip("203.0.113.7");
        assert_eq!(resolve("13.182.55.11:8080", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_forwarded() {
        let headers = HeaderSnapshot::new().with_forwarded(format!("for={PUBLIC_ADDR_1}"));
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_forwarded_comma_separated() {
        let headers =
            HeaderSnapshot::new().with_forwarded(format!("for={LOCAL_ADDR},for={PUBLIC_ADDR_1}"));
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_forwarded_comma_and_space() {
        let headers =
            HeaderSnapshot::new().with_forwarded(format!("for={LOCAL_ADDR}, for={PUBLIC_ADDR_2}"));
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_2);
    }

    #[test]
    fn test_forwarded_quoted_and_bracketed() {
        let headers = HeaderSnapshot::new()
            .with_forwarded(r#"for="[::1]";proto=https, for="[2001:db8:cafe::17]""#);
        assert_eq!(resolve("", &headers), "2001:db8:cafe::17");
    }

    #[test]
    fn test_forwarded_with_other_parameters() {
        let headers = HeaderSnapshot::new()
            .with_forwarded(format!("by=10.0.0.1;for={PUBLIC_ADDR_1};proto=https"));
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_forwarded_malformed_pair_is_skipped() {
        let headers = HeaderSnapshot::new()
            .with_forwarded(format!("for=a=b, for, for={PUBLIC_ADDR_2}"));
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_2);
    }

    #[test]
    fn test_forwarded_after_private_x_forwarded_for() {
        let headers = forwarded_for(&["10.0.0.1, 192.168.1.1"])
            .with_forwarded(format!("for={PUBLIC_ADDR_2}"));
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_2);
    }

    #[test]
    fn test_forwarded_key_contains_vs_exact() {
        let headers =
            HeaderSnapshot::new().with_forwarded(format!("x-forwarded-for={PUBLIC_ADDR_1}"));

        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);

        let exact = Resolver::new().forwarded_key_match(ForwardedKeyMatch::Exact);
        assert_eq!(exact.resolve("", &headers), "");
    }

    #[test]
    fn test_forwarded_exact_key_is_case_insensitive() {
        let headers = HeaderSnapshot::new().with_forwarded(format!(" For={PUBLIC_ADDR_1}"));
        let exact = Resolver::new().forwarded_key_match(ForwardedKeyMatch::Exact);
        assert_eq!(exact.resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_x_real_ip_fallback() {
        let headers = HeaderSnapshot::new().with_x_real_ip(PUBLIC_ADDR_1);
        assert_eq!(resolve("13.182.55.11:8080", &headers), PUBLIC_ADDR_1);
    }

    #[test]
    fn test_x_real_ip_is_returned_verbatim() {
        let headers = forwarded_for(&[LOCAL_ADDR]).with_x_real_ip("10.0.0.9");
        assert_eq!(resolve("13.182.55.11:8080", &headers), "10.0.0.9");
    }

    #[test]
    fn test_only_private_hops_yield_empty() {
        let headers = forwarded_for(&[LOCAL_ADDR]).with_forwarded("for=192.168.0.1");
        assert_eq!(resolve("13.182.55.11:8080", &headers), "");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let headers = forwarded_for(&[LOCAL_ADDR, PUBLIC_ADDR_1]);
        assert_eq!(resolve("", &headers), resolve("", &headers));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("13.182.55.11:8080"), "13.182.55.11");
        assert_eq!(strip_port("13.182.55.11"), "13.182.55.11");
        assert_eq!(strip_port("[::1]:8080"), "::1");
        assert_eq!(strip_port("[2001:db8::1]"), "2001:db8::1");
        assert_eq!(strip_port("2001:db8::1"), "2001:db8::1");
        assert_eq!(strip_port("[::1"), "[::1");
        assert_eq!(strip_port("[::1:8080"), "[::1:8080");
        assert_eq!(strip_port("example.com:443"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port(""), "");
    }

    #[test]
    fn test_snapshot_from_map() {
        let mut map = HashMap::new();
        map.insert("X-Real-IP".to_string(), PUBLIC_ADDR_2.to_string());
        map.insert("x-forwarded-for".to_string(), format!("{LOCAL_ADDR}, {PUBLIC_ADDR_1}"));
        map.insert("content-type".to_string(), "text/plain".to_string());

        let headers = HeaderSnapshot::from_map(&map);
        assert_eq!(headers.x_real_ip, PUBLIC_ADDR_2);
        assert_eq!(headers.x_forwarded_for, vec![format!("{LOCAL_ADDR}, {PUBLIC_ADDR_1}")]);
        assert!(headers.forwarded.is_empty());
        assert_eq!(resolve("", &headers), PUBLIC_ADDR_1);
    }

    #[cfg(feature = "axum")]
    #[test]
    fn test_snapshot_from_http_headers() {
        use axum::http::{self, HeaderValue};

        let mut map = http::HeaderMap::new();
        map.append(X_REAL_IP, HeaderValue::from_static("203.0.113.7"));
        map.append(X_REAL_IP, HeaderValue::from_static("203.0.113.8"));
        map.append(FORWARDED, HeaderValue::from_static("for=119.14.55.11"));
        map.append(FORWARDED, HeaderValue::from_static("for=144.12.54.87"));
        map.append(X_FORWARDED_FOR, HeaderValue::from_static(LOCAL_ADDR));
        map.append(X_FORWARDED_FOR, HeaderValue::from_static(""));
        map.append(X_FORWARDED_FOR, HeaderValue::from_static("144.12.54.87, 10.0.0.1"));

        let headers = HeaderSnapshot::from(&map);
        assert_eq!(headers.x_real_ip, "203.0.113.7");
        assert_eq!(headers.forwarded, "for=119.14.55.11");
        assert_eq!(
            headers.x_forwarded_for,
            vec![LOCAL_ADDR, "", "144.12.54.87, 10.0.0.1"]
        );
    }

    #[cfg(feature = "axum")]
    #[test]
    fn test_snapshot_from_http_headers_keeps_undecodable_values() {
        use axum::http::{self, HeaderValue};

        let mut map = http::HeaderMap::new();
        map.append(X_FORWARDED_FOR, HeaderValue::from_bytes(b"caf\xe9").unwrap());
        map.append(X_REAL_IP, HeaderValue::from_bytes(b"10.0.0.\xff").unwrap());

        let headers = HeaderSnapshot::from(&map);
        assert_eq!(headers.x_forwarded_for, vec!["caf\u{fffd}"]);
        assert_eq!(headers.x_real_ip, "10.0.0.\u{fffd}");
        assert!(!headers.is_empty());
        assert_eq!(resolve("13.182.55.11:8080", &headers), "10.0.0.\u{fffd}");
    }

    #[test]
    fn test_snapshot_is_empty() {
        assert!(HeaderSnapshot::new().is_empty());
        assert!(!HeaderSnapshot::new().with_x_forwarded_for("").is_empty());
        assert!(!HeaderSnapshot::new().with_forwarded("proto=https").is_empty());
    }
}
