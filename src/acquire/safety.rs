//! SSRF guard for caller-supplied URLs.
//!
//! The check is textual: it blocks the well-known loopback/metadata hosts
//! and the dotted private ranges as they appear in the URL itself.  It does
//! not resolve DNS, so a hostname that resolves to a private address (DNS
//! rebinding), an IPv6 loopback, or a decimal/octal-encoded IPv4 address
//! will pass.  Known gap; the filter is advisory, not exhaustive.

use url::Url;

/// Hostnames that are never fetched, compared case-insensitively.
/// 169.254.169.254 is the cloud instance metadata endpoint.
const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "169.254.169.254"];

/// Returns true if the URL may be fetched.
///
/// Rejects quietly rather than failing loudly: a false return means the
/// caller should refuse the reference, not that something broke.
pub fn is_safe_url(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    if BLOCKED_HOSTS.contains(&host.as_str()) {
        return false;
    }

    !is_private_dotted(&host)
}

/// Textual match against RFC 1918 private ranges: 10.0.0.0/8,
/// 172.16.0.0/12, 192.168.0.0/16.
fn is_private_dotted(host: &str) -> bool {
    if host.starts_with("10.") || host.starts_with("192.168.") {
        return true;
    }

    if let Some(rest) = host.strip_prefix("172.") {
        if let Some((second, _)) = rest.split_once('.') {
            if let Ok(n) = second.parse::<u8>() {
                return (16..=31).contains(&n);
            }
        }
    }

    false
}
