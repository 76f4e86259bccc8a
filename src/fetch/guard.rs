//! Target validation against server-side request forgery.
//!
//! A target must be an http(s) URL whose host is a public-looking DNS name or
//! a public IP literal. When hostname resolution is enabled, every resolved
//! address must be public as well.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::warn;
use url::{Host, Url};

use crate::error::{Error, Result};

/// Reserved DNS suffixes that never name a public host.
const INTERNAL_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".localdomain", ".home.arpa"];

/// True for loopback, private, link-local, shared (CGNAT), unspecified,
/// broadcast and unique-local addresses.
#[must_use]
pub fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_blocked_v4(&mapped);
            }
            is_blocked_v6(v6)
        }
    }
}

fn is_blocked_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || (a == 100 && (64..128).contains(&b))
        || a == 0
}

fn is_blocked_v6(ip: &Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// Parse and validate a target URL without touching the network.
///
/// # Errors
/// `InvalidUrl` for anything that is not an absolute http(s) URL with a host,
/// `BlockedHost` for internal IP literals and bare hostnames.
pub fn validate_target(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidUrl("missing url".to_string()));
    }
    let url = Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!("unsupported scheme: {}", url.scheme())));
    }

    match url.host() {
        None => Err(Error::InvalidUrl(format!("no host in {raw}"))),
        Some(Host::Ipv4(ip)) => check_ip(IpAddr::V4(ip)).map(|()| url),
        Some(Host::Ipv6(ip)) => check_ip(IpAddr::V6(ip)).map(|()| url),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if !domain.contains('.')
                || domain == "localhost"
                || INTERNAL_SUFFIXES.iter().any(|s| domain.ends_with(s))
            {
                return Err(Error::BlockedHost(domain));
            }
            Ok(url)
        }
    }
}

fn check_ip(ip: IpAddr) -> Result<()> {
    if is_blocked_ip(&ip) {
        Err(Error::BlockedHost(ip.to_string()))
    } else {
        Ok(())
    }
}

/// Resolve the host of `url` and reject it when any address is internal.
///
/// IP literals are already covered by [`validate_target`] and pass through.
/// Resolution failures are left to the fetch itself to report.
///
/// # Errors
/// `BlockedHost` when a resolved address is internal.
pub async fn check_resolved(url: &Url) -> Result<()> {
    let Some(Host::Domain(domain)) = url.host() else {
        return Ok(());
    };
    let port = url.port_or_known_default().unwrap_or(443);

    match tokio::net::lookup_host((domain, port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if is_blocked_ip(&addr.ip()) {
                    warn!(host = domain, ip = %addr.ip(), "target resolves to internal address");
                    return Err(Error::BlockedHost(format!("{domain} ({})", addr.ip())));
                }
            }
            Ok(())
        }
        Err(err) => {
            warn!(host = domain, error = %err, "could not resolve target host");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_public_targets() {
        assert!(validate_target("https://shop.example.com/p/1").is_ok());
        assert!(validate_target("http://93.184.216.34/").is_ok());
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(matches!(validate_target(""), Err(Error::InvalidUrl(_))));
        assert!(matches!(validate_target("not a url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(validate_target("ftp://example.com/x"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_internal_hosts() {
        for target in [
            "http://127.0.0.1/",
            "http://10.1.2.3/",
            "http://192.168.0.10/",
            "http://169.254.169.254/latest/meta-data",
            "http://100.64.0.1/",
            "http://[::1]/",
            "http://[fd00::1]/",
            "http://[::ffff:10.0.0.1]/",
            "http://localhost:8080/",
            "http://intranet/",
            "http://printer.local/",
        ] {
            assert!(
                matches!(validate_target(target), Err(Error::BlockedHost(_))),
                "{target} should be blocked"
            );
        }
    }

    #[tokio::test]
    async fn test_check_resolved_passes_ip_literals() {
        let url = Url::parse("http://93.184.216.34/").unwrap();
        assert!(check_resolved(&url).await.is_ok());
    }
}
