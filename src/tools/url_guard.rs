//! Outbound URL validation for page fetches.

use crate::error::ServiceError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

const BLOCKED_HOSTNAMES: &[&str] = &[
    "metadata.google.internal",
    "metadata.google",
    "metadata",
    "169.254.169.254",
];

const BLOCKED_SUFFIXES: &[&str] = &[".internal", ".local", ".corp", ".lan", ".intranet"];

const METADATA_V4: Ipv4Addr = Ipv4Addr::new(169, 254, 169, 254);

/// Checks a URL before it is fetched. Metadata endpoints are refused even
/// when `allow_private` is set; loopback and private ranges are not.
pub fn validate_url(raw: &str, allow_private: bool) -> Result<Url, ServiceError> {
    let url = Url::parse(raw.trim()).map_err(|e| ServiceError::Blocked(format!("invalid URL {}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ServiceError::Blocked(format!(
            "scheme '{}' not allowed, only http/https",
            url.scheme()
        )));
    }

    match url.host() {
        None => Err(ServiceError::Blocked("URL has no host".to_string())),
        Some(Host::Domain(domain)) => {
            let host = domain.trim_end_matches('.').to_ascii_lowercase();
            if BLOCKED_HOSTNAMES.contains(&host.as_str()) {
                return Err(ServiceError::Blocked(format!("hostname {}", host)));
            }
            if !allow_private {
                if host == "localhost" || host.ends_with(".localhost") {
                    return Err(ServiceError::Blocked(format!("hostname {}", host)));
                }
                if let Some(suffix) = BLOCKED_SUFFIXES.iter().find(|s| host.ends_with(*s)) {
                    return Err(ServiceError::Blocked(format!("internal suffix {} in {}", suffix, host)));
                }
            }
            Ok(url)
        }
        Some(Host::Ipv4(ip)) => check_ip(IpAddr::V4(ip), allow_private).map(|_| url),
        Some(Host::Ipv6(ip)) => check_ip(IpAddr::V6(ip), allow_private).map(|_| url),
    }
}

fn check_ip(ip: IpAddr, allow_private: bool) -> Result<(), ServiceError> {
    let v4 = match ip {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(v6) => v6.to_ipv4_mapped(),
    };
    if v4 == Some(METADATA_V4) {
        return Err(ServiceError::Blocked(format!("metadata address {}", ip)));
    }
    if allow_private {
        return Ok(());
    }
    let dangerous = match (v4, ip) {
        (Some(v4), _) => is_dangerous_v4(v4),
        (None, IpAddr::V6(v6)) => is_dangerous_v6(v6),
        (None, IpAddr::V4(_)) => false,
    };
    if dangerous {
        Err(ServiceError::Blocked(format!("private/reserved address {}", ip)))
    } else {
        Ok(())
    }
}

fn is_dangerous_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        // carrier-grade NAT, 100.64.0.0/10
        || (ip.octets()[0] == 100 && (ip.octets()[1] & 0xc0) == 64)
}

fn is_dangerous_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_public_http_urls() {
        assert!(validate_url("https://example.com/page?q=1", false).is_ok());
        assert!(validate_url("http://93.184.216.34/", false).is_ok());
    }

    #[test]
    fn rejects_non_http_schemes_and_garbage() {
        assert!(validate_url("file:///etc/passwd", false).is_err());
        assert!(validate_url("ftp://example.com/x", false).is_err());
        assert!(validate_url("not a url", false).is_err());
    }

    #[test]
    fn rejects_private_and_internal_hosts() {
        for url in [
            "http://127.0.0.1:8080/",
            "http://10.1.2.3/",
            "http://192.168.0.10/",
            "http://[::1]/",
            "http://[fd00::1]/",
            "http://localhost/",
            "http://printer.local/",
            "http://wiki.corp/",
        ] {
            assert!(validate_url(url, false).is_err(), "{} should be blocked", url);
        }
    }

    #[test]
    fn metadata_endpoints_stay_blocked_when_private_hosts_allowed() {
        assert!(validate_url("http://169.254.169.254/latest/meta-data", true).is_err());
        assert!(validate_url("http://metadata.google.internal/", true).is_err());
        assert!(validate_url("http://127.0.0.1:9000/", true).is_ok());
        assert!(validate_url("http://localhost:9000/", true).is_ok());
    }
}
