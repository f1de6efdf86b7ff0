//! SSRF protection for outbound fetches.

use std::net::IpAddr;

use url::Url;

use arrs_shared::{ArrsError, Result};

/// Parse `raw` and reject it if it is not a safe fetch target.
///
/// With `allow_private` set, only the scheme check applies.
pub fn check_target(raw: &str, allow_private: bool) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| ArrsError::validation(format!("invalid URL {raw}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ArrsError::Acquisition(format!(
                "{raw}: unsupported scheme '{other}'"
            )));
        }
    }

    if !allow_private && is_ssrf_target(&url) {
        return Err(ArrsError::Acquisition(format!(
            "{raw}: blocked by SSRF protection"
        )));
    }

    Ok(url)
}

/// Check if a URL targets a potentially dangerous resource.
pub fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_private_targets() {
        for raw in [
            "http://localhost/",
            "http://127.0.0.1:8080/",
            "http://10.0.0.5/",
            "http://192.168.1.1/",
            "http://[::1]/",
            "http://printer.local/",
            "http://100.64.0.1/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(is_ssrf_target(&url), "{raw} should be blocked");
        }
    }

    #[test]
    fn allows_public_targets() {
        let url = Url::parse("https://shop.example.com/product/42").unwrap();
        assert!(!is_ssrf_target(&url));
        assert!(check_target("https://93.184.216.34/", false).is_ok());
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = check_target("file:///etc/passwd", true).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn allow_private_bypasses_host_check() {
        assert!(check_target("http://127.0.0.1:9000/", true).is_ok());
        assert!(check_target("http://127.0.0.1:9000/", false).is_err());
    }

    #[test]
    fn unparseable_url_is_validation_error() {
        let err = check_target("not a url", false).unwrap_err();
        assert_eq!(err.kind(), arrs_shared::ErrorKind::Validation);
    }
}
