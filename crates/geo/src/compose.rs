use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Join location parts into `country|province|city|isp`.
///
/// Empty parts are skipped, as is a province equal to the country and a
/// city equal to the province. Returns `None` when nothing is left.
pub fn compose_source(
    country: Option<&str>,
    province: Option<&str>,
    city: Option<&str>,
    isp: Option<&str>,
) -> Option<String> {
    fn present(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    let country = present(country);
    let province = present(province);
    let city = present(city);
    let isp = present(isp);

    let mut parts: Vec<&str> = Vec::with_capacity(4);
    parts.extend(country);
    parts.extend(province.filter(|p| Some(*p) != country));
    parts.extend(city.filter(|c| Some(*c) != province));
    parts.extend(isp);

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

/// Loopback, private and link-local addresses never leave the process.
pub fn is_local_ip(ip: &str) -> bool {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => is_local_v4(v4),
        Ok(IpAddr::V6(v6)) => is_local_v6(v6),
        Err(_) => false,
    }
}

fn is_local_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

fn is_local_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_local_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_composite() {
        assert_eq!(
            compose_source(Some("中国"), Some("广东"), Some("深圳"), Some("电信")).as_deref(),
            Some("中国|广东|深圳|电信")
        );
    }

    #[test]
    fn repeated_segments_are_elided() {
        // Municipalities report the same name for province and city.
        assert_eq!(
            compose_source(Some("中国"), Some("北京"), Some("北京"), Some("联通")).as_deref(),
            Some("中国|北京|联通")
        );
        assert_eq!(
            compose_source(Some("新加坡"), Some("新加坡"), Some(""), None).as_deref(),
            Some("新加坡")
        );
    }

    #[test]
    fn absent_parts_are_skipped() {
        assert_eq!(
            compose_source(None, Some("广东省"), None, Some("广东省深圳市 电信")).as_deref(),
            Some("广东省|广东省深圳市 电信")
        );
        assert_eq!(compose_source(None, Some(" "), Some(""), None), None);
    }

    #[test]
    fn local_addresses() {
        for ip in [
            "127.0.0.1",
            "::1",
            "0:0:0:0:0:0:0:1",
            "10.1.2.3",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.10",
            "169.254.0.7",
            "::ffff:192.168.0.1",
            "fd12:3456::1",
            "fe80::1",
        ] {
            assert!(is_local_ip(ip), "{ip} should be local");
        }
    }

    #[test]
    fn public_addresses() {
        for ip in ["8.8.8.8", "172.32.0.1", "223.5.5.5", "2400:3200::1", "not-an-ip"] {
            assert!(!is_local_ip(ip), "{ip} should not be local");
        }
    }
}
