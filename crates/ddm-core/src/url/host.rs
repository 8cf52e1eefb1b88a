//! Host classification (spec.md §4.A).

/// Classification of a parsed URL host.
///
/// `IPv6` has no producing branch yet (spec.md §9 Open Questions): a
/// bracketed literal classifies as `Invalid` for now, same as the original
/// program this spec was distilled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    IPv4,
    Domain,
    IPv6,
    Invalid,
}

/// Classifies a host string as IPv4, Domain, or Invalid.
///
/// IPv4: exactly four dot-separated integers in `0..=255`, no extra
/// characters. Domain: every character alphanumeric, `.`, or `-`; each
/// dot-separated label is 1–63 characters and doesn't start or end with a
/// hyphen; total length at most 253. Anything else is `Invalid`.
pub fn classify_host(host: &str) -> HostKind {
    if host.is_empty() {
        return HostKind::Invalid;
    }

    if let Some(kind) = classify_ipv4(host) {
        return kind;
    }

    classify_domain(host)
}

fn classify_ipv4(host: &str) -> Option<HostKind> {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    for part in &parts {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = part.parse().ok()?;
        if value > 255 {
            return None;
        }
    }
    Some(HostKind::IPv4)
}

fn classify_domain(host: &str) -> HostKind {
    if host.len() > 253 {
        return HostKind::Invalid;
    }
    if !host
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    {
        return HostKind::Invalid;
    }

    for label in host.split('.') {
        if label.is_empty() || label.len() > 63 {
            return HostKind::Invalid;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return HostKind::Invalid;
        }
    }

    HostKind::Domain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ipv4_exhaustive_octet_bounds() {
        for (a, b, c, d) in [(0u32, 0u32, 0u32, 0u32), (255, 255, 255, 255), (1, 2, 3, 4)] {
            let host = format!("{a}.{b}.{c}.{d}");
            assert_eq!(classify_host(&host), HostKind::IPv4, "{host}");
        }
    }

    #[test]
    fn ipv4_octet_out_of_range_is_invalid() {
        assert_eq!(classify_host("1.2.3.256"), HostKind::Invalid);
        assert_eq!(classify_host("999.1.1.1"), HostKind::Invalid);
    }

    #[test]
    fn ipv4_octet_with_leading_zero_classifies() {
        assert_eq!(classify_host("192.168.001.1"), HostKind::IPv4);
        assert_eq!(classify_host("010.0.0.1"), HostKind::IPv4);
    }

    #[test]
    fn domain_classifies() {
        assert_eq!(classify_host("example.com"), HostKind::Domain);
        assert_eq!(classify_host("sub.example-site.co"), HostKind::Domain);
    }

    #[test]
    fn label_leading_or_trailing_hyphen_is_invalid() {
        assert_eq!(classify_host("-bad.example.com"), HostKind::Invalid);
        assert_eq!(classify_host("bad-.example.com"), HostKind::Invalid);
    }

    #[test]
    fn label_too_long_is_invalid() {
        let long_label = "a".repeat(64);
        let host = format!("{long_label}.com");
        assert_eq!(classify_host(&host), HostKind::Invalid);
    }

    #[test]
    fn total_length_over_253_is_invalid() {
        let host = format!("{}.com", "a".repeat(250));
        assert_eq!(classify_host(&host), HostKind::Invalid);
    }

    #[test]
    fn ipv6_bracket_literal_is_invalid() {
        assert_eq!(classify_host("[::1]"), HostKind::Invalid);
    }

    #[test]
    fn empty_host_is_invalid() {
        assert_eq!(classify_host(""), HostKind::Invalid);
    }
}
