//! URL parsing and host classification (spec.md §4.A).
//!
//! A hand-rolled parser, not `url::Url`: the engine needs the exact field
//! split (scheme/host/port/path/query) and host classification spec.md
//! specifies, including its deliberately narrow host grammar (no IPv6
//! literals yet, despite the enum slot).

mod content_disposition;
mod filename;
mod host;
mod sanitize;

pub use content_disposition::parse_content_disposition_filename;
pub use filename::derive_filename;
pub use host::{classify_host, HostKind};
use crate::error::DownloadError;

/// Protocol inferred from the URL scheme. Only HTTP/HTTPS are dialed;
/// other protocol enum slots are intentionally absent (spec.md Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }

    pub fn is_tls(self) -> bool {
        matches!(self, Protocol::Https)
    }
}

/// A parsed URL: scheme, host, port, path, query, and host classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: String,
    pub host_kind: HostKind,
}

impl Url {
    /// Request path including query string, e.g. `/a/b?c=1`. Always starts
    /// with `/`.
    pub fn request_target(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// The full URL string this record was parsed from (reconstructed),
    /// used for display and for building a fresh `Url` after a redirect.
    pub fn to_string_form(&self) -> String {
        let scheme = match self.protocol {
            Protocol::Http => "http",
            Protocol::Https => "https",
        };
        let default_port = self.protocol.default_port();
        if self.port == default_port {
            format!("{}://{}{}", scheme, self.host, self.request_target())
        } else {
            format!(
                "{}://{}:{}{}",
                scheme,
                self.host,
                self.port,
                self.request_target()
            )
        }
    }
}

/// Parses `scheme://host[:port]/path[?query]` into a `Url` record.
///
/// Defaults: missing scheme is treated as `http`; path defaults to `/`;
/// missing port uses the scheme's default (80/443). The host is classified
/// as IPv4, Domain, or Invalid (spec.md §4.A); if it classifies Invalid the
/// caller must not perform any network operation.
pub fn parse(input: &str) -> Result<Url, DownloadError> {
    if input.is_empty() {
        return Err(DownloadError::UrlParse("empty URL".to_string()));
    }

    let (protocol, rest) = match input.find("://") {
        Some(idx) => {
            let scheme = &input[..idx];
            let rest = &input[idx + 3..];
            let protocol = if scheme.eq_ignore_ascii_case("https") {
                Protocol::Https
            } else {
                Protocol::Http
            };
            (protocol, rest)
        }
        None => (Protocol::Http, input),
    };

    if rest.is_empty() {
        return Err(DownloadError::UrlParse("missing host".to_string()));
    }

    let port_idx = rest.find(':');
    let path_idx = rest.find('/');
    let query_idx_in_rest = rest.find('?');

    let host_end = [port_idx, path_idx, query_idx_in_rest]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());

    let host = rest[..host_end].to_string();
    if host.is_empty() {
        return Err(DownloadError::UrlParse("missing host".to_string()));
    }

    let mut cursor = &rest[host_end..];

    let mut port: Option<u16> = None;
    if let Some(stripped) = cursor.strip_prefix(':') {
        let digits_len = stripped
            .as_bytes()
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let digits = &stripped[..digits_len];
        if !digits.is_empty() {
            port = digits.parse::<u16>().ok();
            if port.is_none() {
                return Err(DownloadError::UrlParse(format!("invalid port: {digits}")));
            }
        }
        cursor = &stripped[digits_len..];
    }

    let mut path = "/".to_string();
    if cursor.starts_with('/') {
        let path_end = cursor.find('?').unwrap_or(cursor.len());
        path = cursor[..path_end].to_string();
        cursor = &cursor[path_end..];
    }

    let query = cursor.strip_prefix('?').unwrap_or("").to_string();

    let host_kind = classify_host(&host);
    let port = port.unwrap_or_else(|| protocol.default_port());

    Ok(Url {
        protocol,
        host,
        port,
        path,
        query,
        host_kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_host_defaults_to_http() {
        let u = parse("http://h/").unwrap();
        assert_eq!(u.protocol, Protocol::Http);
        assert_eq!(u.host, "h");
        assert_eq!(u.port, 80);
        assert_eq!(u.path, "/");
    }

    #[test]
    fn https_with_port_and_query() {
        let u = parse("https://h:8443/a?b=1").unwrap();
        assert_eq!(u.protocol, Protocol::Https);
        assert_eq!(u.host, "h");
        assert_eq!(u.port, 8443);
        assert_eq!(u.path, "/a");
        assert_eq!(u.query, "b=1");
    }

    #[test]
    fn ipv4_host() {
        let u = parse("http://1.2.3.4").unwrap();
        assert_eq!(u.host, "1.2.3.4");
        assert_eq!(u.host_kind, HostKind::IPv4);
        assert_eq!(u.path, "/");
    }

    #[test]
    fn missing_scheme_defaults_to_http() {
        let u = parse("h.com/p").unwrap();
        assert_eq!(u.protocol, Protocol::Http);
        assert_eq!(u.host, "h.com");
        assert_eq!(u.path, "/p");
    }

    #[test]
    fn host_with_leading_hyphen_label_is_invalid() {
        let u = parse("http://bad-.example/").unwrap();
        assert_eq!(u.host_kind, HostKind::Invalid);
    }

    #[test]
    fn request_target_includes_query() {
        let u = parse("http://h/a/b?x=1").unwrap();
        assert_eq!(u.request_target(), "/a/b?x=1");
    }

    #[test]
    fn empty_url_fails() {
        assert!(parse("").is_err());
    }
}
