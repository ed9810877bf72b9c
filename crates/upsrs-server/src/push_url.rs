//! Effective request base and push-channel URL construction.
//!
//! Reverse proxies rewrite scheme, host, port, and path prefix; the
//! forwarded headers win over the request's own values so subscribers
//! are handed a WebSocket URL that works from the outside.

use axum::http::HeaderMap;

/// Forwarded-scheme header.
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
/// Forwarded-host header.
const X_FORWARDED_HOST: &str = "x-forwarded-host";
/// Forwarded-port header.
const X_FORWARDED_PORT: &str = "x-forwarded-port";
/// Forwarded path prefix header.
const X_FORWARDED_PREFIX: &str = "x-forwarded-prefix";
/// Explicit WebSocket scheme override.
const X_WEBSOCKET_SCHEME: &str = "x-websocket-scheme";

/// The effective (proxy-aware) base of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBase {
    /// Effective HTTP scheme, `http` or `https`.
    pub scheme: String,
    /// Effective host, without port.
    pub host: String,
    /// Effective port, when one was given.
    pub port: Option<u16>,
    /// Effective path prefix, empty or starting with `/`.
    pub prefix: String,
    /// WebSocket scheme override, when a proxy supplied one.
    ws_scheme_override: Option<String>,
}

impl RequestBase {
    /// Derive the effective base from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let scheme = header_str(headers, X_FORWARDED_PROTO)
            .map(str::to_string)
            .unwrap_or_else(|| "http".to_string());

        let raw_host = header_str(headers, X_FORWARDED_HOST)
            .or_else(|| header_str(headers, "host"))
            .unwrap_or("localhost");
        let (host, host_port) = split_host_port(raw_host);

        let port = header_str(headers, X_FORWARDED_PORT)
            .and_then(|p| p.parse::<u16>().ok())
            .or(host_port);

        let prefix = header_str(headers, X_FORWARDED_PREFIX)
            .map(normalize_prefix)
            .unwrap_or_default();

        let ws_scheme_override =
            header_str(headers, X_WEBSOCKET_SCHEME).map(str::to_string);

        RequestBase { scheme, host: host.to_string(), port, prefix, ws_scheme_override }
    }

    /// Whether the effective request scheme is TLS.
    pub fn is_tls(&self) -> bool {
        self.scheme == "https"
    }

    /// The service URI used in `Warning` headers.
    pub fn service_uri(&self) -> String {
        format!(
            "{}://{}{}{}",
            self.scheme,
            self.host,
            self.render_port(&self.scheme),
            self.prefix
        )
    }

    /// The push-channel URL handed back in `Content-Location`.
    pub fn websocket_url(&self, ae_title: &str) -> String {
        let scheme = self
            .ws_scheme_override
            .clone()
            .unwrap_or_else(|| if self.is_tls() { "wss" } else { "ws" }.to_string());
        format!(
            "{}://{}{}{}/ws/subscribers/{}",
            scheme,
            self.host,
            self.render_port(&scheme),
            self.prefix,
            ae_title
        )
    }

    /// `:port`, with the scheme's standard port elided.
    fn render_port(&self, scheme: &str) -> String {
        match self.port {
            Some(port) if !is_standard_port(scheme, port) => format!(":{port}"),
            _ => String::new(),
        }
    }
}

fn is_standard_port(scheme: &str, port: u16) -> bool {
    match scheme {
        "http" | "ws" => port == 80,
        "https" | "wss" => port == 443,
        _ => false,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|s| !s.is_empty())
}

fn split_host_port(raw: &str) -> (&str, Option<u16>) {
    match raw.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (raw, None),
        },
        None => (raw, None),
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_plain_request_yields_ws_url() {
        let base = RequestBase::from_headers(&headers(&[("host", "pacs.example.com:8104")]));
        assert_eq!(
            base.websocket_url("AE1"),
            "ws://pacs.example.com:8104/ws/subscribers/AE1"
        );
        assert_eq!(base.service_uri(), "http://pacs.example.com:8104");
    }

    #[test]
    fn test_forwarded_tls_yields_wss() {
        let base = RequestBase::from_headers(&headers(&[
            ("host", "10.0.0.5:8104"),
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", "pacs.example.com"),
            ("x-forwarded-port", "443"),
        ]));
        assert!(base.is_tls());
        // 443 is standard and elided.
        assert_eq!(base.websocket_url("AE1"), "wss://pacs.example.com/ws/subscribers/AE1");
        assert_eq!(base.service_uri(), "https://pacs.example.com");
    }

    #[test]
    fn test_standard_http_port_elided() {
        let base = RequestBase::from_headers(&headers(&[("host", "pacs.example.com:80")]));
        assert_eq!(base.websocket_url("AE1"), "ws://pacs.example.com/ws/subscribers/AE1");
    }

    #[test]
    fn test_forwarded_prefix_applied() {
        let base = RequestBase::from_headers(&headers(&[
            ("host", "pacs.example.com"),
            ("x-forwarded-prefix", "dicomweb/"),
        ]));
        assert_eq!(
            base.websocket_url("AE1"),
            "ws://pacs.example.com/dicomweb/ws/subscribers/AE1"
        );
        assert_eq!(base.service_uri(), "http://pacs.example.com/dicomweb");
    }

    #[test]
    fn test_websocket_scheme_override_wins() {
        let base = RequestBase::from_headers(&headers(&[
            ("host", "pacs.example.com:9000"),
            ("x-websocket-scheme", "wss"),
        ]));
        assert_eq!(
            base.websocket_url("AE1"),
            "wss://pacs.example.com:9000/ws/subscribers/AE1"
        );
    }

    #[test]
    fn test_missing_host_falls_back() {
        let base = RequestBase::from_headers(&HeaderMap::new());
        assert_eq!(base.websocket_url("AE1"), "ws://localhost/ws/subscribers/AE1");
    }
}
