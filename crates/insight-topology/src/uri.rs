//! URI parsing and port resolution

use crate::error::{TopologyError, TopologyResult};
use http::Uri;

pub const HTTP_DEFAULT_PORT: u16 = 80;
pub const SECURE_DEFAULT_PORT: u16 = 443;

/// Characters delimiting path-variable templates
const TEMPLATE_DELIMITERS: &[char] = &['{', '}'];

/// Parse a captured URI string
pub fn parse_uri(value: &str) -> TopologyResult<Uri> {
    value
        .parse::<Uri>()
        .map_err(|source| TopologyError::InvalidUri {
            value: value.to_string(),
            source,
        })
}

/// An absolute URI as captured
#[derive(Debug, Clone)]
pub struct CapturedUri<'a> {
    pub uri: Uri,
    /// Scheme exactly as written; `Uri` normalises the standard ones
    pub scheme: &'a str,
    pub host: String,
}

impl CapturedUri<'_> {
    pub fn port(&self) -> u16 {
        resolve_port(&self.uri, self.scheme)
    }
}

/// Parse a URI that must carry a scheme and a host.
///
/// Scheme-less strings such as `api.example.com:8080` parse as an authority
/// but name no absolute resource, so they are reported as `MissingHost`.
pub fn parse_absolute(value: &str) -> TopologyResult<CapturedUri<'_>> {
    let uri = parse_uri(value)?;
    let missing = || TopologyError::MissingHost(value.to_string());

    if uri.scheme().is_none() {
        return Err(missing());
    }
    let scheme = value.split_once("://").map(|(s, _)| s).ok_or_else(missing)?;
    let host = uri.host().ok_or_else(missing)?.to_string();

    Ok(CapturedUri { uri, scheme, host })
}

/// Parse an absolute URI and return its host
pub fn parse_host(value: &str) -> TopologyResult<String> {
    parse_absolute(value).map(|captured| captured.host)
}

/// Explicit positive port, else 80 when `scheme` is exactly `http`, else 443
pub fn resolve_port(uri: &Uri, scheme: &str) -> u16 {
    match uri.port_u16() {
        Some(port) if port > 0 => port,
        _ if scheme == "http" => HTTP_DEFAULT_PORT,
        _ => SECURE_DEFAULT_PORT,
    }
}

/// Strip template delimiters so a route template parses as a URI
pub fn sanitize_template(template: &str) -> String {
    template
        .chars()
        .filter(|c| !TEMPLATE_DELIMITERS.contains(c))
        .collect()
}
