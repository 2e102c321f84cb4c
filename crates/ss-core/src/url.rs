//! URL helpers for tab enforcement
//!
//! These functions avoid allocations where they can and work directly on
//! string slices; tab URLs are checked on every navigation.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// URL schemes the extension cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    /// `chrome-extension://`, `moz-extension://` and friends
    Extension,
    /// `about:`, `chrome://`, `file://`, `data:` ...
    Other,
}

impl Scheme {
    /// Pages a blocked site can live on.
    pub fn is_web(self) -> bool {
        matches!(self, Self::Http | Self::Https)
    }
}

// =============================================================================
// Scheme Extraction
// =============================================================================

/// Fast scheme classification without URL parsing.
#[inline]
pub fn extract_scheme(url: &str) -> Scheme {
    let bytes = url.as_bytes();
    if bytes.len() >= 8 && bytes[..8].eq_ignore_ascii_case(b"https://") {
        Scheme::Https
    } else if bytes.len() >= 7 && bytes[..7].eq_ignore_ascii_case(b"http://") {
        Scheme::Http
    } else if url
        .split_once("://")
        .is_some_and(|(scheme, _)| scheme.to_ascii_lowercase().ends_with("-extension"))
    {
        Scheme::Extension
    } else {
        Scheme::Other
    }
}

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    // Find ':'
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    // Check for "://"
    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'@' {
            host_start = i + 1;
            break;
        }
        if b == b'/' || b == b'?' || b == b'#' {
            break;
        }
    }

    // Bracketed IPv6 literal: the host runs through the closing ']'
    if bytes.get(host_start) == Some(&b'[') {
        let close = bytes[host_start..]
            .iter()
            .position(|&b| b == b']' || b == b'/' || b == b'?' || b == b'#')?;
        if bytes[host_start + close] != b']' {
            return None;
        }
        return Some((host_start, host_start + close + 1));
    }

    // Find host end
    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(host_start) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL, or `None` for an empty host.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    let host = &url[host_start..host_end];
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Lowercased hostname of a web (http/https) URL.
pub fn web_hostname(url: &str) -> Option<String> {
    if !extract_scheme(url).is_web() {
        return None;
    }
    extract_host(url).map(str::to_ascii_lowercase)
}

// =============================================================================
// Query Encoding
// =============================================================================

/// Characters escaped in a query component: everything but the RFC 3986
/// unreserved set.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encode a query component.
pub fn encode_query_component(value: &str) -> String {
    utf8_percent_encode(value, QUERY_SET).to_string()
}
