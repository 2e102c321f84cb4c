//! Focus-mode blocking decision
//!
//! Pure functions shared by the background controller and the wasm
//! bindings: site list normalization, host membership and the redirect
//! target for a blocked tab.

use crate::types::FocusState;
use crate::url::{encode_query_component, extract_host, web_hostname};

/// Normalize a user-entered site list: trim, lowercase, drop empties.
///
/// Entries pasted as full URLs are reduced to their hostname. Order is kept;
/// repeated sites are dropped.
pub fn normalize_sites<I, S>(sites: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for site in sites {
        let site = site.as_ref().trim().to_lowercase();
        let site = if site.contains("://") {
            extract_host(&site).unwrap_or_default().to_string()
        } else {
            site
        };
        let site = site.trim_end_matches('/').to_string();
        if !site.is_empty() && !out.contains(&site) {
            out.push(site);
        }
    }
    out
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// The entry of `sites` that `host` falls under, either as the same host
/// or as a subdomain of it.
///
/// A leading `www.` is ignored on both sides.
pub fn matching_site<'a>(host: &str, sites: &'a [String]) -> Option<&'a str> {
    let host = strip_www(host);
    sites
        .iter()
        .find(|site| {
            let site = strip_www(site);
            !site.is_empty()
                && (host == site
                    || (host.len() > site.len()
                        && host.ends_with(site)
                        && host.as_bytes()[host.len() - site.len() - 1] == b'.'))
        })
        .map(String::as_str)
}

/// Whether `host` is one of `sites` or a subdomain of one.
pub fn is_blocked_host(host: &str, sites: &[String]) -> bool {
    matching_site(host, sites).is_some()
}

/// Build the blocked-page URL for `site`.
pub fn blocked_page_url(blocked_page: &str, site: &str) -> String {
    let separator = if blocked_page.contains('?') { '&' } else { '?' };
    format!("{}{}site={}", blocked_page, separator, encode_query_component(site))
}

/// Where to send a tab showing `url`, or `None` if it may stay.
///
/// Only web pages are redirected, and only while focus mode is active.
pub fn blocked_redirect(url: &str, state: &FocusState, blocked_page: &str) -> Option<String> {
    if !state.active || url.starts_with(blocked_page) {
        return None;
    }
    let host = web_hostname(url)?;
    let site = matching_site(&host, &state.blocked_sites)?;
    Some(blocked_page_url(blocked_page, site))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "chrome-extension://ext/blocked.html";

    fn active(sites: &[&str]) -> FocusState {
        FocusState {
            active: true,
            blocked_sites: normalize_sites(sites),
            ..FocusState::default()
        }
    }

    #[test]
    fn test_normalize_sites() {
        assert_eq!(
            normalize_sites([" Example.com ", "", "news.site", "example.com", "https://Video.test/watch"]),
            vec!["example.com", "news.site", "video.test"]
        );
    }

    #[test]
    fn test_is_blocked_host() {
        let sites = normalize_sites(["example.com"]);
        assert!(is_blocked_host("example.com", &sites));
        assert!(is_blocked_host("www.example.com", &sites));
        assert!(is_blocked_host("m.example.com", &sites));
        assert!(!is_blocked_host("notexample.com", &sites));
        assert!(!is_blocked_host("example.com.evil", &sites));

        let sites = normalize_sites(["http://[::1]/", "https://[2001:DB8::5]:443/"]);
        assert_eq!(sites, vec!["[::1]", "[2001:db8::5]"]);
        assert!(is_blocked_host("[::1]", &sites));
        assert!(is_blocked_host("[2001:db8::5]", &sites));
        assert!(!is_blocked_host("[::2]", &sites));
        assert!(!is_blocked_host("[2001:db8::6]", &sites));
    }

    #[test]
    fn test_matching_site_returns_the_entry() {
        let sites = normalize_sites(["news.site", "example.com"]);
        assert_eq!(matching_site("m.example.com", &sites), Some("example.com"));
        assert_eq!(matching_site("www.news.site", &sites), Some("news.site"));
        assert_eq!(matching_site("other.com", &sites), None);
    }

    #[test]
    fn test_redirect_carries_the_blocked_site() {
        let state = active(&["example.com"]);
        assert_eq!(
            blocked_redirect("https://www.example.com/a", &state, PAGE).as_deref(),
            Some("chrome-extension://ext/blocked.html?site=example.com")
        );
        assert_eq!(
            blocked_redirect("https://m.example.com/a", &state, PAGE).as_deref(),
            Some("chrome-extension://ext/blocked.html?site=example.com")
        );
    }

    #[test]
    fn test_redirect_for_ipv6_literal() {
        let state = active(&["http://[::1]:8080/"]);
        assert_eq!(
            blocked_redirect("http://[::1]:3000/app", &state, PAGE).as_deref(),
            Some("chrome-extension://ext/blocked.html?site=%5B%3A%3A1%5D")
        );
        assert_eq!(blocked_redirect("http://[::2]/app", &state, PAGE), None);
    }

    #[test]
    fn test_redirect_for_blocked_site() {
        let state = active(&["example.com"]);
        assert_eq!(
            blocked_redirect("http://example.com/page", &state, PAGE).as_deref(),
            Some("chrome-extension://ext/blocked.html?site=example.com")
        );
        assert_eq!(blocked_redirect("http://other.com", &state, PAGE), None);
    }

    #[test]
    fn test_no_redirect_when_inactive() {
        let mut state = active(&["example.com"]);
        state.active = false;
        assert_eq!(blocked_redirect("http://example.com/page", &state, PAGE), None);
    }

    #[test]
    fn test_non_web_pages_are_left_alone() {
        let state = active(&["example.com"]);
        assert_eq!(blocked_redirect("chrome://settings", &state, PAGE), None);
        assert_eq!(blocked_redirect(&format!("{PAGE}?site=example.com"), &state, PAGE), None);
    }
}
