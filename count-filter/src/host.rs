//! Host normalization
//!
//! Counters are grouped by the lowercased network location of a URL, kept
//! exactly as written: an explicit port or userinfo is part of the key, so
//! `http://example.com:80/` and `http://example.com/` count separately.
//! Ignore-list entries are compared against the same key. Crawlers that
//! already have their own host extraction can plug it in through
//! [`HostNormalizer`].

/// Maps a URL to the host key its events are counted under
pub trait HostNormalizer: Send + Sync {
    fn host(&self, url: &str) -> String;
}

/// Default normalizer built on [`normalize_host`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlHostNormalizer;

impl HostNormalizer for UrlHostNormalizer {
    fn host(&self, url: &str) -> String {
        normalize_host(url)
    }
}

impl<F> HostNormalizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn host(&self, url: &str) -> String {
        self(url)
    }
}

/// Lowercased network location (`[userinfo@]host[:port]`) of a URL
///
/// The location is the part after `scheme://` (or a leading `//`) up to the
/// first `/`, `?` or `#`. Nothing in it is rewritten besides the case, so
/// default ports stay when they are spelled out. A URL without a network
/// location gives an empty key.
///
/// ```
/// use count_filter::normalize_host;
///
/// assert_eq!(normalize_host("http://Quotes.ToScrape.com/page/2/"), "quotes.toscrape.com");
/// assert_eq!(normalize_host("https://example.com:8443/x"), "example.com:8443");
/// assert_eq!(normalize_host("http://example.com:80/"), "example.com:80");
/// assert_eq!(normalize_host("not a url"), "");
/// ```
pub fn normalize_host(url: &str) -> String {
    network_location(url.trim()).to_lowercase()
}

fn network_location(url: &str) -> &str {
    let rest = match url.split_once(':') {
        Some((scheme, rest)) if is_scheme(scheme) => rest,
        _ => url,
    };
    let Some(rest) = rest.strip_prefix("//") else {
        return "";
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

fn is_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_hosts_match() {
        assert_eq!(
            normalize_host("http://EXAMPLE.com/a"),
            normalize_host("http://example.COM/b?x=1")
        );
    }

    #[test]
    fn test_ports_kept_as_written() {
        assert_eq!(normalize_host("http://example.com:80/"), "example.com:80");
        assert_eq!(normalize_host("http://example.com:8080/"), "example.com:8080");
        assert_eq!(normalize_host("https://example.com:443"), "example.com:443");
        assert_ne!(
            normalize_host("http://example.com:80/"),
            normalize_host("http://example.com/")
        );
    }

    #[test]
    fn test_userinfo_kept() {
        assert_eq!(
            normalize_host("ftp://User:pw@Files.Example.com/x"),
            "user:pw@files.example.com"
        );
    }

    #[test]
    fn test_location_ends_at_path_query_or_fragment() {
        assert_eq!(normalize_host("http://example.com?q=1"), "example.com");
        assert_eq!(normalize_host("http://example.com#top"), "example.com");
        assert_eq!(normalize_host("//Example.com/x"), "example.com");
        assert_eq!(normalize_host("  HTTPS://Example.com/x  "), "example.com");
    }

    #[test]
    fn test_urls_without_network_location() {
        assert_eq!(normalize_host(""), "");
        assert_eq!(normalize_host("example.com/path"), "");
        assert_eq!(normalize_host("mailto:someone@example.com"), "");
        assert_eq!(normalize_host("a/b//c.com"), "");
        assert_eq!(normalize_host("http://exa mple.com/x"), "exa mple.com");
    }

    #[test]
    fn test_closure_normalizer() {
        let normalizer = |url: &str| url.to_uppercase();
        assert_eq!(HostNormalizer::host(&normalizer, "abc"), "ABC");
        assert_eq!(UrlHostNormalizer.host("http://A.b/"), "a.b");
    }
}
