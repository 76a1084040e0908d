//! Domain allow/deny filtering, evaluated before any network fetch.

use url::Url;

/// Filters candidate URLs by host.
///
/// The deny-list short-circuits the fetch entirely; the allow-list, when
/// non-empty, is a positive filter applied the same way. Entries match the
/// host exactly or as a dot-separated suffix ("example.com" matches
/// "www.example.com" but not "notexample.com").
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    ignored: Vec<String>,
    included: Vec<String>,
}

impl DomainFilter {
    pub fn new(ignored: Vec<String>, included: Vec<String>) -> Self {
        Self { ignored, included }
    }

    /// Whether this URL may be fetched at all.
    pub fn allows(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        if self.ignored.iter().any(|entry| host_matches(&host, entry)) {
            tracing::debug!(%host, "Host is on the deny-list, skipping fetch");
            return false;
        }
        if self.included.is_empty() {
            return true;
        }
        self.included.iter().any(|entry| host_matches(&host, entry))
    }

    /// Whether a positive allow-list entry matched (false when the list is
    /// empty and everything passes by default).
    pub fn include_match(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        self.included.iter().any(|entry| host_matches(&host, entry))
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

fn host_matches(host: &str, entry: &str) -> bool {
    let entry = entry.trim().to_ascii_lowercase();
    if entry.is_empty() {
        return false;
    }
    host == entry || host.ends_with(&format!(".{entry}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_allows_everything() {
        let filter = DomainFilter::default();
        assert!(filter.allows("https://example.com/page"));
    }

    #[test]
    fn denied_host_is_rejected() {
        let filter = DomainFilter::new(vec!["ads.example.com".into()], vec![]);
        assert!(!filter.allows("https://ads.example.com/banner"));
        assert!(filter.allows("https://example.com/page"));
    }

    #[test]
    fn deny_matches_subdomains_by_suffix() {
        let filter = DomainFilter::new(vec!["example.com".into()], vec![]);
        assert!(!filter.allows("https://www.example.com/"));
        assert!(!filter.allows("https://example.com/"));
        assert!(filter.allows("https://notexample.com/"));
    }

    #[test]
    fn allow_list_is_a_positive_filter() {
        let filter = DomainFilter::new(vec![], vec!["docs.rs".into()]);
        assert!(filter.allows("https://docs.rs/serde"));
        assert!(!filter.allows("https://example.com/"));
        assert!(filter.include_match("https://docs.rs/serde"));
        assert!(!filter.include_match("https://example.com/"));
    }

    #[test]
    fn deny_wins_over_allow() {
        let filter = DomainFilter::new(vec!["docs.rs".into()], vec!["docs.rs".into()]);
        assert!(!filter.allows("https://docs.rs/serde"));
    }

    #[test]
    fn unparseable_url_is_rejected() {
        let filter = DomainFilter::default();
        assert!(!filter.allows("not a url"));
    }

    #[test]
    fn host_comparison_is_case_insensitive() {
        let filter = DomainFilter::new(vec!["Example.COM".into()], vec![]);
        assert!(!filter.allows("https://EXAMPLE.com/"));
    }
}
