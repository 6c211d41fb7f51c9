//! Timing and threshold settings for a resolution session.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Default site root that relative post URLs are joined onto.
pub const DEFAULT_BASE_URL: &str = "https://www.instagram.com";

/// Query parameter selecting the displayed item of a carousel post.
pub const DEFAULT_INDEX_PARAM: &str = "img_index";

/// Settings for one resolution session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub base_url: String,
    pub index_param: String,
    /// Ceiling for every navigation.
    pub navigation_timeout_ms: u64,
    /// How long a carousel capture window waits for its first candidate.
    pub capture_max_wait_ms: u64,
    /// Extra collection time after the first candidate (or the wait) ends.
    pub capture_settle_ms: u64,
    /// Capture time after navigating to a single-item post.
    pub single_settle_ms: u64,
    /// Consecutive silent redirects that end a carousel.
    pub redirect_threshold: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            index_param: DEFAULT_INDEX_PARAM.to_string(),
            navigation_timeout_ms: 30_000,
            capture_max_wait_ms: 7_000,
            capture_settle_ms: 2_000,
            single_settle_ms: 3_000,
            redirect_threshold: 2,
        }
    }
}

impl ResolverConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn capture_max_wait(&self) -> Duration {
        Duration::from_millis(self.capture_max_wait_ms)
    }

    pub fn capture_settle(&self) -> Duration {
        Duration::from_millis(self.capture_settle_ms)
    }

    pub fn single_settle(&self) -> Duration {
        Duration::from_millis(self.single_settle_ms)
    }

    /// Absolute URL of a post. Already-absolute URLs pass through.
    pub fn post_url(&self, post_url: &str) -> String {
        if post_url.starts_with("http://") || post_url.starts_with("https://") {
            return post_url.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if post_url.starts_with('/') {
            format!("{base}{post_url}")
        } else {
            format!("{base}/{post_url}")
        }
    }

    /// URL of a carousel post showing item `index` (1-based).
    ///
    /// Any index already present on the post URL is replaced; the rest of
    /// the query and the fragment are kept.
    pub fn indexed_url(&self, post_url: &str, index: u32) -> String {
        let base = self.post_url(post_url);
        let Ok(mut url) = Url::parse(&base) else {
            let sep = if base.contains('?') { '&' } else { '?' };
            return format!("{base}{sep}{}={index}", self.index_param);
        };
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != self.index_param.as_str())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(&self.index_param, &index.to_string());
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_join_onto_base() {
        let cfg = ResolverConfig::default();
        assert_eq!(cfg.post_url("/p/abc/"), "https://www.instagram.com/p/abc/");
        assert_eq!(cfg.post_url("p/abc/"), "https://www.instagram.com/p/abc/");
        assert_eq!(
            cfg.post_url("https://other.example/p/x/"),
            "https://other.example/p/x/"
        );
    }

    #[test]
    fn indexed_url_appends_param() {
        let cfg = ResolverConfig::default();
        assert_eq!(
            cfg.indexed_url("/p/abc/", 3),
            "https://www.instagram.com/p/abc/?img_index=3"
        );
        assert_eq!(
            cfg.indexed_url("https://x.example/p/abc/?hl=en", 2),
            "https://x.example/p/abc/?hl=en&img_index=2"
        );
    }

    #[test]
    fn indexed_url_keeps_fragment_after_query() {
        let cfg = ResolverConfig::default();
        assert_eq!(
            cfg.indexed_url("https://x.example/p/abc/#comments", 2),
            "https://x.example/p/abc/?img_index=2#comments"
        );
    }

    #[test]
    fn indexed_url_replaces_existing_index() {
        let cfg = ResolverConfig::default();
        assert_eq!(
            cfg.indexed_url("/p/abc/?img_index=1&hl=en", 4),
            "https://www.instagram.com/p/abc/?hl=en&img_index=4"
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: ResolverConfig = serde_json::from_str(r#"{"redirect_threshold":3}"#).unwrap();
        assert_eq!(cfg.redirect_threshold, 3);
        assert_eq!(cfg.capture_max_wait_ms, 7_000);
    }
}
