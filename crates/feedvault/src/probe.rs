//! In-page probes: small scripts evaluated against the rendered post.

use url::Url;

use crate::capability::BrowserPage;
use crate::types::{HarvestError, HarvestResult};

/// True when the carousel list contains a `<video>` element.
///
/// Video sources are usually `blob:` URLs, so presence of the element is
/// what counts, not its `src`.
pub const VIDEO_PROBE_SCRIPT: &str = r#"(() => {
    const items = document.querySelectorAll('ul._acay > li');
    for (const li of items) {
        if (li.querySelector('video')) return true;
    }
    return false;
})()"#;

/// The page's live location.
pub const LOCATION_SCRIPT: &str = "window.location.href";

/// Carousel index a location displays. Missing or unparsable means 1.
pub fn displayed_index(href: &str, param: &str) -> u32 {
    Url::parse(href)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == param)
                .and_then(|(_, v)| v.trim().parse::<u32>().ok())
        })
        .filter(|i| *i > 0)
        .unwrap_or(1)
}

/// Whether the rendered carousel shows a video.
pub async fn has_video(page: &dyn BrowserPage) -> HarvestResult<bool> {
    let value = page
        .evaluate(VIDEO_PROBE_SCRIPT)
        .await
        .map_err(|e| HarvestError::Evaluate(e.to_string()))?;
    Ok(value.as_bool().unwrap_or(false))
}

/// The carousel index the page currently displays.
pub async fn current_index(page: &dyn BrowserPage, param: &str) -> HarvestResult<u32> {
    let value = page
        .evaluate(LOCATION_SCRIPT)
        .await
        .map_err(|e| HarvestError::Evaluate(e.to_string()))?;
    let href = value
        .as_str()
        .ok_or_else(|| HarvestError::Evaluate(format!("location is not a string: {value}")))?;
    Ok(displayed_index(href, param))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_from_query() {
        assert_eq!(
            displayed_index("https://www.instagram.com/p/abc/?img_index=3", "img_index"),
            3
        );
    }

    #[test]
    fn index_defaults_to_one() {
        assert_eq!(displayed_index("https://www.instagram.com/p/abc/", "img_index"), 1);
        assert_eq!(
            displayed_index("https://www.instagram.com/p/abc/?img_index=x", "img_index"),
            1
        );
        assert_eq!(
            displayed_index("https://www.instagram.com/p/abc/?img_index=0", "img_index"),
            1
        );
        assert_eq!(displayed_index("about:blank", "img_index"), 1);
    }
}
