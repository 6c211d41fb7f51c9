//! One-shot resolution for single-image and reel posts.

use tracing::{debug, info, warn};

use crate::capability::{BrowserPage, WaitCondition};
use crate::capture::CaptureWindow;
use crate::config::ResolverConfig;
use crate::extractor;
use crate::registry::DedupRegistry;
use crate::types::{Post, ResolvedMedia};

/// Resolve a non-carousel post to its media asset.
///
/// The first eligible request of the matching type wins. Returns `None`
/// when nothing matched or the page could not be loaded; neither is an error.
pub async fn resolve_single(
    page: &mut dyn BrowserPage,
    post: &Post,
    config: &ResolverConfig,
    registry: &mut DedupRegistry,
) -> Option<ResolvedMedia> {
    let post_url = config.post_url(&post.url);

    let mut window = match CaptureWindow::open(&*page).await {
        Ok(w) => w,
        Err(e) => {
            warn!("Cannot observe requests for {post_url}: {e}");
            return None;
        }
    };

    if let Err(e) = page
        .navigate(&post_url, WaitCondition::NetworkIdle, config.navigation_timeout())
        .await
    {
        warn!("Failed to navigate to {post_url}: {e}");
        return None;
    }

    let kind = post.kind;
    let reg: &DedupRegistry = registry;
    let classify = |url: &str| extractor::classify(url, kind, reg);
    window.settle(config.single_settle(), classify).await;
    window.drain(classify);
    let observed = window.observed();
    let chosen = window.close().into_iter().next();

    let Some(chosen) = chosen else {
        debug!("No {kind} media among {observed} requests for {post_url}");
        return None;
    };

    registry.claim(&chosen);
    info!("Resolved {kind} post {post_url}: {}", chosen.signature);
    Some(ResolvedMedia {
        link: chosen.url,
        kind,
        img_index: None,
        post_url,
    })
}
