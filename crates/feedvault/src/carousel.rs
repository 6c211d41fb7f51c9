//! Carousel page walker.
//!
//! Carousels have no advertised length and the site answers out-of-range
//! indices by silently showing item 1, so the walk steps through
//! `index = 1, 2, 3, ...` and infers the end from what the page does:
//!
//! - navigation failure ends the walk;
//! - a window with no usable candidate (and no redirect) ends the walk;
//! - landing on item 1 after asking for a later one is a silent redirect.
//!   The same index is retried until `redirect_threshold` consecutive
//!   redirects, which ends the walk.
//!
//! Items emitted before the walk ends are always kept.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capability::{BrowserPage, WaitCondition};
use crate::capture::CaptureWindow;
use crate::config::ResolverConfig;
use crate::extractor;
use crate::probe;
use crate::registry::DedupRegistry;
use crate::types::{ObservedRequest, Post, PostKind, ResolvedMedia};

/// Why a carousel walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum WalkEnd {
    /// Navigating to `index` failed.
    NavigationFailed { index: u32 },
    /// The request stream could not be opened for `index`.
    CaptureUnavailable { index: u32 },
    /// `index` produced no usable candidate and was not a redirect.
    Exhausted { index: u32 },
    /// Too many consecutive silent redirects while asking for `index`.
    RedirectLimit { index: u32 },
}

/// Result of walking one carousel post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarouselWalk {
    pub media: Vec<ResolvedMedia>,
    pub end: WalkEnd,
    /// Navigations performed, retries included.
    pub steps: u32,
}

/// Outcome of one capture step.
enum Step {
    Selected(ObservedRequest),
    Empty,
}

/// Walk a carousel post item by item.
pub async fn walk_carousel(
    page: &mut dyn BrowserPage,
    post: &Post,
    config: &ResolverConfig,
    registry: &mut DedupRegistry,
) -> CarouselWalk {
    let post_url = config.post_url(&post.url);
    let mut media = Vec::new();
    let mut index: u32 = 1;
    let mut redirects: u32 = 0;
    let mut steps: u32 = 0;

    let end = loop {
        let target = config.indexed_url(&post.url, index);
        debug!("Trying {target}");

        let mut window = match CaptureWindow::open(&*page).await {
            Ok(w) => w,
            Err(e) => {
                warn!("Cannot observe requests for {target}: {e}");
                break WalkEnd::CaptureUnavailable { index };
            }
        };

        steps += 1;
        if let Err(e) = page
            .navigate(&target, WaitCondition::NetworkIdle, config.navigation_timeout())
            .await
        {
            warn!("Failed to navigate to {target}: {e}");
            break WalkEnd::NavigationFailed { index };
        }

        {
            let reg: &DedupRegistry = registry;
            let classify = |url: &str| extractor::classify(url, PostKind::Carousel, reg);
            window
                .collect_until_first(config.capture_max_wait(), classify)
                .await;
            window.settle(config.capture_settle(), classify).await;
            window.drain(classify);
        }
        let candidates = window.close();

        let step = select(&*page, candidates, index).await;
        if let Step::Selected(ref chosen) = step {
            registry.claim(chosen);
        }

        let landed = match probe::current_index(&*page, &config.index_param).await {
            Ok(i) => i,
            Err(e) => {
                warn!("Cannot read displayed index for {target}: {e}");
                index
            }
        };

        if index > 1 && landed == 1 {
            redirects += 1;
            warn!(
                "Silent redirect: asked for {} {index}, page shows 1 ({redirects}/{})",
                config.index_param, config.redirect_threshold
            );
            if redirects >= config.redirect_threshold {
                break WalkEnd::RedirectLimit { index };
            }
            continue;
        }
        redirects = 0;

        match step {
            Step::Selected(chosen) => {
                info!("Resolved {post_url} item {index}: {}", chosen.signature);
                media.push(ResolvedMedia {
                    link: chosen.url,
                    kind: PostKind::Carousel,
                    img_index: Some(index),
                    post_url: post_url.clone(),
                });
                index += 1;
            }
            Step::Empty => {
                debug!("No media at item {index} of {post_url}, carousel ends");
                break WalkEnd::Exhausted { index };
            }
        }
    };

    info!(
        "Carousel {post_url}: {} item(s), ended with {end:?}",
        media.len()
    );
    CarouselWalk { media, end, steps }
}

/// Pick the window's asset, letting the DOM decide between video and image
/// when both kinds were observed.
async fn select(page: &dyn BrowserPage, candidates: Vec<ObservedRequest>, index: u32) -> Step {
    if candidates.is_empty() {
        return Step::Empty;
    }

    let video = match probe::has_video(page).await {
        Ok(v) => v,
        Err(e) => {
            warn!("Video probe failed at item {index}: {e}");
            false
        }
    };

    candidates
        .into_iter()
        .find(|c| {
            if video {
                c.content_hint.is_video()
            } else {
                c.content_hint.is_image()
            }
        })
        .map_or(Step::Empty, Step::Selected)
}
