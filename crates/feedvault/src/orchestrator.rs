//! Resolution orchestrator: one harvest session over an ordered post list.

use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::capability::{Browser, BrowserPage};
use crate::carousel::walk_carousel;
use crate::config::ResolverConfig;
use crate::persistence::MediaStore;
use crate::registry::DedupRegistry;
use crate::single::resolve_single;
use crate::types::{HarvestResult, Post, PostKind, ResolvedMedia};

/// Summary of a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    pub posts: usize,
    pub resolved: usize,
    /// Posts that produced no media.
    pub empty_posts: usize,
    /// Entries written by persistence sync; 0 when it was skipped.
    pub persisted: usize,
    pub elapsed_ms: u64,
}

/// Owns the state of one harvest session.
///
/// Build a fresh orchestrator per run; the dedup registry it carries is
/// never shared between runs.
pub struct Orchestrator {
    config: ResolverConfig,
    registry: DedupRegistry,
}

impl Orchestrator {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            registry: DedupRegistry::new(),
        }
    }

    /// Resolve every post in order on one page.
    ///
    /// A post that fails or resolves to nothing never stops the loop.
    pub async fn resolve_all(
        &mut self,
        page: &mut dyn BrowserPage,
        posts: &[Post],
    ) -> Vec<ResolvedMedia> {
        self.registry.clear();
        let mut resolved = Vec::new();

        for (i, post) in posts.iter().enumerate() {
            info!(
                "Post {}/{}: {} ({})",
                i + 1,
                posts.len(),
                post.url,
                post.kind
            );
            match post.kind {
                PostKind::Carousel => {
                    let walk = walk_carousel(page, post, &self.config, &mut self.registry).await;
                    resolved.extend(walk.media);
                }
                PostKind::Image | PostKind::Reel => {
                    if let Some(media) =
                        resolve_single(page, post, &self.config, &mut self.registry).await
                    {
                        resolved.push(media);
                    }
                }
            }
        }

        resolved
    }

    /// Run a whole session: open a page, resolve, persist.
    ///
    /// Only a page that cannot be opened is an error, and then the store
    /// is never touched. An empty result is not persisted.
    pub async fn run(
        mut self,
        browser: &dyn Browser,
        posts: &[Post],
        store: &dyn MediaStore,
    ) -> HarvestResult<HarvestReport> {
        let started = Instant::now();
        let mut page = browser.open_page().await.map_err(|e| {
            error!("Cannot open a browser page: {e}");
            e
        })?;

        let resolved = self.resolve_all(page.as_mut(), posts).await;

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {e}");
        }

        let empty_posts = count_empty_posts(posts, &resolved, &self.config);
        let persisted = if resolved.is_empty() {
            info!("Nothing resolved from {} post(s); stored set left as is", posts.len());
            0
        } else {
            let n = store.replace_all(&resolved)?;
            info!("Stored {n} media entries");
            n
        };

        Ok(HarvestReport {
            posts: posts.len(),
            resolved: resolved.len(),
            empty_posts,
            persisted,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn count_empty_posts(posts: &[Post], resolved: &[ResolvedMedia], config: &ResolverConfig) -> usize {
    posts
        .iter()
        .filter(|p| {
            let url = config.post_url(&p.url);
            !resolved.iter().any(|m| m.post_url == url)
        })
        .count()
}
