// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Loading the ordered post list produced by link discovery.

use anyhow::{Context, Result};
use feedvault::{HarvestError, HarvestResult, Post};
use std::path::Path;

/// Read a JSON array of `{"url", "type"}` entries.
pub fn load(path: &Path) -> Result<Vec<Post>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read posts file: {}", path.display()))?;
    parse(&raw).with_context(|| format!("invalid posts file: {}", path.display()))
}

/// Parse a post list, dropping entries with an empty url.
pub fn parse(raw: &str) -> Result<Vec<Post>> {
    let posts: Vec<Post> = serde_json::from_str(raw)?;
    let total = posts.len();
    let posts: Vec<Post> = posts
        .into_iter()
        .filter(|p| !p.url.trim().is_empty())
        .collect();
    if posts.len() < total {
        tracing::warn!("Skipped {} post(s) without a url", total - posts.len());
    }
    Ok(posts)
}

/// Reject a list the harvest loop cannot use.
pub fn validate(posts: &[Post]) -> HarvestResult<()> {
    if posts.is_empty() {
        return Err(HarvestError::InvalidPost("no posts to harvest".to_string()));
    }
    if let Some(i) = posts.iter().position(|p| p.url.trim().is_empty()) {
        return Err(HarvestError::InvalidPost(format!("post {} has no url", i + 1)));
    }
    Ok(())
}
