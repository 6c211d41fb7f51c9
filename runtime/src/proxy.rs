// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fetching stored media links from the CDN.
//!
//! CDN video links carry `bytestart`/`byteend` range parameters from the
//! segment request they were captured on. Both are removed so the whole
//! asset is returned.

use std::time::Duration;

use reqwest::Client;
use url::Url;

/// Query parameters that pin a link to one byte range.
pub const BYTE_RANGE_PARAMS: &[&str] = &["bytestart", "byteend"];

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid media link: {0}")]
    InvalidLink(String),

    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),
}

/// Remove byte-range parameters, keeping every other parameter in order.
pub fn clean_media_url(link: &str) -> Result<Url, ProxyError> {
    let mut url = Url::parse(link).map_err(|e| ProxyError::InvalidLink(format!("{link}: {e}")))?;
    let total = url.query_pairs().count();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !BYTE_RANGE_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.len() == total {
        return Ok(url);
    }
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    Ok(url)
}

/// HTTP client for CDN media.
#[derive(Clone)]
pub struct MediaFetcher {
    client: Client,
}

impl MediaFetcher {
    pub fn new(user_agent: &str) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// GET the cleaned link. Non-success statuses are errors.
    pub async fn fetch(&self, link: &str) -> Result<reqwest::Response, ProxyError> {
        let url = clean_media_url(link)?;
        tracing::debug!("Fetching media: {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Status(status.as_u16()));
        }
        Ok(response)
    }
}
