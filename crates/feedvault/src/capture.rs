//! Capture windows: bounded intervals of request observation.
//!
//! A window subscribes to the page's outgoing requests when opened and
//! unsubscribes when closed or dropped, so no subscription outlives the
//! post (or carousel index) it was opened for.

use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tokio::time::Instant;

use crate::capability::{BrowserPage, CapabilityError, RequestStream};
use crate::extractor::Rejection;
use crate::types::ObservedRequest;

/// Accepted candidates a single window holds; later ones are only counted.
pub const MAX_CANDIDATES: usize = 64;

/// An open capture window and the candidates it has accepted so far.
pub struct CaptureWindow {
    stream: Option<RequestStream>,
    candidates: Vec<ObservedRequest>,
    observed: usize,
}

impl CaptureWindow {
    /// Subscribe to the page's outgoing requests.
    pub async fn open(page: &dyn BrowserPage) -> Result<Self, CapabilityError> {
        let stream = page.subscribe_requests().await?;
        Ok(Self {
            stream: Some(stream),
            candidates: Vec::new(),
            observed: 0,
        })
    }

    /// Collect until the first candidate is accepted or `max_wait` elapses.
    pub async fn collect_until_first<F>(&mut self, max_wait: Duration, mut classify: F)
    where
        F: FnMut(&str) -> Result<ObservedRequest, Rejection>,
    {
        let deadline = Instant::now() + max_wait;
        while self.candidates.is_empty() {
            if !self.next_before(deadline, &mut classify).await {
                break;
            }
        }
    }

    /// Keep collecting for `delay`.
    pub async fn settle<F>(&mut self, delay: Duration, mut classify: F)
    where
        F: FnMut(&str) -> Result<ObservedRequest, Rejection>,
    {
        let deadline = Instant::now() + delay;
        while self.next_before(deadline, &mut classify).await {}
    }

    /// Take whatever is already buffered without waiting.
    pub fn drain<F>(&mut self, mut classify: F)
    where
        F: FnMut(&str) -> Result<ObservedRequest, Rejection>,
    {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        while let Some(Some(url)) = stream.next().now_or_never() {
            self.observed += 1;
            Self::offer(&mut self.candidates, &url, &mut classify);
        }
    }

    /// Accepted candidates, in arrival order.
    pub fn candidates(&self) -> &[ObservedRequest] {
        &self.candidates
    }

    /// Requests seen so far, accepted or not.
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Unsubscribe and hand back the accepted candidates.
    pub fn close(mut self) -> Vec<ObservedRequest> {
        self.stream.take();
        std::mem::take(&mut self.candidates)
    }

    /// Wait for one request until `deadline`. Returns false when the
    /// deadline passed or the stream ended.
    async fn next_before<F>(&mut self, deadline: Instant, classify: &mut F) -> bool
    where
        F: FnMut(&str) -> Result<ObservedRequest, Rejection>,
    {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(Some(url)) => {
                self.observed += 1;
                Self::offer(&mut self.candidates, &url, classify);
                true
            }
            Ok(None) | Err(_) => false,
        }
    }

    fn offer<F>(candidates: &mut Vec<ObservedRequest>, url: &str, classify: &mut F)
    where
        F: FnMut(&str) -> Result<ObservedRequest, Rejection>,
    {
        match classify(url) {
            Ok(req) if candidates.len() >= MAX_CANDIDATES => {
                tracing::debug!("Candidate buffer full, dropped {}", req.signature);
            }
            Ok(req) => {
                tracing::debug!("Candidate #{}: {}", candidates.len() + 1, req.signature);
                candidates.push(req);
            }
            Err(Rejection::NotMedia) => {}
            Err(reason) => tracing::debug!("Skipped {url}: {reason}"),
        }
    }
}
