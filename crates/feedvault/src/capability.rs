//! Browser capability abstraction.
//!
//! Defines the `Browser` and `BrowserPage` traits the engine drives. The
//! runtime implements them over Chromium; tests implement them with
//! scripted pages.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

/// Outgoing request URLs observed on a page, in the order the browser sent them.
///
/// Dropping the stream unsubscribes from the page.
pub type RequestStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    /// The load event fired.
    Load,
    /// The load event fired and the network went quiet.
    NetworkIdle,
}

/// A cookie held by the browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Failures reported by a capability provider.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("browser unavailable: {0}")]
    Unavailable(String),

    #[error("navigation timed out after {0}ms")]
    NavigationTimeout(u64),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("request interception failed: {0}")]
    Intercept(String),

    #[error("evaluation failed: {0}")]
    Evaluate(String),
}

/// A browser engine that can open pages.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new page (tab). Failure here is fatal for a harvest session.
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>, CapabilityError>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<(), CapabilityError>;
}

/// A single page the engine navigates and observes.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate to a URL, bounded by `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), CapabilityError>;

    /// Start observing outgoing requests. Requests sent before the call are not seen.
    async fn subscribe_requests(&self) -> Result<RequestStream, CapabilityError>;

    /// Run a JavaScript expression in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, CapabilityError>;

    /// Cookies visible to the page.
    async fn cookies(&self) -> Result<Vec<BrowserCookie>, CapabilityError>;

    /// Close the page.
    async fn close(self: Box<Self>) -> Result<(), CapabilityError>;
}
