// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-backed capability using chromiumoxide.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, Headers, SetExtraHttpHeadersParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use feedvault::{Browser, BrowserCookie, BrowserPage, CapabilityError, RequestStream, WaitCondition};

use super::find_chromium;
use crate::config::RuntimeConfig;

/// Gap without outgoing requests after which the network counts as idle.
const NETWORK_QUIET: Duration = Duration::from_millis(500);

/// Consume events until none arrives for `quiet`, or the stream ends.
async fn wait_for_quiet<S>(events: &mut S, quiet: Duration)
where
    S: futures::Stream + Unpin,
{
    while let Ok(Some(_)) = tokio::time::timeout(quiet, events.next()).await {}
}

/// Headless Chromium instance driven over CDP.
pub struct ChromiumBrowser {
    browser: Mutex<CdpBrowser>,
    handler: JoinHandle<()>,
    user_agent: String,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumBrowser {
    /// Launch Chromium with the configured binary and mode.
    pub async fn launch(config: &RuntimeConfig) -> Result<Self> {
        let chrome_path = find_chromium(config.chromium_path.as_ref())
            .context("Chromium not found. Set FEEDVAULT_CHROMIUM_PATH or install Chrome.")?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        builder = if config.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let browser_config = builder
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = CdpBrowser::launch(browser_config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            user_agent: config.user_agent.clone(),
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of open pages.
    pub fn active_pages(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>, CapabilityError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("failed to create page: {e}")))?;

        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("failed to set user agent: {e}")))?;
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::json!({ "Accept-Language": "en-US,en;q=0.9" }),
        )))
        .await
        .map_err(|e| CapabilityError::Unavailable(format!("failed to set headers: {e}")))?;
        page.execute(EnableParams::default())
            .await
            .map_err(|e| CapabilityError::Intercept(format!("failed to enable network domain: {e}")))?;

        self.active_count.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(ChromiumPage {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<(), CapabilityError> {
        let mut browser = self.browser.lock().await;
        let result = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| CapabilityError::Unavailable(format!("failed to close browser: {e}")));
        let _ = browser.wait().await;
        self.handler.abort();
        result
    }
}

/// A single Chromium tab.
pub struct ChromiumPage {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), CapabilityError> {
        let start = Instant::now();
        let timeout_ms = timeout.as_millis() as u64;

        let load = async {
            let mut requests = match wait {
                WaitCondition::NetworkIdle => Some(Box::pin(
                    self.page.event_listener::<EventRequestWillBeSent>().await?,
                )),
                WaitCondition::Load => None,
            };
            self.page.goto(url).await?;
            if let Some(requests) = requests.as_mut() {
                wait_for_quiet(requests, NETWORK_QUIET).await;
            }
            Ok::<_, chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(timeout, load).await {
            Ok(Ok(())) => {
                debug!("Loaded {url} in {}ms", start.elapsed().as_millis());
                Ok(())
            }
            Ok(Err(e)) => Err(CapabilityError::Navigation(e.to_string())),
            Err(_) => Err(CapabilityError::NavigationTimeout(timeout_ms)),
        }
    }

    async fn subscribe_requests(&self) -> Result<RequestStream, CapabilityError> {
        let events = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| CapabilityError::Intercept(e.to_string()))?;
        Ok(Box::pin(events.map(|ev| ev.request.url.clone())))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, CapabilityError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| CapabilityError::Evaluate(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| CapabilityError::Evaluate(format!("failed to convert JS result: {e:?}")))
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>, CapabilityError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| CapabilityError::Evaluate(format!("failed to read cookies: {e}")))?;
        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
            })
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<(), CapabilityError> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}
