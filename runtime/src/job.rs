// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Harvest job: one browser session per run, at most one run at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use feedvault::{
    Browser, HarvestReport, MediaStore, Orchestrator, Post, ResolverConfig, WaitCondition,
};

use crate::config::RuntimeConfig;
use crate::renderer::chromium::ChromiumBrowser;

/// Cookies that mark a logged-in session.
pub const SESSION_COOKIES: &[&str] = &["sessionid", "ds_user_id"];

/// Starts a browser for one harvest run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>>;
}

/// Launches Chromium with the runtime settings.
pub struct ChromiumLauncher {
    config: RuntimeConfig,
}

impl ChromiumLauncher {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>> {
        let browser = ChromiumBrowser::launch(&self.config).await?;
        Ok(Box::new(browser))
    }
}

/// Outcome of the most recent run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    Running,
    Completed { report: HarvestReport },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub posts: usize,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub running: bool,
    pub last_run: Option<RunStatus>,
}

/// Returned when a run is requested while another one is in progress.
#[derive(Debug, thiserror::Error)]
#[error("a harvest is already running")]
pub struct JobBusy;

/// Clears the running flag when the run ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Shared harvest runner used by the CLI and the HTTP API.
pub struct HarvestJob {
    resolver: ResolverConfig,
    launcher: Arc<dyn BrowserLauncher>,
    store: Arc<dyn MediaStore>,
    running: AtomicBool,
    last_run: RwLock<Option<RunStatus>>,
}

impl HarvestJob {
    pub fn new(
        resolver: ResolverConfig,
        launcher: Arc<dyn BrowserLauncher>,
        store: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            resolver,
            launcher,
            store,
            running: AtomicBool::new(false),
            last_run: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> JobStatus {
        JobStatus {
            running: self.is_running(),
            last_run: self.last_run.read().await.clone(),
        }
    }

    /// Start a run in the background.
    pub async fn trigger(self: &Arc<Self>, posts: Vec<Post>) -> Result<(), JobBusy> {
        self.acquire()?;
        self.mark_started(posts.len()).await;

        let job = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = RunningGuard(&job.running);
            let result = job.session(&posts).await;
            job.mark_finished(&result).await;
        });
        Ok(())
    }

    /// Run to completion on the current task.
    pub async fn run(&self, posts: &[Post]) -> Result<HarvestReport> {
        self.acquire()?;
        let _guard = RunningGuard(&self.running);
        self.mark_started(posts.len()).await;
        let result = self.session(posts).await;
        self.mark_finished(&result).await;
        result
    }

    fn acquire(&self) -> Result<(), JobBusy> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| JobBusy)
    }

    async fn mark_started(&self, posts: usize) {
        *self.last_run.write().await = Some(RunStatus {
            started_at: Utc::now(),
            finished_at: None,
            posts,
            outcome: RunOutcome::Running,
        });
    }

    async fn mark_finished(&self, result: &Result<HarvestReport>) {
        let outcome = match result {
            Ok(report) => RunOutcome::Completed {
                report: report.clone(),
            },
            Err(e) => RunOutcome::Failed {
                message: format!("{e:#}"),
            },
        };
        if let Some(status) = self.last_run.write().await.as_mut() {
            status.finished_at = Some(Utc::now());
            status.outcome = outcome;
        }
    }

    /// Launch, resolve, persist, shut down. The browser is shut down on
    /// every path once it has started.
    async fn session(&self, posts: &[Post]) -> Result<HarvestReport> {
        info!("Starting harvest of {} post(s)", posts.len());
        let browser = self
            .launcher
            .launch()
            .await
            .context("failed to start the browser")?;

        check_session(browser.as_ref(), &self.resolver).await;

        let result = Orchestrator::new(self.resolver.clone())
            .run(browser.as_ref(), posts, self.store.as_ref())
            .await
            .context("harvest failed");

        if let Err(e) = browser.shutdown().await {
            warn!("Browser shutdown failed: {e}");
        }

        match &result {
            Ok(report) => info!(
                "Harvest finished: {} media from {} post(s) in {}ms",
                report.resolved, report.posts, report.elapsed_ms
            ),
            Err(e) => error!("{e:#}"),
        }
        result
    }
}

/// Warn when the browser profile carries no logged-in session.
///
/// Never fails the run: logged-out pages still serve public posts.
async fn check_session(browser: &dyn Browser, config: &ResolverConfig) {
    let mut page = match browser.open_page().await {
        Ok(page) => page,
        Err(e) => {
            warn!("Session check skipped: {e}");
            return;
        }
    };
    let timeout = Duration::from_millis(config.navigation_timeout_ms);
    match page
        .navigate(&config.base_url, WaitCondition::Load, timeout)
        .await
    {
        Ok(()) => match page.cookies().await {
            Ok(cookies) => {
                if has_session(cookies.iter().map(|c| c.name.as_str())) {
                    info!("Logged-in session found");
                } else {
                    warn!("No logged-in session; private or age-gated posts will resolve to nothing");
                }
            }
            Err(e) => warn!("Session check skipped: {e}"),
        },
        Err(e) => warn!("Session check skipped: {e}"),
    }
    if let Err(e) = page.close().await {
        warn!("Failed to close page: {e}");
    }
}

pub fn has_session<'a>(mut names: impl Iterator<Item = &'a str>) -> bool {
    names.any(|n| SESSION_COOKIES.contains(&n))
}
