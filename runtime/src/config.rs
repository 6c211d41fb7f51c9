// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration.
//!
//! Every setting resolves in the same order: explicit CLI flag, then the
//! matching `FEEDVAULT_*` environment variable, then a default under
//! `~/.feedvault/`.

use feedvault::ResolverConfig;
use std::path::PathBuf;

/// Default HTTP port for `feedvault serve`.
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Desktop Chrome user agent sent by the harvest browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db: Option<String>,
    pub posts: Option<String>,
    pub http_port: Option<u16>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
    pub posts_path: PathBuf,
    pub chromium_path: Option<PathBuf>,
    pub http_port: u16,
    pub headless: bool,
    pub user_agent: String,
    pub resolver: ResolverConfig,
}

impl RuntimeConfig {
    /// Resolve from CLI overrides and the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Self {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with<F>(overrides: &ConfigOverrides, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = overrides
            .db
            .clone()
            .or_else(|| env("FEEDVAULT_DB"))
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("media.db"));

        let posts_path = overrides
            .posts
            .clone()
            .or_else(|| env("FEEDVAULT_POSTS"))
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("posts.json"));

        let http_port = overrides
            .http_port
            .or_else(|| env("FEEDVAULT_HTTP_PORT").and_then(|v| v.trim().parse().ok()))
            .unwrap_or(DEFAULT_HTTP_PORT);

        let headless = env("FEEDVAULT_HEADLESS")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        let mut resolver = ResolverConfig::default();
        if let Some(base) = env("FEEDVAULT_BASE_URL") {
            resolver.base_url = base.trim().trim_end_matches('/').to_string();
        }
        let millis = |key: &str| env(key).and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(ms) = millis("FEEDVAULT_NAV_TIMEOUT_MS") {
            resolver.navigation_timeout_ms = ms;
        }
        if let Some(ms) = millis("FEEDVAULT_CAPTURE_WAIT_MS") {
            resolver.capture_max_wait_ms = ms;
        }
        if let Some(ms) = millis("FEEDVAULT_CAPTURE_SETTLE_MS") {
            resolver.capture_settle_ms = ms;
        }
        if let Some(ms) = millis("FEEDVAULT_SINGLE_SETTLE_MS") {
            resolver.single_settle_ms = ms;
        }

        Self {
            db_path,
            posts_path,
            chromium_path: env("FEEDVAULT_CHROMIUM_PATH").map(PathBuf::from),
            http_port,
            headless,
            user_agent: env("FEEDVAULT_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            resolver,
        }
    }
}

/// `~/.feedvault`, or `/tmp/.feedvault` without a home directory.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".feedvault")
}
