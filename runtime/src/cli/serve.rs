// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run the HTTP API until interrupted.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::RuntimeConfig;
use crate::proxy::MediaFetcher;
use crate::rest::{self, AppState};

pub async fn run(config: &RuntimeConfig) -> Result<()> {
    let job = super::build_job(config)?;
    let state = Arc::new(AppState {
        job,
        fetcher: MediaFetcher::new(&config.user_agent)?,
        posts_path: config.posts_path.clone(),
    });

    info!(
        "Feedvault v{} serving media from {}",
        env!("CARGO_PKG_VERSION"),
        config.db_path.display()
    );

    tokio::select! {
        result = rest::start(config.http_port, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
