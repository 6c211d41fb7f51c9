// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Download the stored media set to a directory.

use std::path::Path;

use anyhow::{bail, Result};

use crate::config::RuntimeConfig;
use crate::download::download_all;
use crate::proxy::MediaFetcher;

pub async fn run(config: &RuntimeConfig, out_dir: &Path) -> Result<()> {
    let store = super::open_store(config)?;
    let items = store.list()?;
    if items.is_empty() {
        bail!("no media stored; run `feedvault harvest` first");
    }

    let fetcher = MediaFetcher::new(&config.user_agent)?;
    let summary = download_all(&fetcher, &items, out_dir).await?;
    println!(
        "Downloaded {} of {} to {} ({} failed, {} skipped)",
        summary.saved.len(),
        items.len(),
        out_dir.display(),
        summary.failed,
        summary.skipped
    );
    Ok(())
}
