// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the Feedvault binary.

pub mod doctor;
pub mod download_cmd;
pub mod harvest_cmd;
pub mod list_cmd;
pub mod serve;

use std::sync::Arc;

use anyhow::Result;
use feedvault::MediaStore;

use crate::config::RuntimeConfig;
use crate::job::{ChromiumLauncher, HarvestJob};
use crate::storage::SqliteMediaStore;

/// Open the configured store.
pub fn open_store(config: &RuntimeConfig) -> Result<Arc<dyn MediaStore>> {
    Ok(Arc::new(SqliteMediaStore::open(&config.db_path)?))
}

/// Harvest job wired to Chromium and the configured store.
pub fn build_job(config: &RuntimeConfig) -> Result<Arc<HarvestJob>> {
    let store = open_store(config)?;
    let launcher = Arc::new(ChromiumLauncher::new(config.clone()));
    Ok(Arc::new(HarvestJob::new(
        config.resolver.clone(),
        launcher,
        store,
    )))
}
