// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Foreground harvest run.

use anyhow::Result;

use crate::config::RuntimeConfig;
use crate::posts;

/// Resolve every post in the posts file and persist the result.
pub async fn run(config: &RuntimeConfig) -> Result<()> {
    let list = posts::load(&config.posts_path)?;
    posts::validate(&list)?;

    let job = super::build_job(config)?;
    let report = job.run(&list).await?;

    println!(
        "Resolved {} media from {} post(s) ({} without media) in {:.1}s",
        report.resolved,
        report.posts,
        report.empty_posts,
        report.elapsed_ms as f64 / 1000.0
    );
    if report.persisted == 0 {
        println!("Nothing stored; previous media set kept.");
    } else {
        println!("Stored {} entries in {}", report.persisted, config.db_path.display());
    }
    Ok(())
}
