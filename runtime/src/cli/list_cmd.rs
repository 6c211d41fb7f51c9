// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Print the stored media set.

use anyhow::Result;

use crate::config::RuntimeConfig;

pub async fn run(config: &RuntimeConfig, json: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let items = store.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("No media stored.");
        return Ok(());
    }
    for item in &items {
        let index = item
            .media
            .img_index
            .map(|i| format!("#{i}"))
            .unwrap_or_default();
        println!(
            "{:>5}  {:<8} {}{}  {}",
            item.id, item.media.kind, item.media.post_url, index, item.media.link
        );
    }
    println!("{} entries", items.len());
    Ok(())
}
