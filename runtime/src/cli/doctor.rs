// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.

use anyhow::Result;
use feedvault::MediaStore;

use crate::config::RuntimeConfig;
use crate::renderer::find_chromium;
use crate::storage::SqliteMediaStore;

/// Check Chromium availability, the media store and the posts file.
pub async fn run(config: &RuntimeConfig) -> Result<()> {
    println!("Feedvault Doctor");
    println!("================");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let chromium = find_chromium(config.chromium_path.as_ref());
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Set FEEDVAULT_CHROMIUM_PATH or install Chrome."),
    }

    let store_ok = match SqliteMediaStore::open(&config.db_path) {
        Ok(store) => {
            let count = store.list().map(|items| items.len()).unwrap_or(0);
            println!(
                "[OK] Media store: {} ({count} entries)",
                config.db_path.display()
            );
            true
        }
        Err(e) => {
            println!("[!!] Media store unusable: {e:#}");
            false
        }
    };

    match crate::posts::load(&config.posts_path) {
        Ok(list) => println!(
            "[OK] Posts file: {} ({} posts)",
            config.posts_path.display(),
            list.len()
        ),
        Err(e) => println!("[??] Posts file: {e:#}"),
    }

    println!();
    if chromium.is_some() && store_ok {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
