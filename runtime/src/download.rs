// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bulk download of the stored media set to a local directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use feedvault::{filename_signature, StoredMedia};

use crate::proxy::MediaFetcher;

#[derive(Debug, Default, Clone, Serialize)]
pub struct DownloadSummary {
    pub saved: Vec<PathBuf>,
    pub failed: usize,
    pub skipped: usize,
}

/// Save every entry under its filename signature.
///
/// A failed entry is logged and counted; the rest still download.
pub async fn download_all(
    fetcher: &MediaFetcher,
    media: &[StoredMedia],
    out_dir: &Path,
) -> Result<DownloadSummary> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;

    let mut summary = DownloadSummary::default();
    for item in media {
        let Some(name) = filename_signature(&item.media.link) else {
            warn!("No filename in link, skipping: {}", item.media.link);
            summary.skipped += 1;
            continue;
        };
        let path = out_dir.join(&name);
        let part = part_path(&path);
        match save(fetcher, &item.media.link, &part, &path).await {
            Ok(bytes) => {
                info!("Downloaded {name} ({bytes} bytes)");
                summary.saved.push(path);
            }
            Err(e) => {
                warn!("Failed to download {name}: {e:#}");
                let _ = tokio::fs::remove_file(&part).await;
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// `<name>.part` next to the final file.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Stream into `part`, then move it over `path`. An existing file at
/// `path` is only replaced by a complete download.
async fn save(fetcher: &MediaFetcher, link: &str, part: &Path, path: &Path) -> Result<u64> {
    let response = fetcher.fetch(link).await?;
    let mut file = tokio::fs::File::create(part)
        .await
        .with_context(|| format!("failed to create {}", part.display()))?;

    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("media stream interrupted")?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);
    tokio::fs::rename(part, path)
        .await
        .with_context(|| format!("failed to move download into place: {}", path.display()))?;
    Ok(written)
}
