// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! Browser capability for the harvest engine.
//!
//! Implements the engine's `Browser`/`BrowserPage` traits over Chromium
//! (chromiumoxide) and locates the Chromium binary.

pub mod chromium;

use std::path::PathBuf;

/// Find the Chromium binary path.
///
/// Checks, in order: the configured path, `FEEDVAULT_CHROMIUM_PATH`,
/// `~/.feedvault/chromium/`, then the system PATH.
pub fn find_chromium(configured: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Ok(p) = std::env::var("FEEDVAULT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".feedvault/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".feedvault/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".feedvault/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".feedvault/chromium/chrome-linux64/chrome"),
                home.join(".feedvault/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_path_wins_when_it_exists() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("chrome");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(find_chromium(Some(&fake)), Some(fake));
    }

    #[test]
    fn missing_configured_path_is_skipped() {
        let missing = PathBuf::from("/definitely/not/here/chrome");
        assert_ne!(find_chromium(Some(&missing)), Some(missing));
    }
}
