// Copyright 2026 Feedvault Contributors
// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed store for the resolved media set.

use anyhow::{Context, Result};
use feedvault::{HarvestError, HarvestResult, MediaStore, PostKind, ResolvedMedia, StoredMedia};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// Resolved media persisted in a single `contents` table.
pub struct SqliteMediaStore {
    db: Mutex<Connection>,
}

impl SqliteMediaStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create data directory: {}", parent.display())
                })?;
            }
        }
        let db = Connection::open(path)
            .with_context(|| format!("failed to open media store: {}", path.display()))?;
        Self::init(db)
    }

    /// In-memory store, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("failed to open in-memory store")?)
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS contents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                seq INTEGER NOT NULL,
                link TEXT NOT NULL,
                type TEXT NOT NULL,
                post_url TEXT NOT NULL,
                img_index INTEGER,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS contents_seq ON contents(seq);",
        )
        .context("failed to create contents table")?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn conn(&self) -> HarvestResult<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| HarvestError::Storage("media store lock poisoned".to_string()))
    }
}

fn storage_err(e: rusqlite::Error) -> HarvestError {
    HarvestError::Storage(e.to_string())
}

fn row_to_media(row: &Row<'_>) -> rusqlite::Result<StoredMedia> {
    let kind: String = row.get(3)?;
    let kind = PostKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown media type: {kind}").into(),
        )
    })?;
    Ok(StoredMedia {
        id: row.get(0)?,
        seq: row.get(1)?,
        media: ResolvedMedia {
            link: row.get(2)?,
            kind,
            post_url: row.get(4)?,
            img_index: row.get(5)?,
        },
        created_at: row.get(6)?,
    })
}

const SELECT_COLUMNS: &str = "SELECT id, seq, link, type, post_url, img_index, created_at FROM contents";

impl MediaStore for SqliteMediaStore {
    fn replace_all(&self, media: &[ResolvedMedia]) -> HarvestResult<usize> {
        let mut db = self.conn()?;
        let tx = db.transaction().map_err(storage_err)?;
        tx.execute("DELETE FROM contents", []).map_err(storage_err)?;
        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO contents (seq, link, type, post_url, img_index)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(storage_err)?;
            for (seq, m) in media.iter().enumerate() {
                insert
                    .execute(params![
                        (seq as i64),
                        m.link,
                        m.kind.as_str(),
                        m.post_url,
                        m.img_index
                    ])
                    .map_err(storage_err)?;
            }
        }
        tx.commit().map_err(storage_err)?;
        Ok(media.len())
    }

    fn list(&self) -> HarvestResult<Vec<StoredMedia>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY seq ASC, id ASC"))
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], row_to_media)
            .map_err(storage_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err)?;
        Ok(rows)
    }

    fn get(&self, id: i64) -> HarvestResult<Option<StoredMedia>> {
        let db = self.conn()?;
        db.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id],
            row_to_media,
        )
        .optional()
        .map_err(storage_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(link: &str, kind: PostKind, idx: Option<u32>) -> ResolvedMedia {
        ResolvedMedia {
            link: link.to_string(),
            kind,
            img_index: idx,
            post_url: "https://www.instagram.com/p/x/".to_string(),
        }
    }

    #[test]
    fn replace_is_not_append() {
        let store = SqliteMediaStore::open_in_memory().unwrap();
        let a = media("https://cdn/a.jpg", PostKind::Image, None);
        let b = media("https://cdn/b.jpg", PostKind::Carousel, Some(1));
        let c = media("https://cdn/c.mp4", PostKind::Reel, None);

        assert_eq!(store.replace_all(&[a, b]).unwrap(), 2);
        assert_eq!(store.replace_all(&[c.clone()]).unwrap(), 1);

        let rows = store.list().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].media, c);
        assert_eq!(rows[0].seq, 0);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = SqliteMediaStore::open_in_memory().unwrap();
        let items: Vec<_> = ["z", "a", "m"]
            .iter()
            .enumerate()
            .map(|(i, n)| media(&format!("https://cdn/{n}.jpg"), PostKind::Carousel, Some(i as u32 + 1)))
            .collect();
        store.replace_all(&items).unwrap();

        let back: Vec<_> = store.list().unwrap().into_iter().map(|s| s.media).collect();
        assert_eq!(back, items);
    }

    #[test]
    fn get_by_id() {
        let store = SqliteMediaStore::open_in_memory().unwrap();
        store
            .replace_all(&[media("https://cdn/a.jpg", PostKind::Image, None)])
            .unwrap();
        let id = store.list().unwrap()[0].id;
        let found = store.get(id).unwrap().unwrap();
        assert_eq!(found.media.link, "https://cdn/a.jpg");
        assert!(found.media.img_index.is_none());
        assert!(found.created_at.is_some());
        assert!(store.get(id + 100).unwrap().is_none());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("media.db");
        {
            let store = SqliteMediaStore::open(&path).unwrap();
            store
                .replace_all(&[media("https://cdn/a.jpg", PostKind::Image, None)])
                .unwrap();
        }
        let store = SqliteMediaStore::open(&path).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
