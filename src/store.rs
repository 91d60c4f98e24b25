// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::feed::Feed;

/// Per-subscription record file, inside the subscription's folder
pub const FEED_RECORD_FILENAME: &str = "feed.json";

/// Persistence layer for subscriptions.
///
/// Every subscription lives in `<root>/<shortname>/`, holding a `feed.json`
/// record and the downloaded media files. A single process instance is
/// assumed to run against a given root at a time; there is no lock file.
#[derive(Debug, Clone)]
pub struct FeedStore {
    root: PathBuf,
}

impl FeedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Storage folder for a subscription
    pub fn folder(&self, shortname: &str) -> PathBuf {
        self.root.join(shortname)
    }

    fn record_path(&self, shortname: &str) -> PathBuf {
        self.folder(shortname).join(FEED_RECORD_FILENAME)
    }

    /// Load the feed stored under `shortname`
    pub fn load(&self, shortname: &str) -> Result<Feed, StoreError> {
        let path = self.record_path(shortname);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    shortname: shortname.to_string(),
                });
            }
            Err(e) => return Err(StoreError::ReadFailed { path, source: e }),
        };

        serde_json::from_str(&content).map_err(|e| StoreError::RecordParseFailed { path, source: e })
    }

    /// Overwrite the full record for this feed.
    ///
    /// Episodes are re-sorted newest-first before writing, so a persisted
    /// record is always in display order.
    pub fn save(&self, feed: &mut Feed) -> Result<(), StoreError> {
        feed.sort_episodes();

        let json = serde_json::to_string_pretty(feed).map_err(StoreError::SerializeFailed)?;
        let path = self.record_path(&feed.shortname);
        std::fs::write(&path, json).map_err(|e| StoreError::WriteFailed { path, source: e })
    }

    /// Create the storage folder and record for a new subscription.
    ///
    /// Fails with `AlreadyExists` when a folder for the shortname is
    /// already present. A failed record write removes the just-created
    /// folder again, so no orphaned empty folder is left behind.
    pub fn create(&self, feed: &mut Feed) -> Result<(), StoreError> {
        let folder = self.folder(&feed.shortname);
        if folder.exists() {
            return Err(StoreError::AlreadyExists {
                shortname: feed.shortname.clone(),
            });
        }

        std::fs::create_dir_all(&folder).map_err(|e| StoreError::CreateFolderFailed {
            path: folder.clone(),
            source: e,
        })?;

        if let Err(e) = self.save(feed) {
            let _ = std::fs::remove_dir_all(&folder);
            return Err(e);
        }

        Ok(())
    }

    /// Enumerate all subscriptions, sorted by title.
    ///
    /// Folders without a valid record are skipped; they may belong to other
    /// tools or to a botched manual edit, and one broken record should not
    /// take down every command.
    pub fn list_all(&self) -> Result<Vec<Feed>, StoreError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    path: self.root.clone(),
                    source: e,
                });
            }
        };

        let mut feeds = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::ReadFailed {
                path: self.root.clone(),
                source: e,
            })?;

            if !entry.path().is_dir() {
                continue;
            }
            let Some(shortname) = entry.file_name().to_str().map(String::from) else {
                continue;
            };

            match self.load(&shortname) {
                Ok(feed) => feeds.push(feed),
                Err(StoreError::NotFound { .. } | StoreError::RecordParseFailed { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        feeds.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(feeds)
    }

    /// Remove a subscription's folder and everything in it
    pub fn delete(&self, shortname: &str) -> Result<(), StoreError> {
        let folder = self.folder(shortname);
        if !folder.is_dir() {
            return Err(StoreError::NotFound {
                shortname: shortname.to_string(),
            });
        }

        std::fs::remove_dir_all(&folder).map_err(|e| StoreError::RemoveFailed {
            path: folder,
            source: e,
        })
    }

    /// Rename a subscription, moving its folder and rewriting the record
    pub fn rename(&self, shortname: &str, newname: &str) -> Result<Feed, StoreError> {
        let mut feed = self.load(shortname)?;

        let to = self.folder(newname);
        if to.exists() {
            return Err(StoreError::AlreadyExists {
                shortname: newname.to_string(),
            });
        }

        let from = self.folder(shortname);
        std::fs::rename(&from, &to).map_err(|e| StoreError::RenameFailed {
            from,
            to: to.clone(),
            source: e,
        })?;

        feed.shortname = newname.to_string();
        self.save(&mut feed)?;
        Ok(feed)
    }
}
