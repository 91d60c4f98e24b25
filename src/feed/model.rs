// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

/// One media item belonging to a feed.
///
/// `downloaded` and `filename` record that a download happened; the file
/// itself may have been removed again when the episode was marked listened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub url: String,
    /// Publish date as seconds since the epoch
    pub published: i64,
    pub downloaded: bool,
    pub listened: bool,
    pub filename: Option<String>,
}

impl Episode {
    /// Create a fresh, not-yet-downloaded episode
    pub fn new(title: String, url: String, published: i64) -> Self {
        Self {
            title,
            url,
            published,
            downloaded: false,
            listened: false,
            filename: None,
        }
    }

    /// The identity of this episode for reconciliation purposes.
    ///
    /// Upstream feeds carry no durable episode ID, so `(title, published)`
    /// has to serve as the identity. A feed that corrects a typo in a title
    /// or shifts a timestamp will produce a spurious duplicate; keeping the
    /// rule behind this single method lets a stronger identity replace it
    /// without touching the merge logic.
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey {
            title: self.title.clone(),
            published: self.published,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.downloaded
    }
}

/// Dedup key for episodes, see [`Episode::key`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeKey {
    pub title: String,
    pub published: i64,
}

/// One tracked subscription: metadata plus its episodes.
///
/// Serialization matches the `feed.json` record on disk. Unknown fields in
/// a record written by a future version are ignored on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    /// Unique identifier, also the storage folder name
    pub shortname: String,
    pub title: String,
    pub url: String,
    pub episodes: Vec<Episode>,
}

impl Feed {
    /// Sort episodes newest-first.
    ///
    /// Insertion order is not meaningful; this order is re-derived before
    /// every persist and every display.
    pub fn sort_episodes(&mut self) {
        self.episodes.sort_by(|a, b| b.published.cmp(&a.published));
    }

    pub fn downloaded_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.downloaded).count()
    }
}

/// Derive a filesystem-safe shortname from a feed title.
///
/// Shortnames are restricted to lowercase ASCII letters, digits and dashes.
/// Returns `None` when nothing usable remains, in which case the user has
/// to provide one explicitly.
pub fn derive_shortname(title: &str) -> Option<String> {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();

    let shortname = kept
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    if shortname.is_empty() {
        None
    } else {
        Some(shortname)
    }
}
