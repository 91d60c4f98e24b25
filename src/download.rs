// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::{StoreError, TransferError};
use crate::feed::Feed;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::store::FeedStore;

/// Outcome of one download batch
#[derive(Debug, Clone)]
pub struct DownloadReport {
    /// Number of episodes downloaded in this batch
    pub downloaded: usize,
    /// Title and error of the episode that aborted the batch, if any
    pub failed: Option<(String, String)>,
}

/// Download pending episodes of a feed, newest first.
///
/// At most `max` episodes are transferred (the configured `maxnum` when the
/// caller passes `None`; a `max` of zero transfers nothing). Batch policy:
/// the first failed transfer aborts the remaining batch, matching the
/// retry-on-next-run behavior users of earlier versions expect. Episodes
/// transferred before the failure keep their state.
///
/// The feed is persisted once, after the batch loop exits. A crash mid-batch
/// loses the flags of episodes downloaded after the last save; the files
/// themselves stay on disk and are overwritten on retry.
pub async fn download_pending<C: HttpClient>(
    client: &C,
    store: &FeedStore,
    feed: &mut Feed,
    max: Option<usize>,
    config: &Config,
    reporter: &SharedProgressReporter,
) -> Result<DownloadReport, StoreError> {
    let mut budget = max.unwrap_or(config.maxnum);
    let folder = store.folder(&feed.shortname);

    let mut downloaded = 0;
    let mut failed = None;

    // Filenames already claimed by other episodes of this feed
    let mut taken: HashSet<String> = feed
        .episodes
        .iter()
        .filter_map(|e| e.filename.clone())
        .collect();

    feed.sort_episodes();
    for episode in &mut feed.episodes {
        if budget == 0 {
            break;
        }
        if !episode.is_pending() {
            continue;
        }

        match transfer(client, &episode.url, &folder, &episode.title, &taken, reporter).await {
            Ok(filename) => {
                taken.insert(filename.clone());
                episode.downloaded = true;
                episode.filename = Some(filename);
                downloaded += 1;
                budget -= 1;
            }
            Err(e) => {
                reporter.report(ProgressEvent::DownloadFailed {
                    episode_title: episode.title.clone(),
                    error: e.to_string(),
                });
                failed = Some((episode.title.clone(), e.to_string()));
                break;
            }
        }
    }

    store.save(feed)?;

    Ok(DownloadReport { downloaded, failed })
}

/// Stream one media file into the feed's folder, returning the local
/// filename.
///
/// The derived name is disambiguated against `taken`, the filenames
/// already claimed by other episodes of the feed.
pub async fn transfer<C: HttpClient>(
    client: &C,
    url: &str,
    folder: &Path,
    episode_title: &str,
    taken: &HashSet<String>,
    reporter: &SharedProgressReporter,
) -> Result<String, TransferError> {
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| TransferError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status >= 400 {
        return Err(TransferError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    let derived = response
        .content_disposition
        .as_deref()
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| filename_from_url(url));
    let filename = uniquify(&derived, taken);

    reporter.report(ProgressEvent::DownloadStarting {
        episode_title: episode_title.to_string(),
        content_length: response.content_length,
    });

    let path = folder.join(&filename);
    let mut file = File::create(&path)
        .await
        .map_err(|e| TransferError::FileCreateFailed {
            path: path.clone(),
            source: e,
        })?;

    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| TransferError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| TransferError::FileWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            bytes_downloaded,
            total_bytes: response.content_length,
        });
    }

    file.flush()
        .await
        .map_err(|e| TransferError::FileWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    reporter.report(ProgressEvent::DownloadCompleted {
        episode_title: episode_title.to_string(),
        filename: filename.clone(),
    });

    Ok(filename)
}

/// Extract the filename from a `Content-Disposition` header value
fn filename_from_disposition(value: &str) -> Option<String> {
    let (_, rest) = value.split_once("filename=\"")?;
    let (name, _) = rest.split_once('"')?;
    safe_filename(name)
}

/// Fall back to the URL's trailing path segment, stripped of query
/// parameters
fn filename_from_url(url: &str) -> String {
    let tail = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let name = tail.split('?').next().unwrap_or(tail);
    safe_filename(name).unwrap_or_else(|| "episode".to_string())
}

/// Accept a derived filename only if it stays inside the feed folder.
///
/// `Content-Disposition` is server-controlled; a name carrying path
/// separators or `..` must never reach `Path::join`.
fn safe_filename(name: &str) -> Option<String> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return None;
    }
    Some(name.to_string())
}

/// Suffix the stem with `-1`, `-2`, ... until the name is free
fn uniquify(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };

    (1..)
        .map(|n| match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}
