use crate::error::StoreError;
use crate::feed::Feed;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::store::FeedStore;

/// Mark every episode with the given title listened and remove its local
/// file. Returns the number of episodes affected.
///
/// Titles are not unique, so several episodes can match in one call. The
/// episode keeps `downloaded` and `filename` set afterwards; the flags
/// record that a download happened, not that the file is still present. A
/// file that is already gone is not an error.
pub fn mark_listened(
    store: &FeedStore,
    feed: &mut Feed,
    episode_title: &str,
    reporter: &SharedProgressReporter,
) -> Result<usize, StoreError> {
    let folder = store.folder(&feed.shortname);
    let mut affected = 0;

    for episode in &mut feed.episodes {
        if episode.title != episode_title {
            continue;
        }

        episode.listened = true;
        affected += 1;

        if let Some(filename) = episode.filename.as_deref().filter(|f| !f.is_empty()) {
            let path = folder.join(filename);
            if path.exists() && std::fs::remove_file(&path).is_ok() {
                reporter.report(ProgressEvent::FileRemoved {
                    filename: filename.to_string(),
                });
            }
        }
    }

    store.save(feed)?;
    Ok(affected)
}
