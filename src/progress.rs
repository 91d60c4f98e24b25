use std::sync::Arc;

/// Events emitted while updating feeds and downloading episodes.
///
/// These exist purely for user feedback; no data decisions are made from
/// them.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A feed is being fetched from its source URL
    FetchingFeed { url: String },

    /// A feed could not be fetched or parsed; the stored state is untouched
    FetchFailed { url: String, error: String },

    /// Reconciliation finished for a feed
    FeedUpdated {
        feed_title: String,
        new_episodes: usize,
    },

    /// An episode transfer is starting
    DownloadStarting {
        episode_title: String,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Transfer progress update
    DownloadProgress {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// An episode transfer completed successfully
    DownloadCompleted {
        episode_title: String,
        filename: String,
    },

    /// An episode transfer failed; the remaining batch is aborted
    DownloadFailed {
        episode_title: String,
        error: String,
    },

    /// A listened episode's local file was removed
    FileRemoved { filename: String },
}

/// Trait for reporting progress events.
///
/// Implementations can use this to display progress bars, print status
/// lines, or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_handles_all_events() {
        let reporter = NoopReporter;

        reporter.report(ProgressEvent::FetchingFeed {
            url: "https://example.com/feed.xml".to_string(),
        });

        reporter.report(ProgressEvent::FetchFailed {
            url: "https://example.com/feed.xml".to_string(),
            error: "connection refused".to_string(),
        });

        reporter.report(ProgressEvent::FeedUpdated {
            feed_title: "Test Podcast".to_string(),
            new_episodes: 3,
        });

        reporter.report(ProgressEvent::DownloadStarting {
            episode_title: "Episode 1".to_string(),
            content_length: Some(1024),
        });

        reporter.report(ProgressEvent::DownloadProgress {
            bytes_downloaded: 512,
            total_bytes: Some(1024),
        });

        reporter.report(ProgressEvent::DownloadCompleted {
            episode_title: "Episode 1".to_string(),
            filename: "ep1.mp3".to_string(),
        });

        reporter.report(ProgressEvent::DownloadFailed {
            episode_title: "Episode 2".to_string(),
            error: "Connection timeout".to_string(),
        });

        reporter.report(ProgressEvent::FileRemoved {
            filename: "ep1.mp3".to_string(),
        });
    }
}
