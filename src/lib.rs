pub mod config;
pub mod download;
pub mod error;
pub mod feed;
pub mod http;
pub mod listened;
pub mod progress;
pub mod store;
pub mod sync;

// Re-export main types for convenience
pub use config::Config;
pub use download::{DownloadReport, download_pending};
pub use error::{ConfigError, FetchError, ImportError, StoreError, TransferError};
pub use feed::{Episode, EpisodeKey, Feed, RemoteEntry, RemoteFeed, RemoteLink, derive_shortname};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use listened::mark_listened;
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use store::FeedStore;
pub use sync::{episodes_from_entries, import_feed, reconcile, update_feed};
