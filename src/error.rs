use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the process configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in configuration file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not determine the home directory")]
    NoHomeDirectory,
}

/// Errors raised by the feed store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No feed with shortname '{shortname}'")]
    NotFound { shortname: String },

    #[error("A feed with shortname '{shortname}' already exists")]
    AlreadyExists { shortname: String },

    #[error("Failed to create folder {path}: {source}")]
    CreateFolderFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid feed record in {path}: {source}")]
    RecordParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize feed record: {0}")]
    SerializeFailed(#[from] serde_json::Error),
}

/// Errors raised while fetching or parsing a remote feed
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch feed from {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),
}

/// Errors raised while transferring an episode's media file
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Top-level errors for subscribing to a new feed
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Could not derive a shortname from '{title}', please provide one explicitly")]
    ShortnameUnderivable { title: String },
}
