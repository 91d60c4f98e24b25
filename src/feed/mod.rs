mod fetch;
mod model;

pub use fetch::{RemoteEntry, RemoteFeed, RemoteLink, fetch_feed, parse_remote_feed};
pub use model::{Episode, EpisodeKey, Feed, derive_shortname};
