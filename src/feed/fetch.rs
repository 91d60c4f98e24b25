// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, FixedOffset};

use crate::error::FetchError;
use crate::http::HttpClient;

/// A freshly fetched remote feed, reduced to what reconciliation needs
#[derive(Debug, Clone)]
pub struct RemoteFeed {
    pub title: Option<String>,
    pub entries: Vec<RemoteEntry>,
}

/// One entry of a remote feed
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub title: Option<String>,
    /// Publish date as seconds since the epoch
    pub published: i64,
    pub links: Vec<RemoteLink>,
}

/// A candidate media link within an entry
#[derive(Debug, Clone)]
pub struct RemoteLink {
    pub mime_type: Option<String>,
    pub href: String,
}

/// Fetch and parse a remote feed
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &str) -> Result<RemoteFeed, FetchError> {
    let bytes = client
        .get_bytes(url)
        .await
        .map_err(|e| FetchError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;
    parse_remote_feed(&bytes)
}

/// Parse RSS feed XML bytes into a RemoteFeed
pub fn parse_remote_feed(xml_bytes: &[u8]) -> Result<RemoteFeed, FetchError> {
    let channel = rss::Channel::read_from(xml_bytes)?;

    let entries = channel.items().iter().filter_map(remote_entry).collect();

    let title = Some(decode_entities(channel.title())).filter(|t| !t.is_empty());

    Ok(RemoteFeed { title, entries })
}

/// Map an RSS item to a RemoteEntry.
///
/// Entries without a parseable publish date are dropped, since the publish
/// date is both the sort key and half of the episode identity.
fn remote_entry(item: &rss::Item) -> Option<RemoteEntry> {
    let published = item.pub_date().and_then(parse_pub_date)?;

    let links = item
        .enclosure()
        .into_iter()
        .map(|enclosure| RemoteLink {
            mime_type: Some(enclosure.mime_type().to_string()).filter(|m| !m.is_empty()),
            href: enclosure.url().to_string(),
        })
        .collect();

    Some(RemoteEntry {
        title: item.title().map(decode_entities),
        published,
        links,
    })
}

/// RSS publish dates follow RFC 2822, same as email headers, but feeds in
/// the wild take liberties with the format
fn parse_pub_date(date_str: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(date_str)
        .ok()
        .or_else(|| parse_relaxed_date(date_str))
        .map(|dt| dt.timestamp())
}

fn parse_relaxed_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];

    formats
        .iter()
        .find_map(|format| DateTime::parse_from_str(date_str, format).ok())
}

fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}
