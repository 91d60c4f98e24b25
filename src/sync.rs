// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use crate::config::Config;
use crate::error::{ImportError, StoreError};
use crate::feed::{Episode, EpisodeKey, Feed, RemoteFeed, derive_shortname, fetch_feed};
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::store::FeedStore;

/// Extract episodes from a fetched remote feed.
///
/// Per entry, every link whose declared content type is in the allow-list
/// yields one episode. The entry title is used for each of them; when the
/// entry has none, the link target stands in.
pub fn episodes_from_entries(remote: &RemoteFeed, mimetypes: &[String]) -> Vec<Episode> {
    let mut episodes = Vec::new();

    for entry in &remote.entries {
        for link in &entry.links {
            let eligible = link
                .mime_type
                .as_deref()
                .is_some_and(|mime| mimetypes.iter().any(|allowed| allowed == mime));
            if !eligible {
                continue;
            }

            let title = entry.title.clone().unwrap_or_else(|| link.href.clone());
            episodes.push(Episode::new(title, link.href.clone(), entry.published));
        }
    }

    episodes
}

/// Merge freshly fetched episodes into an existing collection.
///
/// Every existing episode is kept unchanged. A fetched episode is appended
/// iff its key is unseen, both against the existing collection and against
/// episodes appended earlier in the same call. The result is sorted
/// newest-first. Reconciling the same fetched set twice is a no-op on the
/// second call.
pub fn reconcile(existing: &[Episode], fetched: Vec<Episode>) -> Vec<Episode> {
    let mut seen: HashSet<EpisodeKey> = existing.iter().map(Episode::key).collect();
    let mut merged = existing.to_vec();

    for episode in fetched {
        if seen.insert(episode.key()) {
            merged.push(episode);
        }
    }

    merged.sort_by(|a, b| b.published.cmp(&a.published));
    merged
}

/// Fetch a feed's source URL and fold previously unknown episodes into the
/// stored record. Returns the number of new episodes.
///
/// An unreachable or unparsable remote feed degrades to "no new episodes
/// this run": the stored state is left untouched and the failure is only
/// surfaced through the reporter.
pub async fn update_feed<C: HttpClient>(
    client: &C,
    store: &FeedStore,
    feed: &mut Feed,
    config: &Config,
    reporter: &SharedProgressReporter,
) -> Result<usize, StoreError> {
    reporter.report(ProgressEvent::FetchingFeed {
        url: feed.url.clone(),
    });

    let remote = match fetch_feed(client, &feed.url).await {
        Ok(remote) => remote,
        Err(e) => {
            reporter.report(ProgressEvent::FetchFailed {
                url: feed.url.clone(),
                error: e.to_string(),
            });
            return Ok(0);
        }
    };

    let fetched = episodes_from_entries(&remote, &config.mimetypes);
    let known = feed.episodes.len();
    feed.episodes = reconcile(&feed.episodes, fetched);
    let new_episodes = feed.episodes.len() - known;

    store.save(feed)?;

    reporter.report(ProgressEvent::FeedUpdated {
        feed_title: feed.title.clone(),
        new_episodes,
    });

    Ok(new_episodes)
}

/// Subscribe to a feed: first fetch, shortname resolution, folder and
/// record creation.
///
/// Unlike `update_feed`, a fetch failure here is fatal; there is no
/// existing state to fall back to. When no shortname is given, one is
/// derived from the remote title (or, failing that, reported as an error).
pub async fn import_feed<C: HttpClient>(
    client: &C,
    store: &FeedStore,
    url: &str,
    shortname: Option<&str>,
    config: &Config,
    reporter: &SharedProgressReporter,
) -> Result<Feed, ImportError> {
    reporter.report(ProgressEvent::FetchingFeed {
        url: url.to_string(),
    });

    let remote = fetch_feed(client, url).await?;

    let title = remote
        .title
        .clone()
        .unwrap_or_else(|| url.rsplit('/').next().unwrap_or(url).to_string());

    let shortname = match shortname {
        Some(shortname) => shortname.to_string(),
        None => derive_shortname(&title)
            .ok_or_else(|| ImportError::ShortnameUnderivable { title: title.clone() })?,
    };

    let mut feed = Feed {
        shortname,
        title,
        url: url.to_string(),
        episodes: episodes_from_entries(&remote, &config.mimetypes),
    };

    store.create(&mut feed)?;
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::StoreError;
    use crate::feed::{RemoteEntry, RemoteLink};
    use crate::http::{ByteStream, HttpResponse};
    use crate::progress::NoopReporter;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[derive(Clone)]
    struct MockHttpClient {
        feed_xml: String,
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, _url: &str) -> Result<Bytes, reqwest::Error> {
            Ok(Bytes::from(self.feed_xml.clone()))
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            let stream: ByteStream =
                Box::pin(futures::stream::once(async move { Ok(Bytes::new()) }));
            Ok(HttpResponse {
                status: 200,
                content_length: None,
                content_disposition: None,
                body: stream,
            })
        }
    }

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test Podcast</title>
    <description>A test podcast</description>
    <item>
      <title>A</title>
      <pubDate>Thu, 01 Jan 1970 00:01:40 +0000</pubDate>
      <enclosure url="https://example.com/a.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>C</title>
      <pubDate>Thu, 01 Jan 1970 00:01:20 +0000</pubDate>
      <enclosure url="https://example.com/c.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    fn episode(title: &str, published: i64) -> Episode {
        Episode::new(
            title.to_string(),
            format!("https://example.com/{title}.mp3"),
            published,
        )
    }

    fn remote(entries: Vec<RemoteEntry>) -> RemoteFeed {
        RemoteFeed {
            title: Some("Test Podcast".to_string()),
            entries,
        }
    }

    fn entry(title: Option<&str>, published: i64, links: Vec<(&str, &str)>) -> RemoteEntry {
        RemoteEntry {
            title: title.map(String::from),
            published,
            links: links
                .into_iter()
                .map(|(mime, href)| RemoteLink {
                    mime_type: Some(mime.to_string()),
                    href: href.to_string(),
                })
                .collect(),
        }
    }

    fn allowed() -> Vec<String> {
        vec!["audio/mpeg".to_string(), "audio/ogg".to_string()]
    }

    // === extraction ===

    #[test]
    fn extraction_filters_by_mimetype() {
        let remote = remote(vec![entry(
            Some("Ep"),
            100,
            vec![
                ("audio/mpeg", "https://example.com/ep.mp3"),
                ("text/html", "https://example.com/ep.html"),
            ],
        )]);

        let episodes = episodes_from_entries(&remote, &allowed());

        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].url, "https://example.com/ep.mp3");
    }

    #[test]
    fn extraction_yields_one_episode_per_qualifying_link() {
        let remote = remote(vec![entry(
            Some("Ep"),
            100,
            vec![
                ("audio/mpeg", "https://example.com/ep.mp3"),
                ("audio/ogg", "https://example.com/ep.ogg"),
            ],
        )]);

        let episodes = episodes_from_entries(&remote, &allowed());
        assert_eq!(episodes.len(), 2);
    }

    #[test]
    fn extraction_defaults_title_to_link_target() {
        let remote = remote(vec![entry(
            None,
            100,
            vec![("audio/mpeg", "https://example.com/ep.mp3")],
        )]);

        let episodes = episodes_from_entries(&remote, &allowed());
        assert_eq!(episodes[0].title, "https://example.com/ep.mp3");
    }

    #[test]
    fn extracted_episodes_start_pending() {
        let remote = remote(vec![entry(
            Some("Ep"),
            100,
            vec![("audio/mpeg", "https://example.com/ep.mp3")],
        )]);

        let episodes = episodes_from_entries(&remote, &allowed());

        assert!(!episodes[0].downloaded);
        assert!(!episodes[0].listened);
        assert_eq!(episodes[0].filename, None);
    }

    // === reconciliation ===

    #[test]
    fn reconcile_merges_without_duplicating() {
        let existing = vec![episode("A", 100), episode("B", 90)];
        let fetched = vec![episode("A", 100), episode("C", 80)];

        let merged = reconcile(&existing, fetched);

        let titles: Vec<&str> = merged.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let existing = vec![episode("A", 100)];
        let fetched = vec![episode("A", 100), episode("B", 90)];

        let once = reconcile(&existing, fetched.clone());
        let twice = reconcile(&once, fetched);

        assert_eq!(once, twice);
    }

    #[test]
    fn reconcile_loses_no_existing_episode() {
        let mut downloaded = episode("A", 100);
        downloaded.downloaded = true;
        downloaded.filename = Some("a.mp3".to_string());
        let existing = vec![downloaded.clone(), episode("B", 90)];

        let merged = reconcile(&existing, vec![episode("A", 100), episode("C", 110)]);

        // The already-downloaded A keeps its state
        assert!(merged.contains(&downloaded));
        assert!(merged.contains(&episode("B", 90)));
    }

    #[test]
    fn reconcile_dedups_within_fetched_set() {
        let merged = reconcile(&[], vec![episode("A", 100), episode("A", 100)]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn reconcile_sorts_newest_first() {
        let merged = reconcile(&[episode("B", 90)], vec![episode("C", 80), episode("A", 100)]);

        let published: Vec<i64> = merged.iter().map(|e| e.published).collect();
        assert_eq!(published, vec![100, 90, 80]);
    }

    #[test]
    fn reconcile_treats_same_title_different_date_as_distinct() {
        let merged = reconcile(&[episode("A", 100)], vec![episode("A", 101)]);
        assert_eq!(merged.len(), 2);
    }

    // === update ===

    #[tokio::test]
    async fn update_appends_new_episodes_and_saves() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path());
        let config = Config {
            podcast_directory: dir.path().to_path_buf(),
            ..Config::default()
        };

        let mut feed = Feed {
            shortname: "test".to_string(),
            title: "Test Podcast".to_string(),
            url: "https://example.com/feed.xml".to_string(),
            episodes: vec![episode("A", 100), episode("B", 90)],
        };
        store.create(&mut feed).unwrap();

        let client = MockHttpClient {
            feed_xml: SAMPLE_FEED.to_string(),
        };

        // Remote has A (already known) and C (new)
        let new_episodes =
            update_feed(&client, &store, &mut feed, &config, &NoopReporter::shared())
                .await
                .unwrap();

        assert_eq!(new_episodes, 1);

        let stored = store.load("test").unwrap();
        let titles: Vec<&str> = stored.episodes.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn update_fetch_failure_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path());
        let config = Config::default();

        let mut feed = Feed {
            shortname: "test".to_string(),
            title: "Test Podcast".to_string(),
            url: "https://example.com/feed.xml".to_string(),
            episodes: vec![episode("A", 100)],
        };
        store.create(&mut feed).unwrap();

        let client = MockHttpClient {
            feed_xml: "definitely not xml".to_string(),
        };

        let new_episodes =
            update_feed(&client, &store, &mut feed, &config, &NoopReporter::shared())
                .await
                .unwrap();

        assert_eq!(new_episodes, 0);
        assert_eq!(feed.episodes.len(), 1);
        assert_eq!(store.load("test").unwrap().episodes.len(), 1);
    }

    // === import ===

    #[tokio::test]
    async fn import_creates_feed_with_derived_shortname() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path());
        let config = Config::default();

        let client = MockHttpClient {
            feed_xml: SAMPLE_FEED.to_string(),
        };

        let feed = import_feed(
            &client,
            &store,
            "https://example.com/feed.xml",
            None,
            &config,
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(feed.shortname, "test-podcast");
        assert_eq!(feed.title, "Test Podcast");
        assert_eq!(feed.episodes.len(), 2);
        assert!(store.load("test-podcast").is_ok());
    }

    #[tokio::test]
    async fn import_respects_explicit_shortname() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path());
        let config = Config::default();

        let client = MockHttpClient {
            feed_xml: SAMPLE_FEED.to_string(),
        };

        let feed = import_feed(
            &client,
            &store,
            "https://example.com/feed.xml",
            Some("tp"),
            &config,
            &NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(feed.shortname, "tp");
    }

    #[tokio::test]
    async fn import_collision_fails_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path());
        let config = Config::default();
        std::fs::create_dir(dir.path().join("tp")).unwrap();

        let client = MockHttpClient {
            feed_xml: SAMPLE_FEED.to_string(),
        };

        let result = import_feed(
            &client,
            &store,
            "https://example.com/feed.xml",
            Some("tp"),
            &config,
            &NoopReporter::shared(),
        )
        .await;

        assert!(matches!(
            result,
            Err(ImportError::Store(StoreError::AlreadyExists { .. }))
        ));
        assert!(!dir.path().join("tp").join("feed.json").exists());
    }

    #[tokio::test]
    async fn import_unparsable_feed_is_fatal() {
        let dir = tempdir().unwrap();
        let store = FeedStore::new(dir.path());
        let config = Config::default();

        let client = MockHttpClient {
            feed_xml: "nope".to_string(),
        };

        let result = import_feed(
            &client,
            &store,
            "https://example.com/feed.xml",
            None,
            &config,
            &NoopReporter::shared(),
        )
        .await;

        assert!(matches!(result, Err(ImportError::Fetch(_))));
    }
}
