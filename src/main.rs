use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use podfox::{
    Config, Feed, FeedStore, NoopReporter, ProgressEvent, ProgressReporter, ReqwestClient,
    SharedProgressReporter, download_pending, import_feed, mark_listened, update_feed,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "[x] ");

/// A podcatcher for the terminal
#[derive(Parser, Debug)]
#[command(name = "podfox")]
#[command(about = "A podcatcher for the terminal")]
#[command(version)]
struct Args {
    /// Path to an alternate configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscribe to a feed
    Import {
        /// URL of the RSS feed
        feed_url: String,
        /// Shortname for the subscription (derived from the feed title if omitted)
        shortname: Option<String>,
    },
    /// Fetch feeds and pick up new episodes
    Update {
        /// Update only this subscription (all when omitted)
        shortname: Option<String>,
    },
    /// List all subscriptions
    Feeds,
    /// List the newest episodes of a subscription
    Episodes { shortname: String },
    /// Download pending episodes
    Download {
        /// Download only for this subscription (all when omitted)
        shortname: Option<String>,
        /// Maximum number of episodes to download
        #[arg(long = "how-many")]
        how_many: Option<usize>,
    },
    /// Rename a subscription
    Rename { shortname: String, newname: String },
    /// Unsubscribe and remove the feed folder
    Delete { shortname: String },
    /// Mark an episode listened and remove its file
    Done {
        shortname: String,
        episode_title: String,
    },
}

/// Progress reporter using indicatif for terminal output.
///
/// Downloads run strictly one at a time, so a single download bar under the
/// status spinner is enough.
struct TerminalReporter {
    multi: MultiProgress,
    spinner: ProgressBar,
    download_bar: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    fn new() -> Self {
        let multi = MultiProgress::new();

        let spinner = multi.add(ProgressBar::new_spinner());
        spinner.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {wide_msg}")
                .unwrap(),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi,
            spinner,
            download_bar: Mutex::new(None),
        }
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(line);
    }

    fn take_download_bar(&self) -> Option<ProgressBar> {
        self.download_bar.lock().unwrap().take()
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for TerminalReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { url } => {
                self.spinner
                    .set_message(format!("{SEARCH}Fetching {}", url.cyan()));
            }

            ProgressEvent::FetchFailed { url, error } => {
                self.println(format!("{FAILURE}{} - {}", url.yellow(), error.red()));
            }

            ProgressEvent::FeedUpdated {
                feed_title,
                new_episodes,
            } => {
                if new_episodes > 0 {
                    self.println(format!(
                        "{SUCCESS}{} - {} new episode(s)",
                        feed_title.green().bold(),
                        new_episodes.to_string().cyan()
                    ));
                } else {
                    self.println(format!(
                        "{SUCCESS}{} - {}",
                        feed_title.green(),
                        "no new episodes".dimmed()
                    ));
                }
            }

            ProgressEvent::DownloadStarting {
                episode_title,
                content_length,
            } => {
                let style = ProgressStyle::default_bar()
                    .template(&format!(
                        "  {DOWNLOAD}[{{bar:30.cyan/blue}}] {{bytes}}/{{total_bytes}} {{wide_msg}}"
                    ))
                    .unwrap()
                    .progress_chars("█▓░");

                let bar = self.multi.add(ProgressBar::new(content_length.unwrap_or(0)));
                bar.set_style(style);
                bar.set_message(truncate_title(&episode_title, 40));
                *self.download_bar.lock().unwrap() = Some(bar);
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
            } => {
                if let Some(bar) = self.download_bar.lock().unwrap().as_ref() {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_downloaded);
                }
            }

            ProgressEvent::DownloadCompleted {
                episode_title,
                filename,
            } => {
                if let Some(bar) = self.take_download_bar() {
                    bar.finish_and_clear();
                }
                self.println(format!(
                    "{SUCCESS}{} {} {}",
                    truncate_title(&episode_title, 40).green(),
                    "->".dimmed(),
                    filename.cyan()
                ));
            }

            ProgressEvent::DownloadFailed {
                episode_title,
                error,
            } => {
                if let Some(bar) = self.take_download_bar() {
                    bar.finish_and_clear();
                }
                self.println(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&episode_title, 30).red(),
                    error.red()
                ));
            }

            ProgressEvent::FileRemoved { filename } => {
                self.println(format!("{TRASH}removed {}", filename.cyan()));
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    // Count chars, not bytes: slicing at a byte offset panics mid-codepoint
    if title.chars().count() <= max_len {
        return title.to_string();
    }
    let truncated: String = title.chars().take(max_len.saturating_sub(3)).collect();
    format!("{truncated}...")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(err) = run(args).await {
        eprintln!("{FAILURE}{}", format!("{err:#}").red().bold());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config =
        Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let store = FeedStore::new(config.podcast_directory.clone());
    let client = ReqwestClient::new();

    let terminal = (!args.quiet).then(|| Arc::new(TerminalReporter::new()));
    let reporter: SharedProgressReporter = match &terminal {
        Some(terminal) => terminal.clone(),
        None => NoopReporter::shared(),
    };

    match args.command {
        Command::Import {
            feed_url,
            shortname,
        } => {
            let feed = import_feed(
                &client,
                &store,
                &feed_url,
                shortname.as_deref(),
                &config,
                &reporter,
            )
            .await
            .context("Failed to import feed")?;

            finish(&terminal);
            println!(
                "{MICROPHONE}imported {} with shortname {}",
                feed.title.green(),
                feed.shortname.blue()
            );
        }

        Command::Update { shortname } => {
            let mut feeds = select_feeds(&store, shortname.as_deref())?;
            for feed in &mut feeds {
                update_feed(&client, &store, feed, &config, &reporter).await?;
            }
            finish(&terminal);
        }

        Command::Feeds => {
            print_feeds(store.list_all()?);
        }

        Command::Episodes { shortname } => {
            let mut feed = store.load(&shortname)?;
            feed.sort_episodes();
            print_episodes(&feed);
        }

        Command::Download {
            shortname,
            how_many,
        } => {
            let mut feeds = select_feeds(&store, shortname.as_deref())?;

            let mut downloaded = 0;
            let mut failed = Vec::new();
            for feed in &mut feeds {
                let report =
                    download_pending(&client, &store, feed, how_many, &config, &reporter)
                        .await?;
                downloaded += report.downloaded;
                failed.extend(report.failed);
            }
            finish(&terminal);

            println!(
                "\n{} {} downloaded, {} failed",
                "Done:".bold().green(),
                downloaded.to_string().green().bold(),
                failed.len().to_string().yellow()
            );
            for (title, error) in &failed {
                println!("  {} {} - {}", "x".red(), title.yellow(), error.dimmed());
            }
            if !failed.is_empty() && downloaded == 0 {
                std::process::exit(1);
            }
        }

        Command::Rename {
            shortname,
            newname,
        } => {
            let feed = store.rename(&shortname, &newname)?;
            println!(
                "renamed {} to {}",
                shortname.blue(),
                feed.shortname.blue().bold()
            );
        }

        Command::Delete { shortname } => {
            store.delete(&shortname)?;
            println!("{TRASH}deleted {}", shortname.blue());
        }

        Command::Done {
            shortname,
            episode_title,
        } => {
            let mut feed = store.load(&shortname)?;
            let affected = mark_listened(&store, &mut feed, &episode_title, &reporter)?;
            finish(&terminal);

            if affected == 0 {
                println!(
                    "{}",
                    format!("no episode titled '{episode_title}' in {shortname}").yellow()
                );
            } else {
                println!(
                    "marked {} episode(s) listened",
                    affected.to_string().green()
                );
            }
        }
    }

    Ok(())
}

fn finish(terminal: &Option<Arc<TerminalReporter>>) {
    if let Some(terminal) = terminal {
        terminal.finish();
    }
}

/// One named feed, or every stored feed when no shortname is given
fn select_feeds(store: &FeedStore, shortname: Option<&str>) -> Result<Vec<Feed>> {
    match shortname {
        Some(shortname) => Ok(vec![store.load(shortname)?]),
        None => Ok(store.list_all()?),
    }
}

fn print_feeds(mut feeds: Vec<Feed>) {
    println!("{:45.45} | {}", "title".green(), "shortname".blue());
    println!("{}", "=".repeat(80));

    for feed in &mut feeds {
        feed.sort_episodes();
        let pending = if feed.episodes.first().is_some_and(|e| !e.downloaded) {
            "*"
        } else {
            ""
        };
        println!(
            "{:40.40} {:3}{:1} | {}",
            feed.title.green(),
            feed.downloaded_count(),
            pending,
            feed.shortname.blue()
        );
    }
}

fn print_episodes(feed: &Feed) {
    for episode in feed.episodes.iter().take(20) {
        let status = if episode.downloaded {
            "Downloaded".green()
        } else {
            "Not Downloaded".yellow()
        };
        let listened = if episode.listened {
            " (listened)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{:40.40}  | {}{}",
            truncate_title(&episode.title, 40).green(),
            status,
            listened
        );
    }
}
