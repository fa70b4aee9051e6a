//! `trawl` — harvest topic feeds into a deduplicated SQLite content store.
//!
//! Reads `trawl.toml` (or the path given with `--config`), opens the store,
//! and runs one of the subcommands below.
//!
//! ```text
//! trawl run [TOPIC…] [--posts-dir DIR] [--reload-index] [--json]
//! trawl track TOPIC…
//! trawl topics
//! trawl stats
//! ```

mod fetch;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use trawl_core::{
  run::{Harvester, IndexRefresh, RunOptions, RunReport, TopicOutcome},
  store::ContentStore,
};
use trawl_store_sqlite::SqliteStore;

use crate::{fetch::FileFetcher, settings::TrawlConfig};

#[derive(Parser)]
#[command(author, version, about = "Trawl topic harvester")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "trawl.toml")]
  config: PathBuf,

  /// SQLite store path; overrides `store_path` from the config.
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Harvest topics into the store.
  ///
  /// With no topics given, harvests the configured topics followed by every
  /// tracked topic.
  Run {
    topics:       Vec<String>,
    /// Directory of `<topic>.json` feeds; overrides `posts_dir`.
    #[arg(long)]
    posts_dir:    Option<PathBuf>,
    /// Rescan the store before every topic instead of once per run.
    #[arg(long)]
    reload_index: bool,
    /// Print the run report as JSON.
    #[arg(long)]
    json:         bool,
  },
  /// Add topics to the tracked list.
  Track {
    #[arg(required = true)]
    topics: Vec<String>,
  },
  /// List tracked topics.
  Topics,
  /// Print store counts.
  Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = TrawlConfig::load(&cli.config)?;

  let store_path = cli
    .store
    .as_deref()
    .map(settings::expand_tilde)
    .unwrap_or_else(|| cfg.store_path.clone());
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store {}", store_path.display()))?;
  tracing::debug!(path = %store_path.display(), "store opened");

  match cli.command {
    Command::Run { topics, posts_dir, reload_index, json } => {
      let topics: Vec<String> = if topics.is_empty() {
        let tracked = store
          .list_tracked_topics()
          .await
          .context("failed to list tracked topics")?;
        cfg.topics.iter().cloned().chain(tracked).collect()
      } else {
        topics
      };
      if topics.is_empty() {
        tracing::warn!("no topics given, configured, or tracked");
      }

      let posts_dir = posts_dir
        .as_deref()
        .map(settings::expand_tilde)
        .unwrap_or(cfg.posts_dir);
      let index_refresh = if reload_index {
        IndexRefresh::Reload
      } else {
        cfg.index_refresh
      };

      let harvester = Harvester::new(store, FileFetcher::new(posts_dir))
        .with_options(RunOptions { index_refresh });
      let report = harvester.run(topics).await.context("run failed")?;

      if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
      } else {
        print_report(&report);
      }
    }
    Command::Track { topics } => {
      for topic in topics {
        let topic = topic.trim();
        if topic.is_empty() {
          tracing::warn!("skipping blank topic");
          continue;
        }
        let added = store
          .track_topic(topic)
          .await
          .with_context(|| format!("failed to track {topic:?}"))?;
        if added {
          println!("tracking {topic}");
        } else {
          println!("already tracking {topic}");
        }
      }
    }
    Command::Topics => {
      let topics = store
        .list_tracked_topics()
        .await
        .context("failed to list tracked topics")?;
      for topic in topics {
        println!("{topic}");
      }
    }
    Command::Stats => {
      let stats = store.stats().await.context("failed to read stats")?;
      println!("contents      {}", stats.contents);
      println!("associations  {}", stats.associations);
      println!("topics        {}", stats.topics);
    }
  }

  Ok(())
}

fn print_report(report: &RunReport) {
  for t in &report.topics {
    let status = match &t.outcome {
      TopicOutcome::Committed => "committed".to_owned(),
      TopicOutcome::Unchanged => "unchanged".to_owned(),
      TopicOutcome::FetchFailed { reason } => format!("fetch failed: {reason}"),
      TopicOutcome::StoreFailed { reason } => format!("store failed: {reason}"),
    };
    println!(
      "{:<20} fetched {:>4}  new {:>4}  linked {:>4}  dup {:>3}  seen {:>4}  \
       invalid {:>3}  {status}",
      t.topic,
      t.fetched,
      t.content_inserted,
      t.associations_inserted,
      t.batch_duplicates,
      t.already_recorded,
      t.invalid,
    );
  }
  println!(
    "run {}: {} new contents, {} new associations, {} failed topics",
    report.run_id,
    report.content_inserted(),
    report.associations_inserted(),
    report.failed().count(),
  );
}
