//! The run driver: topic sequence → fetch → reconcile → persist → commit.
//!
//! Topics are processed sequentially, each in its own store transaction, so a
//! failing topic never rolls back the ones before it. Failures are reported
//! per topic; only an unreadable store at the start of a run is returned as
//! an error.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Instrument as _, debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
  fetch::Fetcher,
  index::TopicIndex,
  persist::{TopicCommit, persist},
  post::Post,
  reconcile::{Reconciliation, reconcile},
  store::ContentStore,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// How the existing-association index is kept current across topics.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IndexRefresh {
  /// Load once per run, then fold each topic's commit in memory.
  #[default]
  Incremental,
  /// Rescan the store before every topic.
  Reload,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
  pub index_refresh: IndexRefresh,
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// How a topic's processing ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TopicOutcome {
  /// New content or associations were written and committed.
  Committed,
  /// Everything fetched was already recorded; no transaction was opened.
  Unchanged,
  /// The fetcher failed; the topic is retried next run.
  FetchFailed { reason: String },
  /// A store write failed and the topic's transaction was rolled back.
  StoreFailed { reason: String },
}

impl TopicOutcome {
  pub fn is_failure(&self) -> bool {
    matches!(self, Self::FetchFailed { .. } | Self::StoreFailed { .. })
  }
}

/// Per-topic counts for one run.
#[derive(Debug, Clone, Serialize)]
pub struct TopicReport {
  pub topic:                 String,
  pub outcome:               TopicOutcome,
  pub fetched:               usize,
  pub content_inserted:      usize,
  pub associations_inserted: usize,
  pub batch_duplicates:      usize,
  pub already_recorded:      usize,
  pub invalid:               usize,
}

impl TopicReport {
  fn new(topic: &str) -> Self {
    Self {
      topic:                 topic.to_owned(),
      outcome:               TopicOutcome::Unchanged,
      fetched:               0,
      content_inserted:      0,
      associations_inserted: 0,
      batch_duplicates:      0,
      already_recorded:      0,
      invalid:               0,
    }
  }
}

/// The aggregate result of [`Harvester::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub run_id:      Uuid,
  pub started_at:  DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub topics:      Vec<TopicReport>,
}

impl RunReport {
  pub fn content_inserted(&self) -> usize {
    self.topics.iter().map(|t| t.content_inserted).sum()
  }

  pub fn associations_inserted(&self) -> usize {
    self.topics.iter().map(|t| t.associations_inserted).sum()
  }

  /// Topics whose fetch or store writes failed.
  pub fn failed(&self) -> impl Iterator<Item = &TopicReport> {
    self.topics.iter().filter(|t| t.outcome.is_failure())
  }

  pub fn topic(&self, topic: &str) -> Option<&TopicReport> {
    self.topics.iter().find(|t| t.topic == topic)
  }
}

// ─── Harvester ───────────────────────────────────────────────────────────────

/// Drives harvest runs against an explicitly supplied store and fetcher.
pub struct Harvester<S, F> {
  store:   S,
  fetcher: F,
  options: RunOptions,
}

impl<S, F> Harvester<S, F>
where
  S: ContentStore,
  F: Fetcher,
{
  pub fn new(store: S, fetcher: F) -> Self {
    Self { store, fetcher, options: RunOptions::default() }
  }

  pub fn with_options(mut self, options: RunOptions) -> Self {
    self.options = options;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  /// Harvest every topic in `topics`, in order.
  ///
  /// Blank topics are skipped and repeated topics are processed once. Returns
  /// an error only if the initial index scan fails; every per-topic failure
  /// is recorded in the report instead.
  pub async fn run<I>(&self, topics: I) -> Result<RunReport, S::Error>
  where
    I: IntoIterator,
    I::Item: Into<String>,
  {
    let run_id = Uuid::new_v4();
    let topics = distinct_topics(topics);
    self
      .run_topics(run_id, topics)
      .instrument(info_span!("run", %run_id))
      .await
  }

  async fn run_topics(
    &self,
    run_id: Uuid,
    topics: Vec<String>,
  ) -> Result<RunReport, S::Error> {
    let started_at = Utc::now();
    let mut index = TopicIndex::load(&self.store).await?;
    info!(topics = topics.len(), known_hashes = index.len(), "starting run");

    let mut reports = Vec::with_capacity(topics.len());
    for (position, topic) in topics.iter().enumerate() {
      if position > 0 && self.options.index_refresh == IndexRefresh::Reload {
        match TopicIndex::load(&self.store).await {
          Ok(fresh) => index = fresh,
          Err(e) => {
            warn!(%topic, error = %e, "index reload failed; skipping topic");
            let mut report = TopicReport::new(topic);
            report.outcome = TopicOutcome::StoreFailed { reason: e.to_string() };
            reports.push(report);
            continue;
          }
        }
      }
      reports.push(self.harvest_topic(topic, &mut index).await);
    }

    let report = RunReport {
      run_id,
      started_at,
      finished_at: Utc::now(),
      topics: reports,
    };
    info!(
      content_inserted = report.content_inserted(),
      associations_inserted = report.associations_inserted(),
      failed = report.failed().count(),
      "run finished",
    );
    Ok(report)
  }

  /// Fetch, reconcile and commit a single topic against `index`.
  ///
  /// On success the commit is folded into `index`; on failure `index` is left
  /// untouched.
  pub async fn harvest_topic(
    &self,
    topic: &str,
    index: &mut TopicIndex,
  ) -> TopicReport {
    let mut report = TopicReport::new(topic);

    let posts = match self.fetcher.fetch(topic).await {
      Ok(posts) => posts,
      Err(e) => {
        warn!(%topic, error = %e, "fetch failed; skipping topic this run");
        report.outcome = TopicOutcome::FetchFailed { reason: e.to_string() };
        return report;
      }
    };
    report.fetched = posts.len();

    let posts: Vec<Post> = posts.into_iter().map(Post::hashed).collect();
    let rec = reconcile(topic, posts, index);
    report.batch_duplicates = rec.batch_duplicates;
    report.already_recorded = rec.already_recorded;
    report.invalid = rec.invalid.len();
    for e in &rec.invalid {
      warn!(%topic, error = %e, "dropping post");
    }

    if rec.is_empty() {
      debug!(%topic, fetched = report.fetched, "nothing new");
      return report;
    }

    match self.commit_topic(&rec).await {
      Ok(commit) => {
        index.apply(&commit);
        report.content_inserted = commit.content_inserted;
        report.associations_inserted = commit.associations_inserted;
        report.outcome = TopicOutcome::Committed;
        info!(
          %topic,
          fetched = report.fetched,
          content_inserted = commit.content_inserted,
          associations_inserted = commit.associations_inserted,
          "topic committed",
        );
      }
      Err(e) => {
        warn!(%topic, error = %e, "store write failed; topic rolled back");
        report.outcome = TopicOutcome::StoreFailed { reason: e.to_string() };
      }
    }

    report
  }

  async fn commit_topic(
    &self,
    rec: &Reconciliation,
  ) -> Result<TopicCommit, S::Error> {
    self.store.begin_transaction().await?;

    let result = match persist(&self.store, rec).await {
      Ok(commit) => self.store.commit().await.map(|()| commit),
      Err(e) => Err(e),
    };

    if result.is_err()
      && let Err(e) = self.store.rollback().await
    {
      warn!(topic = %rec.topic, error = %e, "rollback failed");
    }
    result
  }
}

/// Trim, drop blanks, and keep the first occurrence of each topic.
fn distinct_topics<I>(topics: I) -> Vec<String>
where
  I: IntoIterator,
  I::Item: Into<String>,
{
  let mut seen = HashSet::new();
  let mut out = Vec::new();
  for topic in topics {
    let topic: String = topic.into();
    let topic = topic.trim();
    if topic.is_empty() {
      warn!("skipping blank topic");
      continue;
    }
    if seen.insert(topic.to_owned()) {
      out.push(topic.to_owned());
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn distinct_topics_trims_and_dedupes() {
    let topics = distinct_topics(["foo", " bar ", "", "foo", "  ", "bar"]);
    assert_eq!(topics, ["foo", "bar"]);
  }

  #[test]
  fn outcome_failure_classification() {
    assert!(!TopicOutcome::Committed.is_failure());
    assert!(!TopicOutcome::Unchanged.is_failure());
    assert!(TopicOutcome::FetchFailed { reason: "x".into() }.is_failure());
    assert!(TopicOutcome::StoreFailed { reason: "x".into() }.is_failure());
  }

  #[test]
  fn report_totals() {
    let mut a = TopicReport::new("a");
    a.content_inserted = 2;
    a.associations_inserted = 3;
    a.outcome = TopicOutcome::Committed;
    let mut b = TopicReport::new("b");
    b.associations_inserted = 1;
    b.outcome = TopicOutcome::FetchFailed { reason: "offline".into() };

    let report = RunReport {
      run_id:      Uuid::nil(),
      started_at:  Utc::now(),
      finished_at: Utc::now(),
      topics:      vec![a, b],
    };

    assert_eq!(report.content_inserted(), 2);
    assert_eq!(report.associations_inserted(), 4);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.topic("b").map(|t| t.fetched), Some(0));
  }
}
