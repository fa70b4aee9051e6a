//! [`FileFetcher`] — reads a topic's posts from `<posts_dir>/<topic>.json`.
//!
//! Each file holds a JSON array of [`FetchedPost`] objects, typically dumped
//! by an external scraper. A missing or malformed file is a fetch failure for
//! that topic; the run carries on with the next one.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use trawl_core::{
  fetch::Fetcher,
  post::{Post, PostMetrics},
};

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to read {path}: {source}")]
  Io {
    path:   String,
    source: std::io::Error,
  },
  #[error("failed to parse {path}: {source}")]
  Parse {
    path:   String,
    source: serde_json::Error,
  },
  #[error("topic {0:?} cannot be used as a file name")]
  BadTopic(String),
}

/// One post as written by the scraper.
#[derive(Debug, Deserialize)]
pub struct FetchedPost {
  pub text:         String,
  #[serde(default)]
  pub author:       Option<String>,
  #[serde(default)]
  pub source:       Option<String>,
  pub published_at: DateTime<Utc>,
  #[serde(default)]
  pub retrieved_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub likes:        u64,
  #[serde(default)]
  pub shares:       u64,
  #[serde(default)]
  pub comments:     u64,
}

impl FetchedPost {
  fn into_post(self, topic: &str, now: DateTime<Utc>) -> Post {
    Post {
      text:          self.text,
      identity_hash: None,
      topic:         topic.to_owned(),
      metrics:       PostMetrics {
        likes:    self.likes,
        shares:   self.shares,
        comments: self.comments,
      },
      published_at:  self.published_at,
      retrieved_at:  self.retrieved_at.unwrap_or(now),
      author:        self.author,
      source:        self.source,
    }
  }
}

#[derive(Debug, Clone)]
pub struct FileFetcher {
  posts_dir: PathBuf,
}

impl FileFetcher {
  pub fn new(posts_dir: impl Into<PathBuf>) -> Self {
    Self { posts_dir: posts_dir.into() }
  }

  fn path_for(&self, topic: &str) -> Result<PathBuf, FetchError> {
    if topic == "."
      || topic == ".."
      || topic.contains(['/', '\\'])
      || topic.contains('\0')
    {
      return Err(FetchError::BadTopic(topic.to_owned()));
    }
    Ok(self.posts_dir.join(format!("{topic}.json")))
  }
}

impl Fetcher for FileFetcher {
  type Error = FetchError;

  async fn fetch(&self, topic: &str) -> Result<Vec<Post>, FetchError> {
    let path = self.path_for(topic)?;
    let path_str = path.display().to_string();

    let raw = tokio::fs::read_to_string(&path)
      .await
      .map_err(|source| FetchError::Io { path: path_str.clone(), source })?;
    let fetched: Vec<FetchedPost> = serde_json::from_str(&raw)
      .map_err(|source| FetchError::Parse { path: path_str.clone(), source })?;

    let now = Utc::now();
    let total = fetched.len();
    let posts: Vec<Post> = fetched
      .into_iter()
      .filter(|p| !p.text.trim().is_empty())
      .map(|p| p.into_post(topic, now))
      .collect();

    if posts.len() < total {
      tracing::debug!(
        %topic,
        skipped = total - posts.len(),
        "skipped posts with blank text"
      );
    }
    tracing::debug!(%topic, path = %path_str, posts = posts.len(), "read feed");
    Ok(posts)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_feed(dir: &std::path::Path, topic: &str, body: &str) {
    std::fs::write(dir.join(format!("{topic}.json")), body).unwrap();
  }

  #[tokio::test]
  async fn reads_posts_for_topic() {
    let dir = tempfile::tempdir().unwrap();
    write_feed(
      dir.path(),
      "rust",
      r#"[
        {
          "text": "hello  world",
          "author": "ferris",
          "published_at": "2024-05-01T12:00:00Z",
          "retrieved_at": "2024-05-02T08:00:00Z",
          "likes": 3,
          "comments": 1
        },
        { "text": "second", "published_at": "2024-05-01T13:00:00Z" }
      ]"#,
    );

    let posts = FileFetcher::new(dir.path()).fetch("rust").await.unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].topic, "rust");
    assert_eq!(posts[0].text, "hello  world");
    assert!(posts[0].identity_hash.is_none());
    assert_eq!(posts[0].author.as_deref(), Some("ferris"));
    assert_eq!(posts[0].metrics, PostMetrics { likes: 3, shares: 0, comments: 1 });
    assert_eq!(posts[0].retrieved_at.to_rfc3339(), "2024-05-02T08:00:00+00:00");
    assert_eq!(posts[1].source, None);
  }

  #[tokio::test]
  async fn blank_text_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_feed(
      dir.path(),
      "rust",
      r#"[
        { "text": "   ", "published_at": "2024-05-01T12:00:00Z" },
        { "text": "kept", "published_at": "2024-05-01T12:00:00Z" }
      ]"#,
    );

    let posts = FileFetcher::new(dir.path()).fetch("rust").await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text, "kept");
  }

  #[tokio::test]
  async fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileFetcher::new(dir.path()).fetch("absent").await.unwrap_err();
    assert!(matches!(err, FetchError::Io { .. }));
  }

  #[tokio::test]
  async fn errors_name_the_feed_file() {
    let dir = tempfile::tempdir().unwrap();
    write_feed(dir.path(), "rust", "[1, 2]");
    let fetcher = FileFetcher::new(dir.path());

    let missing = fetcher.fetch("absent").await.unwrap_err().to_string();
    assert!(missing.contains("absent.json"), "{missing}");

    let bad = fetcher.fetch("rust").await.unwrap_err().to_string();
    assert!(bad.starts_with("failed to parse"), "{bad}");
    assert!(bad.contains("rust.json"), "{bad}");
  }

  #[tokio::test]
  async fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    write_feed(dir.path(), "rust", "{ not json");
    let err = FileFetcher::new(dir.path()).fetch("rust").await.unwrap_err();
    assert!(matches!(err, FetchError::Parse { .. }));
  }

  #[tokio::test]
  async fn path_like_topics_are_rejected() {
    let fetcher = FileFetcher::new("/tmp");
    for topic in ["..", ".", "a/b", "a\\b"] {
      let err = fetcher.fetch(topic).await.unwrap_err();
      assert!(matches!(err, FetchError::BadTopic(_)), "{topic}");
    }
  }
}
