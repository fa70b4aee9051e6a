//! Post — a single scraped item, before it is reconciled against the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::{IdentityHash, normalize_text};

/// Engagement counters reported by the source. Carried through to storage
/// untouched; nothing in the core interprets them.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct PostMetrics {
  pub likes:    u64,
  pub shares:   u64,
  pub comments: u64,
}

/// A post as produced by a [`Fetcher`](crate::fetch::Fetcher).
///
/// `identity_hash` is `None` on arrival and is filled in by [`Post::hashed`]
/// before the post reaches the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
  pub text:          String,
  pub identity_hash: Option<IdentityHash>,
  /// The topic this post was scraped under.
  pub topic:         String,
  pub metrics:       PostMetrics,
  pub published_at:  DateTime<Utc>,
  pub retrieved_at:  DateTime<Utc>,
  /// Display name of the author, when the source exposes it.
  pub author:        Option<String>,
  /// Posting client or device label, when the source exposes it.
  pub source:        Option<String>,
}

impl Post {
  /// Convenience constructor: unhashed, zero metrics, retrieved now.
  pub fn new(
    topic: impl Into<String>,
    text: impl Into<String>,
    published_at: DateTime<Utc>,
  ) -> Self {
    Self {
      text: text.into(),
      identity_hash: None,
      topic: topic.into(),
      metrics: PostMetrics::default(),
      published_at,
      retrieved_at: Utc::now(),
      author: None,
      source: None,
    }
  }

  /// Normalise the text and assign its identity hash.
  ///
  /// Text that normalises to nothing gets no hash, so the reconciler rejects
  /// it as an invalid post rather than storing an empty record.
  pub fn hashed(mut self) -> Self {
    self.text = normalize_text(&self.text);
    self.identity_hash = if self.text.is_empty() {
      None
    } else {
      Some(IdentityHash::of_normalized(&self.text))
    };
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashed_normalises_text_and_sets_hash() {
    let post = Post::new("foo", "  hello\n world ", Utc::now()).hashed();
    assert_eq!(post.text, "hello world");
    assert_eq!(post.identity_hash, Some(IdentityHash::of("hello world")));
  }

  #[test]
  fn blank_text_gets_no_hash() {
    let post = Post::new("foo", " \n ", Utc::now()).hashed();
    assert!(post.identity_hash.is_none());
  }
}
