//! Batch reconciliation: freshly scraped posts → write plan.
//!
//! Each post in a topic's batch lands in exactly one bucket:
//!
//! | Condition                                   | Bucket                       |
//! |---------------------------------------------|------------------------------|
//! | no hash, blank topic, or foreign topic      | `invalid`                    |
//! | hash already seen earlier in this batch     | discarded (batch duplicate)  |
//! | hash not in the index                       | `to_insert_content`          |
//! | hash in the index and linked to this topic  | discarded (already recorded) |
//! | hash in the index, not linked to this topic | `to_insert_association_only` |
//!
//! When several posts share a hash, the first one in the caller's order is
//! the survivor; later ones are counted as batch duplicates.

use std::collections::HashSet;

use crate::{
  Error, Result,
  content::ContentId,
  hash::IdentityHash,
  index::TopicIndex,
  post::Post,
};

/// A post whose content is not stored anywhere yet.
#[derive(Debug, Clone)]
pub struct PendingContent {
  pub identity_hash: IdentityHash,
  pub post:          Post,
}

/// A post whose content is already stored but not yet linked to the batch
/// topic.
#[derive(Debug, Clone)]
pub struct PendingAssociation {
  pub identity_hash: IdentityHash,
  /// Resolved from the index; the content row already exists.
  pub content_id:    ContentId,
  pub post:          Post,
}

/// The classified batch for one topic.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
  pub topic:                      String,
  pub to_insert_content:          Vec<PendingContent>,
  pub to_insert_association_only: Vec<PendingAssociation>,
  /// Posts dropped because an earlier post in the batch had the same hash.
  pub batch_duplicates:           usize,
  /// Posts dropped because their content is already linked to the topic.
  pub already_recorded:           usize,
  /// Posts rejected with [`Error::InvalidPost`].
  pub invalid:                    Vec<Error>,
}

impl Reconciliation {
  fn new(topic: &str) -> Self {
    Self { topic: topic.to_owned(), ..Self::default() }
  }

  /// True when the batch requires no store writes at all.
  pub fn is_empty(&self) -> bool {
    self.to_insert_content.is_empty()
      && self.to_insert_association_only.is_empty()
  }
}

/// Classify `posts`, all scraped under `topic`, against `index`.
///
/// Pure and infallible at the batch level: malformed posts are collected in
/// [`Reconciliation::invalid`] and the remaining posts are still classified.
pub fn reconcile(
  topic: &str,
  posts: Vec<Post>,
  index: &TopicIndex,
) -> Reconciliation {
  let mut out = Reconciliation::new(topic);
  let mut seen_in_batch: HashSet<IdentityHash> = HashSet::new();

  for post in posts {
    let identity_hash = match validate(topic, &post) {
      Ok(hash) => hash,
      Err(e) => {
        out.invalid.push(e);
        continue;
      }
    };

    if !seen_in_batch.insert(identity_hash.clone()) {
      out.batch_duplicates += 1;
      continue;
    }

    match index.get(&identity_hash) {
      None => out.to_insert_content.push(PendingContent { identity_hash, post }),
      Some(entry) if entry.topics.contains(topic) => out.already_recorded += 1,
      Some(entry) => out.to_insert_association_only.push(PendingAssociation {
        identity_hash,
        content_id: entry.content_id,
        post,
      }),
    }
  }

  out
}

fn validate(topic: &str, post: &Post) -> Result<IdentityHash> {
  if topic.trim().is_empty() {
    return Err(Error::invalid_post("batch topic is blank"));
  }
  if post.topic != topic {
    return Err(Error::invalid_post(format!(
      "post topic {:?} does not match batch topic {topic:?}",
      post.topic
    )));
  }
  post
    .identity_hash
    .clone()
    .ok_or_else(|| Error::invalid_post("post has no identity hash"))
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::content::IndexRow;

  fn post(topic: &str, text: &str, hash: &str) -> Post {
    let published_at = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    let mut p = Post::new(topic, text, published_at);
    p.identity_hash = Some(IdentityHash::new(hash));
    p
  }

  fn index(rows: &[(&str, i64, &str)]) -> TopicIndex {
    TopicIndex::from_rows(rows.iter().map(|(hash, id, topic)| IndexRow {
      identity_hash: IdentityHash::new(*hash),
      content_id:    ContentId(*id),
      topic:         Some((*topic).to_owned()),
    }))
  }

  fn hashes(pending: &[PendingContent]) -> Vec<&str> {
    pending.iter().map(|p| p.identity_hash.as_str()).collect()
  }

  #[test]
  fn empty_index_batch_duplicates_collapse() {
    let batch = vec![
      post("foo", "hello", "111"),
      post("foo", "hello", "111"),
      post("foo", "world", "222"),
    ];

    let rec = reconcile("foo", batch, &TopicIndex::new());

    assert_eq!(hashes(&rec.to_insert_content), ["111", "222"]);
    assert!(rec.to_insert_association_only.is_empty());
    assert_eq!(rec.batch_duplicates, 1);
    assert_eq!(rec.already_recorded, 0);
    assert!(rec.invalid.is_empty());
  }

  #[test]
  fn first_duplicate_in_caller_order_survives() {
    let mut first = post("foo", "hello", "111");
    first.author = Some("first".into());
    let mut second = post("foo", "hello", "111");
    second.author = Some("second".into());

    let rec = reconcile("foo", vec![first, second], &TopicIndex::new());

    assert_eq!(rec.to_insert_content.len(), 1);
    assert_eq!(rec.to_insert_content[0].post.author.as_deref(), Some("first"));
  }

  #[test]
  fn known_under_other_topic_needs_association_only() {
    let idx = index(&[("111", 5, "foo")]);

    let rec = reconcile("bar", vec![post("bar", "hello", "111")], &idx);

    assert!(rec.to_insert_content.is_empty());
    assert_eq!(rec.to_insert_association_only.len(), 1);
    assert_eq!(rec.to_insert_association_only[0].content_id, ContentId(5));
    assert!(!rec.is_empty());
  }

  #[test]
  fn known_under_same_topic_is_discarded() {
    let idx = index(&[("111", 5, "foo")]);

    let rec = reconcile("foo", vec![post("foo", "hello", "111")], &idx);

    assert!(rec.is_empty());
    assert_eq!(rec.already_recorded, 1);
    assert_eq!(rec.batch_duplicates, 0);
  }

  #[test]
  fn duplicates_of_association_only_post_link_once() {
    let idx = index(&[("111", 5, "foo")]);
    let batch = vec![post("bar", "hello", "111"), post("bar", "hello", "111")];

    let rec = reconcile("bar", batch, &idx);

    assert_eq!(rec.to_insert_association_only.len(), 1);
    assert_eq!(rec.batch_duplicates, 1);
  }

  #[test]
  fn mixed_batch_partitions_disjointly() {
    let idx = index(&[("111", 1, "foo"), ("222", 2, "bar")]);
    let batch = vec![
      post("foo", "a", "111"), // already recorded
      post("foo", "b", "222"), // association only
      post("foo", "c", "333"), // new
      post("foo", "c", "333"), // batch duplicate
      post("foo", "b", "222"), // batch duplicate
    ];

    let rec = reconcile("foo", batch, &idx);

    assert_eq!(hashes(&rec.to_insert_content), ["333"]);
    assert_eq!(rec.to_insert_association_only.len(), 1);
    assert_eq!(rec.to_insert_association_only[0].identity_hash.as_str(), "222");
    assert_eq!(rec.already_recorded, 1);
    assert_eq!(rec.batch_duplicates, 2);
  }

  #[test]
  fn missing_hash_is_invalid_not_fatal() {
    let mut unhashed = post("foo", "hello", "111");
    unhashed.identity_hash = None;
    let batch = vec![unhashed, post("foo", "world", "222")];

    let rec = reconcile("foo", batch, &TopicIndex::new());

    assert_eq!(rec.invalid.len(), 1);
    assert!(matches!(rec.invalid[0], Error::InvalidPost { .. }));
    assert_eq!(hashes(&rec.to_insert_content), ["222"]);
  }

  #[test]
  fn foreign_topic_is_invalid() {
    let rec = reconcile("foo", vec![post("bar", "x", "111")], &TopicIndex::new());
    assert_eq!(rec.invalid.len(), 1);
    assert!(rec.is_empty());
  }

  #[test]
  fn blank_topic_rejects_everything() {
    let rec = reconcile(" ", vec![post(" ", "x", "111")], &TopicIndex::new());
    assert_eq!(rec.invalid.len(), 1);
    assert!(rec.is_empty());
  }

  #[test]
  fn invalid_post_does_not_claim_its_hash() {
    let foreign = post("bar", "hello", "111");
    let batch = vec![foreign, post("foo", "hello", "111")];

    let rec = reconcile("foo", batch, &TopicIndex::new());

    assert_eq!(rec.invalid.len(), 1);
    assert_eq!(hashes(&rec.to_insert_content), ["111"]);
    assert_eq!(rec.batch_duplicates, 0);
  }
}
