//! The existing-association index.
//!
//! A point-in-time map from identity hash to the stored content id and the
//! set of topics already linked to it. The run driver loads it once and then
//! folds each committed topic back in with [`TopicIndex::apply`], so later
//! topics in the same run see what earlier topics created.

use std::collections::{BTreeSet, HashMap};

use crate::{
  content::{ContentId, IndexRow},
  hash::IdentityHash,
  persist::TopicCommit,
  store::ContentStore,
};

/// What the store already knows about one identity hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
  pub content_id: ContentId,
  pub topics:     BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TopicIndex {
  entries: HashMap<IdentityHash, IndexEntry>,
}

impl TopicIndex {
  pub fn new() -> Self { Self::default() }

  /// Build the index from the rows of a single association scan.
  pub fn from_rows(rows: impl IntoIterator<Item = IndexRow>) -> Self {
    let mut index = Self::new();
    for row in rows {
      index.insert(row.identity_hash, row.content_id, row.topic);
    }
    index
  }

  /// Scan `store` and build a fresh index.
  pub async fn load<S: ContentStore>(store: &S) -> Result<Self, S::Error> {
    let rows = store.load_topic_index().await?;
    let index = Self::from_rows(rows);
    tracing::debug!(hashes = index.len(), "loaded topic index");
    Ok(index)
  }

  /// True iff the hash is stored at all, regardless of topic.
  pub fn contains(&self, hash: &IdentityHash) -> bool {
    self.entries.contains_key(hash)
  }

  /// True iff the hash is stored and already associated with `topic`.
  pub fn has_topic(&self, hash: &IdentityHash, topic: &str) -> bool {
    self
      .entries
      .get(hash)
      .is_some_and(|entry| entry.topics.contains(topic))
  }

  pub fn content_id(&self, hash: &IdentityHash) -> Option<ContentId> {
    self.entries.get(hash).map(|entry| entry.content_id)
  }

  pub fn get(&self, hash: &IdentityHash) -> Option<&IndexEntry> {
    self.entries.get(hash)
  }

  /// Record `hash` as stored under `content_id`, optionally linked to
  /// `topic`. The first content id seen for a hash wins.
  pub fn insert(
    &mut self,
    hash: IdentityHash,
    content_id: ContentId,
    topic: Option<String>,
  ) {
    let entry = self.entries.entry(hash).or_insert_with(|| IndexEntry {
      content_id,
      topics: BTreeSet::new(),
    });
    if let Some(topic) = topic {
      entry.topics.insert(topic);
    }
  }

  /// Fold a committed topic into the index.
  pub fn apply(&mut self, commit: &TopicCommit) {
    for (hash, content_id) in &commit.entries {
      self.insert(hash.clone(), *content_id, Some(commit.topic.clone()));
    }
  }

  /// Number of distinct hashes.
  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(hash: &str, id: i64, topic: Option<&str>) -> IndexRow {
    IndexRow {
      identity_hash: IdentityHash::new(hash),
      content_id:    ContentId(id),
      topic:         topic.map(str::to_owned),
    }
  }

  #[test]
  fn rows_group_by_hash() {
    let index = TopicIndex::from_rows([
      row("111", 1, Some("foo")),
      row("111", 1, Some("bar")),
      row("222", 2, Some("foo")),
    ]);

    assert_eq!(index.len(), 2);
    let h111 = IdentityHash::new("111");
    assert!(index.has_topic(&h111, "foo"));
    assert!(index.has_topic(&h111, "bar"));
    assert!(!index.has_topic(&h111, "baz"));
    assert_eq!(index.content_id(&h111), Some(ContentId(1)));
  }

  #[test]
  fn unassociated_content_is_still_contained() {
    let index = TopicIndex::from_rows([row("333", 3, None)]);
    let h = IdentityHash::new("333");

    assert!(index.contains(&h));
    assert!(!index.has_topic(&h, "foo"));
    assert!(index.get(&h).unwrap().topics.is_empty());
  }

  #[test]
  fn unknown_hash() {
    let index = TopicIndex::new();
    let h = IdentityHash::new("999");
    assert!(index.is_empty());
    assert!(!index.contains(&h));
    assert!(!index.has_topic(&h, "foo"));
    assert_eq!(index.content_id(&h), None);
  }

  #[test]
  fn apply_merges_commit() {
    let mut index = TopicIndex::from_rows([row("111", 1, Some("foo"))]);

    index.apply(&TopicCommit {
      topic:                 "bar".into(),
      content_inserted:      1,
      associations_inserted: 2,
      entries:               vec![
        (IdentityHash::new("111"), ContentId(1)),
        (IdentityHash::new("222"), ContentId(7)),
      ],
    });

    assert!(index.has_topic(&IdentityHash::new("111"), "foo"));
    assert!(index.has_topic(&IdentityHash::new("111"), "bar"));
    assert!(index.has_topic(&IdentityHash::new("222"), "bar"));
    assert_eq!(index.content_id(&IdentityHash::new("222")), Some(ContentId(7)));
  }
}
