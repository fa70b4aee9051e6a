//! Bulk persistence: reconciliation → two ordered store writes.
//!
//! Content rows go first so every association can reference an id that
//! already exists. Associations for freshly inserted content take their id
//! from the content insert; association-only posts take theirs from the index.
//! If the content insert fails, no association write is issued.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
  content::{ContentId, NewAssociation, NewContent},
  hash::IdentityHash,
  reconcile::{PendingContent, Reconciliation},
  store::ContentStore,
};

/// What one topic's writes produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicCommit {
  pub topic:                 String,
  /// Content rows this commit created. Rows another writer stored first are
  /// linked but not counted here.
  pub content_inserted:      usize,
  pub associations_inserted: usize,
  /// Every `(hash, content_id)` now linked to `topic`.
  pub entries:               Vec<(IdentityHash, ContentId)>,
}

/// Build content insert rows, carrying every field of the surviving post.
pub fn content_rows(pending: &[PendingContent]) -> Vec<NewContent> {
  pending
    .iter()
    .map(|p| NewContent {
      identity_hash: p.identity_hash.clone(),
      text:          p.post.text.clone(),
      metrics:       p.post.metrics,
      published_at:  p.post.published_at,
      retrieved_at:  p.post.retrieved_at,
      author:        p.post.author.clone(),
      source:        p.post.source.clone(),
    })
    .collect()
}

/// Build association rows linking each content id to `topic`. Repeated ids
/// are emitted once, in first-seen order.
pub fn association_rows(
  topic: &str,
  content_ids: impl IntoIterator<Item = ContentId>,
) -> Vec<NewAssociation> {
  let mut seen = HashSet::new();
  content_ids
    .into_iter()
    .filter(|id| seen.insert(*id))
    .map(|content_id| NewAssociation { content_id, topic: topic.to_owned() })
    .collect()
}

/// Issue the writes for one reconciled batch against `store`.
///
/// The caller owns the surrounding transaction; an error here leaves it to
/// the caller to roll back.
pub async fn persist<S: ContentStore>(
  store: &S,
  rec: &Reconciliation,
) -> Result<TopicCommit, S::Error> {
  let mut commit = TopicCommit {
    topic: rec.topic.clone(),
    ..TopicCommit::default()
  };

  if !rec.to_insert_content.is_empty() {
    let inserted = store
      .insert_content_batch(content_rows(&rec.to_insert_content))
      .await?;

    for row in inserted {
      if row.created {
        commit.content_inserted += 1;
      } else {
        tracing::debug!(
          topic = %rec.topic,
          hash = %row.identity_hash,
          content_id = %row.content_id,
          "content stored concurrently; linking existing row",
        );
      }
      commit.entries.push((row.identity_hash, row.content_id));
    }
  }

  commit.entries.extend(
    rec
      .to_insert_association_only
      .iter()
      .map(|p| (p.identity_hash.clone(), p.content_id)),
  );

  let rows =
    association_rows(&rec.topic, commit.entries.iter().map(|(_, id)| *id));
  if !rows.is_empty() {
    commit.associations_inserted = store.insert_association_batch(rows).await?;
  }

  Ok(commit)
}
