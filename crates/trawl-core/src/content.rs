//! Persistent record types: stored content, topic associations, and the row
//! shapes exchanged with a [`ContentStore`](crate::store::ContentStore).
//!
//! Stored content is written once per identity hash and never updated.
//! Associations are append-only; the core never removes one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{hash::IdentityHash, post::PostMetrics};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Store-assigned identifier of a [`StoredContent`] row.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct ContentId(pub i64);

impl fmt::Display for ContentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── Persistent records ──────────────────────────────────────────────────────

/// One unique piece of content. At most one exists per `identity_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredContent {
  pub content_id:    ContentId,
  pub identity_hash: IdentityHash,
  pub text:          String,
  pub metrics:       PostMetrics,
  pub published_at:  DateTime<Utc>,
  pub retrieved_at:  DateTime<Utc>,
  pub author:        Option<String>,
  pub source:        Option<String>,
}

/// Records that a piece of content was discovered while scraping `topic`.
/// Unique per `(content_id, topic)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
  pub content_id:  ContentId,
  pub topic:       String,
  /// Server-assigned timestamp; never changes after creation.
  pub recorded_at: DateTime<Utc>,
}

// ─── Write rows ──────────────────────────────────────────────────────────────

/// Input row for [`ContentStore::insert_content_batch`](crate::store::ContentStore::insert_content_batch).
#[derive(Debug, Clone)]
pub struct NewContent {
  pub identity_hash: IdentityHash,
  pub text:          String,
  pub metrics:       PostMetrics,
  pub published_at:  DateTime<Utc>,
  pub retrieved_at:  DateTime<Utc>,
  pub author:        Option<String>,
  pub source:        Option<String>,
}

/// Result row of a content insert, one per input row and in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedContent {
  pub identity_hash: IdentityHash,
  pub content_id:    ContentId,
  /// `false` when another writer already stored this hash; the existing id is
  /// returned and the caller should only link it.
  pub created:       bool,
}

/// Input row for [`ContentStore::insert_association_batch`](crate::store::ContentStore::insert_association_batch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssociation {
  pub content_id: ContentId,
  pub topic:      String,
}

// ─── Read rows ───────────────────────────────────────────────────────────────

/// One row of the association scan used to build a
/// [`TopicIndex`](crate::index::TopicIndex). Content with no association at
/// all appears once with `topic: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
  pub identity_hash: IdentityHash,
  pub content_id:    ContentId,
  pub topic:         Option<String>,
}

/// Row counts across the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
  pub contents:     u64,
  pub associations: u64,
  /// Distinct topics with at least one association.
  pub topics:       u64,
}
