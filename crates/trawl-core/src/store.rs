//! The `ContentStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `trawl-store-sqlite`).
//! The run driver and the persistence builder depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use crate::{
  content::{
    Association, ContentId, IndexRow, InsertedContent, NewAssociation,
    NewContent, StoreStats, StoredContent,
  },
  hash::IdentityHash,
};

/// Abstraction over a deduplicated content store.
///
/// Content rows are write-once: a second insert of the same identity hash must
/// never create a second row. Association rows are unique per
/// `(content_id, topic)` and inserting an existing pair is a no-op.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait ContentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Index scan ────────────────────────────────────────────────────────

  /// Scan every stored content hash together with each topic it is
  /// associated with.
  fn load_topic_index(
    &self,
  ) -> impl Future<Output = Result<Vec<IndexRow>, Self::Error>> + Send + '_;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert content rows, returning exactly one [`InsertedContent`] per input
  /// row, in input order.
  ///
  /// A hash that already exists (for instance, stored by a concurrent writer
  /// since the caller's index was loaded) is not an error: its existing id is
  /// returned with `created: false`.
  fn insert_content_batch(
    &self,
    rows: Vec<NewContent>,
  ) -> impl Future<Output = Result<Vec<InsertedContent>, Self::Error>> + Send + '_;

  /// Insert association rows, returning how many were actually created.
  /// Pairs that already exist are silently skipped.
  fn insert_association_batch(
    &self,
    rows: Vec<NewAssociation>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Open a transaction covering the writes for one topic.
  fn begin_transaction(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn commit(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn rollback(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve content by identity hash. Returns `None` if not stored.
  fn get_content<'a>(
    &'a self,
    hash: &'a IdentityHash,
  ) -> impl Future<Output = Result<Option<StoredContent>, Self::Error>> + Send + 'a;

  /// All topic associations of one piece of content, oldest first.
  fn list_associations(
    &self,
    content_id: ContentId,
  ) -> impl Future<Output = Result<Vec<Association>, Self::Error>> + Send + '_;

  fn stats(
    &self,
  ) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send + '_;

  // ── Tracked topics ────────────────────────────────────────────────────

  /// Add `topic` to the tracked list. Returns `false` if it was already
  /// tracked.
  fn track_topic<'a>(
    &'a self,
    topic: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Every tracked topic, in the order it was added.
  fn list_tracked_topics(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}
