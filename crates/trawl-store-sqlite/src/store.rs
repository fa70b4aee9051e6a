//! [`SqliteStore`] — the SQLite implementation of [`ContentStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use trawl_core::{
  content::{
    Association, ContentId, IndexRow, InsertedContent, NewAssociation,
    NewContent, StoreStats, StoredContent,
  },
  hash::IdentityHash,
  store::ContentStore,
};

use crate::{
  Result,
  encode::{EncodedContent, RawAssociation, RawContent, decode_count, encode_dt},
  schema::SCHEMA,
};

const SELECT_CONTENT: &str = "
  SELECT content_id, identity_hash, text, likes, shares, comments,
         published_at, retrieved_at, author, source
  FROM contents";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A trawl content store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All clones
/// share one connection, so a transaction opened through one clone covers
/// writes issued through any other.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("sqlite schema ready");
    Ok(())
  }

  async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection; lets tests install failure triggers.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self.execute_batch(sql).await
  }
}

// ─── ContentStore impl ───────────────────────────────────────────────────────

impl ContentStore for SqliteStore {
  type Error = crate::Error;

  // ── Index scan ────────────────────────────────────────────────────────────

  async fn load_topic_index(&self) -> Result<Vec<IndexRow>> {
    let raws: Vec<(String, i64, Option<String>)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT c.identity_hash, c.content_id, a.topic
           FROM contents c
           LEFT JOIN associations a ON a.content_id = c.content_id",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      raws
        .into_iter()
        .map(|(hash, content_id, topic)| IndexRow {
          identity_hash: IdentityHash::new(hash),
          content_id: ContentId(content_id),
          topic,
        })
        .collect(),
    )
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert_content_batch(
    &self,
    rows: Vec<NewContent>,
  ) -> Result<Vec<InsertedContent>> {
    let encoded: Vec<EncodedContent> =
      rows.into_iter().map(EncodedContent::from).collect();

    let results: Vec<(String, i64, bool)> = self
      .conn
      .call(move |conn| {
        let mut insert = conn.prepare_cached(
          "INSERT INTO contents (
             identity_hash, text, likes, shares, comments,
             published_at, retrieved_at, author, source
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
           ON CONFLICT (identity_hash) DO NOTHING",
        )?;
        let mut lookup = conn.prepare_cached(
          "SELECT content_id FROM contents WHERE identity_hash = ?1",
        )?;

        let mut out = Vec::with_capacity(encoded.len());
        for row in encoded {
          let changed = insert.execute(rusqlite::params![
            row.identity_hash,
            row.text,
            row.likes,
            row.shares,
            row.comments,
            row.published_at,
            row.retrieved_at,
            row.author,
            row.source,
          ])?;

          let (content_id, created) = if changed == 1 {
            (conn.last_insert_rowid(), true)
          } else {
            let id: i64 = lookup
              .query_row(rusqlite::params![row.identity_hash], |r| r.get(0))?;
            (id, false)
          };
          out.push((row.identity_hash, content_id, created));
        }
        Ok(out)
      })
      .await?;

    Ok(
      results
        .into_iter()
        .map(|(hash, content_id, created)| InsertedContent {
          identity_hash: IdentityHash::new(hash),
          content_id: ContentId(content_id),
          created,
        })
        .collect(),
    )
  }

  async fn insert_association_batch(
    &self,
    rows: Vec<NewAssociation>,
  ) -> Result<usize> {
    let at_str = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "INSERT OR IGNORE INTO associations (content_id, topic, recorded_at)
           VALUES (?1, ?2, ?3)",
        )?;
        let mut inserted = 0;
        for row in rows {
          inserted += stmt.execute(rusqlite::params![
            row.content_id.0,
            row.topic,
            at_str,
          ])?;
        }
        Ok(inserted)
      })
      .await?;

    Ok(inserted)
  }

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn begin_transaction(&self) -> Result<()> {
    self.execute_batch("BEGIN IMMEDIATE").await
  }

  async fn commit(&self) -> Result<()> { self.execute_batch("COMMIT").await }

  async fn rollback(&self) -> Result<()> {
    self.execute_batch("ROLLBACK").await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_content(
    &self,
    hash: &IdentityHash,
  ) -> Result<Option<StoredContent>> {
    let hash_str = hash.as_str().to_owned();

    let raw: Option<RawContent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SELECT_CONTENT} WHERE identity_hash = ?1"),
              rusqlite::params![hash_str],
              |row| {
                Ok(RawContent {
                  content_id:    row.get(0)?,
                  identity_hash: row.get(1)?,
                  text:          row.get(2)?,
                  likes:         row.get(3)?,
                  shares:        row.get(4)?,
                  comments:      row.get(5)?,
                  published_at:  row.get(6)?,
                  retrieved_at:  row.get(7)?,
                  author:        row.get(8)?,
                  source:        row.get(9)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContent::into_content).transpose()
  }

  async fn list_associations(
    &self,
    content_id: ContentId,
  ) -> Result<Vec<Association>> {
    let raws: Vec<RawAssociation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT content_id, topic, recorded_at
           FROM associations
           WHERE content_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![content_id.0], |row| {
            Ok(RawAssociation {
              content_id:  row.get(0)?,
              topic:       row.get(1)?,
              recorded_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAssociation::into_association).collect()
  }

  async fn stats(&self) -> Result<StoreStats> {
    let (contents, associations, topics): (i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM contents),
             (SELECT COUNT(*) FROM associations),
             (SELECT COUNT(DISTINCT topic) FROM associations)",
          [],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?)
      })
      .await?;

    Ok(StoreStats {
      contents:     decode_count(contents)?,
      associations: decode_count(associations)?,
      topics:       decode_count(topics)?,
    })
  }

  // ── Tracked topics ────────────────────────────────────────────────────────

  async fn track_topic(&self, topic: &str) -> Result<bool> {
    let topic  = topic.to_owned();
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO tracked_topics (topic, added_at) VALUES (?1, ?2)",
          rusqlite::params![topic, at_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn list_tracked_topics(&self) -> Result<Vec<String>> {
    let topics = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT topic FROM tracked_topics ORDER BY rowid")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(topics)
  }
}
