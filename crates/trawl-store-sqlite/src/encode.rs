//! Encoding and decoding helpers between Rust domain types and the plain-text
//! and integer representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Counters are stored as
//! `INTEGER` (i64); identity hashes as their hex text.

use chrono::{DateTime, Utc};
use trawl_core::{
  content::{Association, ContentId, NewContent, StoredContent},
  hash::IdentityHash,
  post::PostMetrics,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counters ────────────────────────────────────────────────────────────────

/// SQLite integers are signed; counters beyond `i64::MAX` saturate.
pub fn encode_count(n: u64) -> i64 {
  i64::try_from(n).unwrap_or_else(|_| {
    tracing::warn!(value = n, "counter exceeds i64::MAX; storing i64::MAX");
    i64::MAX
  })
}

pub fn decode_count(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::Decode(format!("negative counter: {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A [`NewContent`] flattened into owned column values, ready to move onto
/// the connection thread.
pub struct EncodedContent {
  pub identity_hash: String,
  pub text:          String,
  pub likes:         i64,
  pub shares:        i64,
  pub comments:      i64,
  pub published_at:  String,
  pub retrieved_at:  String,
  pub author:        Option<String>,
  pub source:        Option<String>,
}

impl From<NewContent> for EncodedContent {
  fn from(row: NewContent) -> Self {
    Self {
      identity_hash: row.identity_hash.into_string(),
      text:          row.text,
      likes:         encode_count(row.metrics.likes),
      shares:        encode_count(row.metrics.shares),
      comments:      encode_count(row.metrics.comments),
      published_at:  encode_dt(row.published_at),
      retrieved_at:  encode_dt(row.retrieved_at),
      author:        row.author,
      source:        row.source,
    }
  }
}

/// Raw values read directly from a `contents` row.
pub struct RawContent {
  pub content_id:    i64,
  pub identity_hash: String,
  pub text:          String,
  pub likes:         i64,
  pub shares:        i64,
  pub comments:      i64,
  pub published_at:  String,
  pub retrieved_at:  String,
  pub author:        Option<String>,
  pub source:        Option<String>,
}

impl RawContent {
  pub fn into_content(self) -> Result<StoredContent> {
    Ok(StoredContent {
      content_id:    ContentId(self.content_id),
      identity_hash: IdentityHash::new(self.identity_hash),
      text:          self.text,
      metrics:       PostMetrics {
        likes:    decode_count(self.likes)?,
        shares:   decode_count(self.shares)?,
        comments: decode_count(self.comments)?,
      },
      published_at:  decode_dt(&self.published_at)?,
      retrieved_at:  decode_dt(&self.retrieved_at)?,
      author:        self.author,
      source:        self.source,
    })
  }
}

/// Raw values read directly from an `associations` row.
pub struct RawAssociation {
  pub content_id:  i64,
  pub topic:       String,
  pub recorded_at: String,
}

impl RawAssociation {
  pub fn into_association(self) -> Result<Association> {
    Ok(Association {
      content_id:  ContentId(self.content_id),
      topic:       self.topic,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
