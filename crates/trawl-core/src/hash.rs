//! Content identity hashing.
//!
//! A post's identity is the SHA-256 digest of its normalised text. The digest
//! is stable across processes and platforms, so equal hashes from separate
//! runs reliably mean equal content. Hash equality is treated as content
//! equality; there is no secondary comparison of the raw text.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Collapse every run of whitespace (line breaks included) to a single space
/// and trim both ends.
pub fn normalize_text(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase hex SHA-256 digest of normalised post text; the deduplication
/// key for stored content.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IdentityHash(String);

impl IdentityHash {
  /// Hash `text` after normalising it with [`normalize_text`].
  pub fn of(text: &str) -> Self {
    Self::of_normalized(&normalize_text(text))
  }

  /// Hash text that is already normalised.
  pub fn of_normalized(normalized: &str) -> Self {
    let digest = Sha256::digest(normalized.as_bytes());
    Self(hex::encode(digest))
  }

  /// Wrap a digest that was computed elsewhere, e.g. read back from a store.
  pub fn new(digest: impl Into<String>) -> Self { Self(digest.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for IdentityHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for IdentityHash {
  fn as_ref(&self) -> &str { &self.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn digest_is_sha256_hex() {
    assert_eq!(
      IdentityHash::of("hello").as_str(),
      "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
  }

  #[test]
  fn whitespace_variants_share_a_hash() {
    let a = IdentityHash::of("breaking  news\n from the\tcapital ");
    let b = IdentityHash::of("breaking news from the capital");
    assert_eq!(a, b);
  }

  #[test]
  fn different_text_different_hash() {
    assert_ne!(IdentityHash::of("hello"), IdentityHash::of("world"));
  }

  #[test]
  fn normalize_collapses_and_trims() {
    assert_eq!(normalize_text("  a\r\n\n b   c  "), "a b c");
    assert_eq!(normalize_text(" \n\t "), "");
  }

  #[test]
  fn multibyte_text_is_preserved() {
    assert_eq!(normalize_text("微博  热门\n话题"), "微博 热门 话题");
  }
}
