//! SQL schema for the trawl SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per identity hash. Written once, never updated or deleted.
CREATE TABLE IF NOT EXISTS contents (
    content_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_hash  TEXT NOT NULL UNIQUE,   -- hex SHA-256 of normalised text
    text           TEXT NOT NULL,
    likes          INTEGER NOT NULL DEFAULT 0,
    shares         INTEGER NOT NULL DEFAULT 0,
    comments       INTEGER NOT NULL DEFAULT 0,
    published_at   TEXT NOT NULL,          -- ISO 8601 UTC
    retrieved_at   TEXT NOT NULL,          -- ISO 8601 UTC
    author         TEXT,
    source         TEXT
);

-- Content discovered under a topic. Append-only.
CREATE TABLE IF NOT EXISTS associations (
    content_id   INTEGER NOT NULL REFERENCES contents(content_id),
    topic        TEXT NOT NULL,
    recorded_at  TEXT NOT NULL,            -- ISO 8601 UTC; server-assigned
    UNIQUE (content_id, topic)
);

CREATE TABLE IF NOT EXISTS tracked_topics (
    topic     TEXT PRIMARY KEY,
    added_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS associations_topic_idx ON associations(topic);

PRAGMA user_version = 1;
";
