//! SQL schema for the cairn SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per mutation event. Strictly append-only.
CREATE TABLE IF NOT EXISTS audit_trail (
    transaction_id TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    reason         TEXT NOT NULL,
    source         TEXT NOT NULL,   -- 'api' | 'system'
    recorded_at    TEXT NOT NULL    -- ISO 8601 UTC
);

-- The single logical business-object collection, discriminated by `type`.
-- `transaction_id` always references the most recent mutation's trail.
CREATE TABLE IF NOT EXISTS entities (
    id             TEXT PRIMARY KEY,
    type           TEXT NOT NULL,   -- 'user' | 'person' | 'account' | 'tag'
    sub_type       TEXT,
    version        INTEGER NOT NULL,
    deleted        INTEGER NOT NULL DEFAULT 0,
    transaction_id TEXT NOT NULL REFERENCES audit_trail(transaction_id),
    attributes     TEXT NOT NULL    -- JSON object of variant fields
);

-- One row per superseded version, written in the same transaction as the
-- mutation that superseded it. No UPDATE or DELETE is ever issued here.
-- Keyed by the transaction that produced the archived state.
CREATE TABLE IF NOT EXISTS entity_history (
    transaction_id TEXT NOT NULL REFERENCES audit_trail(transaction_id),
    entity_id      TEXT NOT NULL REFERENCES entities(id),
    entity_type    TEXT NOT NULL,
    version        INTEGER NOT NULL,
    state          TEXT NOT NULL,   -- JSON snapshot of the pre-mutation state
    recorded_at    TEXT NOT NULL,
    PRIMARY KEY (entity_id, version)
);

CREATE INDEX IF NOT EXISTS entities_type_idx      ON entities(type);
CREATE INDEX IF NOT EXISTS entity_history_txn_idx ON entity_history(transaction_id);

PRAGMA user_version = 1;
";
