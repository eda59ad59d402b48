//! Wire models mapping game records onto CouchDB documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::state::record::GameRecord;

/// Id prefix for game record documents.
pub const RECORD_PREFIX: &str = "record::";
/// High sentinel used as the exclusive end key for prefix scans.
pub const END_SUFFIX: &str = "\u{ffff}";

/// Payload of a `_all_docs` scan.
#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    /// One row per matched document.
    pub rows: Vec<AllDocsRow>,
}

/// A single `_all_docs` row.
#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    /// Document id.
    pub id: String,
    /// Document body when `include_docs` was requested.
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Payload of a `_changes` poll.
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    /// Changes since the requested sequence.
    pub results: Vec<ChangeRow>,
    /// Sequence to resume the next poll from.
    pub last_seq: Value,
}

/// A single `_changes` row.
#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    /// Document body when `include_docs` was requested.
    #[serde(default)]
    pub doc: Option<Value>,
}

/// A game record wrapped with CouchDB bookkeeping fields.
///
/// `_rev` carries the optimistic-concurrency token: every conditional merge
/// re-reads the document and writes back with the fresh revision, so a
/// concurrent writer forces a 409 and a retry instead of a lost update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRecordDocument {
    /// CouchDB document id (`record::<game id>`).
    #[serde(rename = "_id")]
    pub id: String,
    /// CouchDB revision; absent on first write.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// The replicated game record itself.
    #[serde(flatten)]
    pub record: GameRecord,
}

impl CouchRecordDocument {
    /// Wrap a record for persistence, carrying an optional known revision.
    pub fn new(record: GameRecord, rev: Option<String>) -> Self {
        Self {
            id: record_doc_id(record.id),
            rev,
            record,
        }
    }
}

/// Document id for a game record.
pub fn record_doc_id(id: Uuid) -> String {
    format!("{RECORD_PREFIX}{id}")
}

/// Render a `_changes` sequence token as the raw query-string value.
pub fn sequence_token(value: &Value) -> String {
    match value {
        Value::String(seq) => seq.clone(),
        other => other.to_string(),
    }
}
