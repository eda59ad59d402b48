//! Abstraction over the realtime game-record store.
//!
//! The store holds one [`GameRecord`] per game, merges partial writes, and
//! pushes the full merged record to every subscriber after each write. The
//! minimal contract does not require an atomic conditional write, but backends
//! that have one (the in-memory store's entry lock, CouchDB's `_rev`) expose
//! it through [`RecordStore::update_if`] so the buzzer race can be resolved
//! with a genuine compare-and-set.

#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    dao::StorageResult,
    state::record::{GameRecord, RecordPatch},
};

/// Predicate evaluated against the freshest stored record immediately before
/// a conditional write is applied.
pub type RecordPredicate = Arc<dyn Fn(&GameRecord) -> bool + Send + Sync>;

/// Outcome of a conditional record write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalWrite {
    /// The predicate held and the patch was merged.
    Applied,
    /// The predicate failed against the latest value; nothing was written.
    Rejected,
    /// No record exists under that id.
    Missing,
}

/// Abstraction over the persistence/sync layer for game records.
pub trait RecordStore: Send + Sync {
    /// Write a brand-new record.
    fn create(&self, record: GameRecord) -> BoxFuture<'static, StorageResult<()>>;

    /// Read the current value of a record.
    fn read(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;

    /// Look up an active (non-finished) game by its join code.
    fn find_by_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;

    /// Merge a partial update into a record. Returns `false` when no record
    /// exists under that id.
    fn update(&self, id: Uuid, patch: RecordPatch) -> BoxFuture<'static, StorageResult<bool>>;

    /// Merge a partial update only if `predicate` holds against the latest
    /// stored value at write time.
    fn update_if(
        &self,
        id: Uuid,
        predicate: RecordPredicate,
        patch: RecordPatch,
    ) -> BoxFuture<'static, StorageResult<ConditionalWrite>>;

    /// Subscribe to a record. The receiver yields the current value
    /// immediately and every merged record afterwards; `None` when the record
    /// does not exist.
    fn subscribe(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<watch::Receiver<GameRecord>>>>;

    /// Probe backend connectivity.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Attempt to re-establish a dropped backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
