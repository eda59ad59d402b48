//! In-memory record store used for single-process deployments and tests.
//!
//! Each record lives in a [`DashMap`] entry next to the watch channel that
//! fans its merged value out to subscribers. Because every write happens
//! while holding the entry guard, [`RecordStore::update_if`] is a true
//! compare-and-set here: the predicate and the merge are atomic with respect
//! to all other writers.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    dao::StorageResult,
    dao::record_store::{ConditionalWrite, RecordPredicate, RecordStore},
    state::record::{GameRecord, GameStatus, RecordPatch},
};

struct Slot {
    record: GameRecord,
    publisher: watch::Sender<GameRecord>,
}

impl Slot {
    fn new(record: GameRecord) -> Self {
        let (publisher, _) = watch::channel(record.clone());
        Self { record, publisher }
    }

    fn merge(&mut self, patch: RecordPatch) {
        self.record.apply(patch);
        // Subscribers may all be gone; that only means nobody is listening.
        self.publisher.send_replace(self.record.clone());
    }
}

/// Always-available store backed by process memory.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    slots: Arc<DashMap<Uuid, Slot>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn create(&self, record: GameRecord) -> BoxFuture<'static, StorageResult<()>> {
        let slots = Arc::clone(&self.slots);
        Box::pin(async move {
            slots.insert(record.id, Slot::new(record));
            Ok(())
        })
    }

    fn read(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let slots = Arc::clone(&self.slots);
        Box::pin(async move { Ok(slots.get(&id).map(|slot| slot.record.clone())) })
    }

    fn find_by_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let slots = Arc::clone(&self.slots);
        Box::pin(async move {
            let found = slots.iter().find_map(|slot| {
                let record = &slot.record;
                (record.code == code && record.status != GameStatus::Finished)
                    .then(|| record.clone())
            });
            Ok(found)
        })
    }

    fn update(&self, id: Uuid, patch: RecordPatch) -> BoxFuture<'static, StorageResult<bool>> {
        let slots = Arc::clone(&self.slots);
        Box::pin(async move {
            match slots.get_mut(&id) {
                Some(mut slot) => {
                    slot.merge(patch);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn update_if(
        &self,
        id: Uuid,
        predicate: RecordPredicate,
        patch: RecordPatch,
    ) -> BoxFuture<'static, StorageResult<ConditionalWrite>> {
        let slots = Arc::clone(&self.slots);
        Box::pin(async move {
            let Some(mut slot) = slots.get_mut(&id) else {
                return Ok(ConditionalWrite::Missing);
            };

            if !predicate(&slot.record) {
                return Ok(ConditionalWrite::Rejected);
            }

            slot.merge(patch);
            Ok(ConditionalWrite::Applied)
        })
    }

    fn subscribe(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<watch::Receiver<GameRecord>>>> {
        let slots = Arc::clone(&self.slots);
        Box::pin(async move { Ok(slots.get(&id).map(|slot| slot.publisher.subscribe())) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
