//! 快照存储适配器
//!
use crate::{
    error::{DomainError, DomainResult},
    persist::{
        SerializedSnapshot,
        storage::{
            CleanableSnapshotStorage, PurgeableSnapshotStorage, ReplaceableSnapshotStorage,
            SnapshotStorage,
        },
    },
};
use futures_util::future::BoxFuture;
use std::sync::Arc;

#[derive(Clone)]
pub struct SnapshotStorageAdapter {
    storage: Arc<dyn SnapshotStorage>,
    remove: Option<Arc<dyn CleanableSnapshotStorage>>,
    purge: Option<Arc<dyn PurgeableSnapshotStorage>>,
    replace: Option<Arc<dyn ReplaceableSnapshotStorage>>,
}

impl SnapshotStorageAdapter {
    pub fn new(storage: Arc<dyn SnapshotStorage>) -> Self {
        let remove = Arc::clone(&storage).cleanable();
        let purge = Arc::clone(&storage).purgeable();
        let replace = Arc::clone(&storage).replaceable();
        Self {
            storage,
            remove,
            purge,
            replace,
        }
    }

    pub fn name(&self) -> &'static str {
        self.storage.name()
    }

    pub fn supports_removal(&self) -> bool {
        self.remove.is_some()
    }

    pub fn supports_purge(&self) -> bool {
        self.purge.is_some()
    }

    pub fn supports_replace(&self) -> bool {
        self.replace.is_some()
    }

    pub async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
    ) -> DomainResult<Option<SerializedSnapshot>> {
        self.storage
            .get(entity_type, entity_id, sequence_number)
            .await
    }

    pub async fn get_last(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DomainResult<Option<SerializedSnapshot>> {
        self.storage.get_last(entity_type, entity_id).await
    }

    pub async fn list(
        &self,
        entity_type: &str,
        entity_id: &str,
        skip: u64,
        limit: u64,
    ) -> DomainResult<Vec<SerializedSnapshot>> {
        self.storage.list(entity_type, entity_id, skip, limit).await
    }

    pub async fn save(&self, snapshot: &SerializedSnapshot) -> DomainResult<bool> {
        self.storage.save(snapshot).await
    }

    pub async fn get_sequence_number(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DomainResult<Option<i64>> {
        self.storage.get_sequence_number(entity_type, entity_id).await
    }

    pub fn remove<'a>(
        &'a self,
        entity_type: &'a str,
        entity_id: &'a str,
        sequence_number: i64,
    ) -> DomainResult<BoxFuture<'a, DomainResult<bool>>> {
        let storage = self
            .remove
            .as_ref()
            .ok_or_else(|| self.unsupported("remove"))?;
        Ok(storage.remove(entity_type, entity_id, sequence_number))
    }

    pub fn purge<'a>(
        &'a self,
        entity_type: &'a str,
        entity_id: &'a str,
    ) -> DomainResult<BoxFuture<'a, DomainResult<Option<u64>>>> {
        let storage = self
            .purge
            .as_ref()
            .ok_or_else(|| self.unsupported("purge"))?;
        Ok(storage.purge(entity_type, entity_id))
    }

    pub fn replace<'a>(
        &'a self,
        current: &'a SerializedSnapshot,
        replacement: &'a SerializedSnapshot,
    ) -> DomainResult<BoxFuture<'a, DomainResult<bool>>> {
        let storage = self
            .replace
            .as_ref()
            .ok_or_else(|| self.unsupported("replace"))?;
        Ok(storage.replace(current, replacement))
    }

    fn unsupported(&self, operation: &'static str) -> DomainError {
        DomainError::UnsupportedOperation {
            operation,
            storage: self.name(),
        }
    }
}
