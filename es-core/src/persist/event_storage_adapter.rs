//! 事件存储适配器
//!
//! 构造时探测一次后端能力；调用缺失的可选能力会在产生任何 future 之前同步失败。
//!
use crate::{
    error::{DomainError, DomainResult},
    persist::{
        SerializedEvent,
        storage::{EventStorage, PurgeableEventStorage, ReplaceableEventStorage},
    },
};
use futures_util::future::BoxFuture;
use std::sync::Arc;

#[derive(Clone)]
pub struct EventStorageAdapter {
    storage: Arc<dyn EventStorage>,
    replace: Option<Arc<dyn ReplaceableEventStorage>>,
    purge: Option<Arc<dyn PurgeableEventStorage>>,
}

impl EventStorageAdapter {
    pub fn new(storage: Arc<dyn EventStorage>) -> Self {
        let replace = Arc::clone(&storage).replaceable();
        let purge = Arc::clone(&storage).purgeable();
        Self {
            storage,
            replace,
            purge,
        }
    }

    pub fn name(&self) -> &'static str {
        self.storage.name()
    }

    pub fn supports_replace(&self) -> bool {
        self.replace.is_some()
    }

    pub fn supports_purge(&self) -> bool {
        self.purge.is_some()
    }

    pub async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
    ) -> DomainResult<Option<SerializedEvent>> {
        self.storage
            .get(entity_type, entity_id, sequence_number)
            .await
    }

    pub async fn list(
        &self,
        entity_type: &str,
        entity_id: &str,
        skip: u64,
        limit: u64,
    ) -> DomainResult<Vec<SerializedEvent>> {
        self.storage.list(entity_type, entity_id, skip, limit).await
    }

    pub async fn save(&self, event: &SerializedEvent) -> DomainResult<bool> {
        self.storage.save(event).await
    }

    pub async fn get_sequence_number(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DomainResult<Option<i64>> {
        self.storage.get_sequence_number(entity_type, entity_id).await
    }

    pub fn replace<'a>(
        &'a self,
        current: &'a SerializedEvent,
        replacement: &'a SerializedEvent,
    ) -> DomainResult<BoxFuture<'a, DomainResult<bool>>> {
        let storage = self
            .replace
            .as_ref()
            .ok_or_else(|| self.unsupported("replace"))?;
        Ok(storage.replace(current, replacement))
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

    fn unsupported(&self, operation: &'static str) -> DomainError {
        DomainError::UnsupportedOperation {
            operation,
            storage: self.name(),
        }
    }
}
