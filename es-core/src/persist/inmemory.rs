//! 内存存储后端
//!
//! 基于 DashMap 的参考实现，满足全部存储契约的 CAS 语义：
//! 同一实体键的写入在分片锁内完成，已占用的序号槽位写入返回 `false`。
//! 通过 `Capabilities` 屏蔽部分可选能力以模拟受限后端，
//! 并记录每个操作的调用次数、支持注入故障，便于测试。
//!
use crate::{
    error::{DomainError, DomainResult},
    persist::{
        SerializedEvent, SerializedSnapshot,
        storage::{
            CleanableSnapshotStorage, EventStorage, PurgeableEventStorage,
            PurgeableSnapshotStorage, ReplaceableEventStorage, ReplaceableSnapshotStorage,
            SnapshotStorage,
        },
    },
};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::Arc,
};

type Key = (String, String);

fn key(entity_type: &str, entity_id: &str) -> Key {
    (entity_type.to_string(), entity_id.to_string())
}

/// 后端声明的可选能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub replace: bool,
    pub purge: bool,
    /// 单个快照删除（仅快照存储）
    pub remove: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            replace: true,
            purge: true,
            remove: true,
        }
    }

    pub fn none() -> Self {
        Self {
            replace: false,
            purge: false,
            remove: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// 调用计数与故障注入
#[derive(Default)]
struct Probe {
    calls: DashMap<&'static str, usize>,
    faults: DashSet<&'static str>,
}

impl Probe {
    fn enter(&self, operation: &'static str) -> DomainResult<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        if self.faults.contains(operation) {
            return Err(DomainError::storage(format!("injected {operation} failure")));
        }
        Ok(())
    }

    fn calls(&self, operation: &str) -> usize {
        self.calls.get(operation).map(|count| *count).unwrap_or(0)
    }
}

fn range<T: Clone>(records: Option<&BTreeMap<i64, T>>, skip: u64, limit: u64) -> Vec<T> {
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    records
        .map(|records| records.values().skip(skip).take(limit).cloned().collect())
        .unwrap_or_default()
}

#[derive(Default)]
pub struct InMemoryEventStorage {
    events: DashMap<Key, BTreeMap<i64, SerializedEvent>>,
    capabilities: Capabilities,
    probe: Probe,
}

impl InMemoryEventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// 操作被调用的次数
    pub fn calls(&self, operation: &str) -> usize {
        self.probe.calls(operation)
    }

    /// 此后对该操作的调用均返回存储错误
    pub fn fail(&self, operation: &'static str) {
        self.probe.faults.insert(operation);
    }
}

#[async_trait]
impl EventStorage for InMemoryEventStorage {
    async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
    ) -> DomainResult<Option<SerializedEvent>> {
        self.probe.enter("get")?;
        Ok(self
            .events
            .get(&key(entity_type, entity_id))
            .and_then(|events| events.get(&sequence_number).cloned()))
    }

    async fn list(
        &self,
        entity_type: &str,
        entity_id: &str,
        skip: u64,
        limit: u64,
    ) -> DomainResult<Vec<SerializedEvent>> {
        self.probe.enter("list")?;
        let events = self.events.get(&key(entity_type, entity_id));
        Ok(range(events.as_deref(), skip, limit))
    }

    async fn save(&self, event: &SerializedEvent) -> DomainResult<bool> {
        self.probe.enter("save")?;
        let mut events = self
            .events
            .entry(key(event.entity_type(), event.entity_id()))
            .or_default();
        match events.entry(event.sequence_number()) {
            Entry::Vacant(slot) => {
                slot.insert(event.clone());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn get_sequence_number(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DomainResult<Option<i64>> {
        self.probe.enter("get_sequence_number")?;
        Ok(self
            .events
            .get(&key(entity_type, entity_id))
            .and_then(|events| events.keys().next_back().copied()))
    }

    fn replaceable(self: Arc<Self>) -> Option<Arc<dyn ReplaceableEventStorage>> {
        if self.capabilities.replace {
            Some(self)
        } else {
            None
        }
    }

    fn purgeable(self: Arc<Self>) -> Option<Arc<dyn PurgeableEventStorage>> {
        if self.capabilities.purge {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl ReplaceableEventStorage for InMemoryEventStorage {
    async fn replace(
        &self,
        current: &SerializedEvent,
        replacement: &SerializedEvent,
    ) -> DomainResult<bool> {
        self.probe.enter("replace")?;
        if replacement.entity_type() != current.entity_type()
            || replacement.entity_id() != current.entity_id()
            || replacement.sequence_number() != current.sequence_number()
        {
            return Ok(false);
        }

        let Some(mut events) = self
            .events
            .get_mut(&key(current.entity_type(), current.entity_id()))
        else {
            return Ok(false);
        };
        match events.get_mut(&current.sequence_number()) {
            Some(stored) if stored == current => {
                *stored = replacement.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PurgeableEventStorage for InMemoryEventStorage {
    async fn purge(&self, entity_type: &str, entity_id: &str) -> DomainResult<Option<u64>> {
        self.probe.enter("purge")?;
        let removed = self
            .events
            .remove(&key(entity_type, entity_id))
            .map(|(_, events)| events.len() as u64)
            .unwrap_or(0);
        Ok(Some(removed))
    }
}

#[derive(Default)]
pub struct InMemorySnapshotStorage {
    snapshots: DashMap<Key, BTreeMap<i64, SerializedSnapshot>>,
    capabilities: Capabilities,
    probe: Probe,
}

impl InMemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.probe.calls(operation)
    }

    pub fn fail(&self, operation: &'static str) {
        self.probe.faults.insert(operation);
    }

    /// 实体当前保留的快照序号（升序）
    pub fn sequence_numbers(&self, entity_type: &str, entity_id: &str) -> Vec<i64> {
        self.snapshots
            .get(&key(entity_type, entity_id))
            .map(|snapshots| snapshots.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SnapshotStorage for InMemorySnapshotStorage {
    async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
    ) -> DomainResult<Option<SerializedSnapshot>> {
        self.probe.enter("get")?;
        Ok(self
            .snapshots
            .get(&key(entity_type, entity_id))
            .and_then(|snapshots| snapshots.get(&sequence_number).cloned()))
    }

    async fn list(
        &self,
        entity_type: &str,
        entity_id: &str,
        skip: u64,
        limit: u64,
    ) -> DomainResult<Vec<SerializedSnapshot>> {
        self.probe.enter("list")?;
        let snapshots = self.snapshots.get(&key(entity_type, entity_id));
        Ok(range(snapshots.as_deref(), skip, limit))
    }

    async fn save(&self, snapshot: &SerializedSnapshot) -> DomainResult<bool> {
        self.probe.enter("save")?;
        let mut snapshots = self
            .snapshots
            .entry(key(snapshot.entity_type(), snapshot.entity_id()))
            .or_default();
        match snapshots.entry(snapshot.sequence_number()) {
            Entry::Vacant(slot) => {
                slot.insert(snapshot.clone());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn get_sequence_number(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DomainResult<Option<i64>> {
        self.probe.enter("get_sequence_number")?;
        Ok(self
            .snapshots
            .get(&key(entity_type, entity_id))
            .and_then(|snapshots| snapshots.keys().next_back().copied()))
    }

    fn cleanable(self: Arc<Self>) -> Option<Arc<dyn CleanableSnapshotStorage>> {
        if self.capabilities.remove {
            Some(self)
        } else {
            None
        }
    }

    fn purgeable(self: Arc<Self>) -> Option<Arc<dyn PurgeableSnapshotStorage>> {
        if self.capabilities.purge {
            Some(self)
        } else {
            None
        }
    }

    fn replaceable(self: Arc<Self>) -> Option<Arc<dyn ReplaceableSnapshotStorage>> {
        if self.capabilities.replace {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl CleanableSnapshotStorage for InMemorySnapshotStorage {
    async fn remove(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
    ) -> DomainResult<bool> {
        self.probe.enter("remove")?;
        Ok(self
            .snapshots
            .get_mut(&key(entity_type, entity_id))
            .is_some_and(|mut snapshots| snapshots.remove(&sequence_number).is_some()))
    }
}

#[async_trait]
impl PurgeableSnapshotStorage for InMemorySnapshotStorage {
    async fn purge(&self, entity_type: &str, entity_id: &str) -> DomainResult<Option<u64>> {
        self.probe.enter("purge")?;
        let removed = self
            .snapshots
            .remove(&key(entity_type, entity_id))
            .map(|(_, snapshots)| snapshots.len() as u64)
            .unwrap_or(0);
        Ok(Some(removed))
    }
}

#[async_trait]
impl ReplaceableSnapshotStorage for InMemorySnapshotStorage {
    async fn replace(
        &self,
        current: &SerializedSnapshot,
        replacement: &SerializedSnapshot,
    ) -> DomainResult<bool> {
        self.probe.enter("replace")?;
        if replacement.entity_type() != current.entity_type()
            || replacement.entity_id() != current.entity_id()
            || replacement.sequence_number() != current.sequence_number()
        {
            return Ok(false);
        }

        let Some(mut snapshots) = self
            .snapshots
            .get_mut(&key(current.entity_type(), current.entity_id()))
        else {
            return Ok(false);
        };
        match snapshots.get_mut(&current.sequence_number()) {
            Some(stored) if stored == current => {
                *stored = replacement.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serialized_event, serialized_snapshot};

    #[tokio::test]
    async fn event_replace_compares_stored_bytes() {
        let storage = InMemoryEventStorage::new();
        let original = serialized_event("c-1", 1);
        storage.save(&original).await.unwrap();

        let upgraded = SerializedEvent::builder()
            .entity_type("counter".to_string())
            .entity_id("c-1".to_string())
            .sequence_number(1)
            .mutation_type("increment".to_string())
            .mutation_version(2)
            .payload(br#"{"by":1}"#.to_vec())
            .occurred_at(original.occurred_at())
            .acknowledged_at(original.acknowledged_at())
            .build();

        assert!(storage.replace(&original, &upgraded).await.unwrap());
        // 原记录已被替换，第二次 CAS 失败
        assert!(!storage.replace(&original, &upgraded).await.unwrap());
        assert_eq!(
            storage.get("counter", "c-1", 1).await.unwrap(),
            Some(upgraded)
        );
    }

    #[tokio::test]
    async fn injected_faults_surface_as_storage_errors() {
        let storage = InMemorySnapshotStorage::new();
        storage.fail("save");
        let err = storage
            .save(&serialized_snapshot("c-1", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage { .. }));
        assert_eq!(storage.calls("save"), 1);
        assert!(storage.sequence_numbers("counter", "c-1").is_empty());
    }

    #[tokio::test]
    async fn purge_reports_removed_count() {
        let storage = InMemoryEventStorage::new();
        for sequence_number in 1..=3 {
            storage
                .save(&serialized_event("c-1", sequence_number))
                .await
                .unwrap();
        }
        assert_eq!(storage.purge("counter", "c-1").await.unwrap(), Some(3));
        assert_eq!(storage.purge("counter", "c-1").await.unwrap(), Some(0));
        assert_eq!(
            storage.get_sequence_number("counter", "c-1").await.unwrap(),
            None
        );
    }
}
