//! 存储后端契约
//!
//! 基础契约（`EventStorage` / `SnapshotStorage`）为所有后端必须实现的最小集合；
//! 可选能力（替换、清空、单条删除）以独立 trait 表达，后端通过探测方法
//! （`replaceable` / `purgeable` / `cleanable`）声明自己实现了哪些能力。
//! 探测只在适配器构造时进行一次。
//!
use crate::{
    error::DomainResult,
    persist::{SerializedEvent, SerializedSnapshot},
};
use async_trait::async_trait;
use std::{any::type_name, sync::Arc};

#[async_trait]
pub trait EventStorage: Send + Sync {
    /// 后端名称，用于错误信息与日志
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
    ) -> DomainResult<Option<SerializedEvent>>;

    /// 按序号升序返回区间内的事件
    async fn list(
        &self,
        entity_type: &str,
        entity_id: &str,
        skip: u64,
        limit: u64,
    ) -> DomainResult<Vec<SerializedEvent>>;

    /// CAS 写入：目标序号已被占用时返回 `false`
    async fn save(&self, event: &SerializedEvent) -> DomainResult<bool>;

    async fn get_sequence_number(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DomainResult<Option<i64>>;

    fn replaceable(self: Arc<Self>) -> Option<Arc<dyn ReplaceableEventStorage>> {
        None
    }

    fn purgeable(self: Arc<Self>) -> Option<Arc<dyn PurgeableEventStorage>> {
        None
    }
}

/// 以原记录字节为期望值，原子替换一条事件
#[async_trait]
pub trait ReplaceableEventStorage: Send + Sync {
    async fn replace(
        &self,
        current: &SerializedEvent,
        replacement: &SerializedEvent,
    ) -> DomainResult<bool>;
}

/// 删除实体的全部事件，返回删除数量（后端无法统计时为 `None`）
#[async_trait]
pub trait PurgeableEventStorage: Send + Sync {
    async fn purge(&self, entity_type: &str, entity_id: &str) -> DomainResult<Option<u64>>;
}

#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
    ) -> DomainResult<Option<SerializedSnapshot>>;

    /// 最新快照：默认先取最大序号再读取
    async fn get_last(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DomainResult<Option<SerializedSnapshot>> {
        match self.get_sequence_number(entity_type, entity_id).await? {
            Some(sequence_number) => self.get(entity_type, entity_id, sequence_number).await,
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        entity_type: &str,
        entity_id: &str,
        skip: u64,
        limit: u64,
    ) -> DomainResult<Vec<SerializedSnapshot>>;

    async fn save(&self, snapshot: &SerializedSnapshot) -> DomainResult<bool>;

    /// 已存储快照中最大的事件序号
    async fn get_sequence_number(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> DomainResult<Option<i64>>;

    fn cleanable(self: Arc<Self>) -> Option<Arc<dyn CleanableSnapshotStorage>> {
        None
    }

    fn purgeable(self: Arc<Self>) -> Option<Arc<dyn PurgeableSnapshotStorage>> {
        None
    }

    fn replaceable(self: Arc<Self>) -> Option<Arc<dyn ReplaceableSnapshotStorage>> {
        None
    }
}

/// 按序号删除单个快照
#[async_trait]
pub trait CleanableSnapshotStorage: Send + Sync {
    async fn remove(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
    ) -> DomainResult<bool>;
}

#[async_trait]
pub trait PurgeableSnapshotStorage: Send + Sync {
    async fn purge(&self, entity_type: &str, entity_id: &str) -> DomainResult<Option<u64>>;
}

#[async_trait]
pub trait ReplaceableSnapshotStorage: Send + Sync {
    async fn replace(
        &self,
        current: &SerializedSnapshot,
        replacement: &SerializedSnapshot,
    ) -> DomainResult<bool>;
}
