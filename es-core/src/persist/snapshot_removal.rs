//! 快照保留策略
//!
//! 读取快照时概率性地清理保留窗口之外的旧快照，无需后台清扫任务。
//! 快照 `s` 可被删除当且仅当 `s + history_length <= latest`。
//!
use crate::{
    domain_event::Snapshot,
    entity::{Entity, Identifier},
    error::DomainResult,
    persist::{PersistenceContext, SnapshotStorageAdapter},
    registry::{DescriptorRegistry, DescriptorRegistryExt, EntityConfiguration},
    utility::ProbabilityArbiter,
};
use std::sync::Arc;
use tracing::{debug, error};

pub struct SnapshotRemovalFacility {
    registry: Arc<dyn DescriptorRegistry>,
    adapter: SnapshotStorageAdapter,
    arbiter: ProbabilityArbiter,
}

impl SnapshotRemovalFacility {
    pub fn new<S>(context: &PersistenceContext<S>, adapter: SnapshotStorageAdapter) -> Self {
        Self {
            registry: Arc::clone(context.registry()),
            adapter,
            arbiter: context.arbiter().clone(),
        }
    }

    /// 后端支持单条删除，且配置开启了保留窗口与清理概率
    pub fn eligible<E>(&self) -> DomainResult<bool>
    where
        E: Entity,
    {
        let descriptor = self.registry.descriptor::<E>()?;
        Ok(self.allows_removal(descriptor.configuration()))
    }

    /// 按概率清理指定快照，返回是否发生了删除
    pub async fn process<E>(
        &self,
        entity_id: &Identifier<E::Id>,
        sequence_number: i64,
    ) -> DomainResult<bool>
    where
        E: Entity,
    {
        let descriptor = self.registry.descriptor::<E>()?;
        let configuration = descriptor.configuration();
        if !self.allows_removal(configuration) {
            return Ok(false);
        }
        if !self.arbiter.decide(configuration.snapshot_cleanup_probability) {
            return Ok(false);
        }

        let entity_type = descriptor.entity_type().name();
        let outcome = self
            .remove_if_stale(
                entity_type,
                entity_id.encoded(),
                sequence_number,
                configuration.snapshot_history_length,
            )
            .await;

        match outcome {
            Ok(removed) => Ok(removed),
            Err(err) if configuration.suppress_repair_errors => {
                error!(
                    entity = entity_type,
                    id = entity_id.encoded(),
                    sequence_number,
                    error = %err,
                    "snapshot cleanup failed, keeping snapshot"
                );
                Ok(false)
            }
            Err(err) => {
                error!(
                    entity = entity_type,
                    id = entity_id.encoded(),
                    sequence_number,
                    error = %err,
                    "snapshot cleanup failed"
                );
                Err(err)
            }
        }
    }

    /// 保留时返回 `Some(snapshot)`，被删除时返回 `None`
    pub async fn process_snapshot<E>(
        &self,
        snapshot: Snapshot<E>,
    ) -> DomainResult<Option<Snapshot<E>>>
    where
        E: Entity,
    {
        let removed = self
            .process::<E>(snapshot.entity_id(), snapshot.sequence_number())
            .await?;
        Ok((!removed).then_some(snapshot))
    }

    fn allows_removal(&self, configuration: &EntityConfiguration) -> bool {
        self.adapter.supports_removal()
            && configuration.snapshot_history_length > 0
            && configuration.snapshot_cleanup_probability > 0.0
    }

    async fn remove_if_stale(
        &self,
        entity_type: &str,
        entity_id: &str,
        sequence_number: i64,
        history_length: i64,
    ) -> DomainResult<bool> {
        let latest = self
            .adapter
            .get_sequence_number(entity_type, entity_id)
            .await?;

        match latest {
            Some(latest) if sequence_number.saturating_add(history_length) <= latest => {
                let removed = self
                    .adapter
                    .remove(entity_type, entity_id, sequence_number)?
                    .await?;
                debug!(
                    entity = entity_type,
                    id = entity_id,
                    sequence_number,
                    latest,
                    removed,
                    "stale snapshot cleanup"
                );
                Ok(removed)
            }
            _ => Ok(false),
        }
    }
}
