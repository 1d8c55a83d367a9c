//! 快照仓储
//!
//! 快照读写门面，组合保留策略：
//! - `get` 按概率清理保留窗口之外的快照（可能因此返回空）；
//! - `get_last` 从不触发清理；
//! - `save` 成功后确定性地删除 `sequence_number - history_length` 处的快照。
//!
use crate::{
    domain_event::Snapshot,
    entity::Entity,
    error::DomainResult,
    persist::{
        PersistenceContext, SnapshotRemovalFacility, SnapshotSerializer, SnapshotStorageAdapter,
        storage::SnapshotStorage,
    },
    registry::{DescriptorRegistry, DescriptorRegistryExt, EntityDescriptor},
    serializer::Serializer,
};
use futures_util::TryFutureExt;
use std::{any::type_name, sync::Arc};
use tracing::{debug, error, info};

pub struct SnapshotRepository<S> {
    registry: Arc<dyn DescriptorRegistry>,
    adapter: SnapshotStorageAdapter,
    serializer: SnapshotSerializer<S>,
    removal: SnapshotRemovalFacility,
}

impl<S> SnapshotRepository<S>
where
    S: Serializer,
{
    pub fn new(context: &PersistenceContext<S>, storage: Arc<dyn SnapshotStorage>) -> Self {
        let adapter = SnapshotStorageAdapter::new(storage);
        let removal = SnapshotRemovalFacility::new(context, adapter.clone());
        Self {
            registry: Arc::clone(context.registry()),
            adapter,
            serializer: SnapshotSerializer::new(context),
            removal,
        }
    }

    pub fn adapter(&self) -> &SnapshotStorageAdapter {
        &self.adapter
    }

    pub fn removal_facility(&self) -> &SnapshotRemovalFacility {
        &self.removal
    }

    pub async fn get<E>(
        &self,
        id: &E::Id,
        sequence_number: i64,
    ) -> DomainResult<Option<Snapshot<E>>>
    where
        E: Entity,
    {
        let descriptor = self.descriptor::<E>()?;
        let entity_type = descriptor.entity_type().name();
        let entity_id = descriptor.identifier_converter().encode(id);

        async {
            let Some(record) = self
                .adapter
                .get(entity_type, &entity_id, sequence_number)
                .await?
            else {
                return Ok(None);
            };
            let snapshot = self.serializer.deserialize::<E>(&record)?;
            if self.removal.eligible::<E>()? {
                self.removal.process_snapshot(snapshot).await
            } else {
                Ok(Some(snapshot))
            }
        }
        .inspect_err(|err| {
            error!(
                entity = entity_type,
                id = %entity_id,
                sequence_number,
                error = %err,
                "failed to get snapshot"
            )
        })
        .await
    }

    pub async fn get_last<E>(&self, id: &E::Id) -> DomainResult<Option<Snapshot<E>>>
    where
        E: Entity,
    {
        let descriptor = self.descriptor::<E>()?;
        let entity_type = descriptor.entity_type().name();
        let entity_id = descriptor.identifier_converter().encode(id);

        async {
            let record = self.adapter.get_last(entity_type, &entity_id).await?;
            record
                .map(|record| self.serializer.deserialize::<E>(&record))
                .transpose()
        }
        .inspect_err(|err| {
            error!(
                entity = entity_type,
                id = %entity_id,
                error = %err,
                "failed to get last snapshot"
            )
        })
        .await
    }

    pub async fn list<E>(
        &self,
        id: &E::Id,
        skip: u64,
        limit: u64,
    ) -> DomainResult<Vec<Snapshot<E>>>
    where
        E: Entity,
    {
        let descriptor = self.descriptor::<E>()?;
        let entity_type = descriptor.entity_type().name();
        let entity_id = descriptor.identifier_converter().encode(id);

        async {
            let records = self
                .adapter
                .list(entity_type, &entity_id, skip, limit)
                .await?;
            self.serializer.deserialize_all::<E>(&records)
        }
        .inspect_err(|err| {
            error!(
                entity = entity_type,
                id = %entity_id,
                skip,
                limit,
                error = %err,
                "failed to list snapshots"
            )
        })
        .await
    }

    /// CAS 保存；成功后裁剪保留窗口之外的快照，裁剪结果不影响返回值
    pub async fn save<E>(&self, snapshot: &Snapshot<E>) -> DomainResult<bool>
    where
        E: Entity,
    {
        let descriptor = self.descriptor::<E>()?;

        async {
            let record = self.serializer.serialize(snapshot)?;
            if !self.adapter.save(&record).await? {
                return Ok(false);
            }
            self.trim(&descriptor, snapshot).await?;
            Ok(true)
        }
        .inspect_err(|err| {
            error!(
                entity = %snapshot.entity_type(),
                id = snapshot.entity_id().encoded(),
                sequence_number = snapshot.sequence_number(),
                error = %err,
                "failed to save snapshot"
            )
        })
        .await
    }

    pub async fn remove<E>(&self, id: &E::Id, sequence_number: i64) -> DomainResult<bool>
    where
        E: Entity,
    {
        let descriptor = self.descriptor::<E>()?;
        let entity_type = descriptor.entity_type().name();
        let entity_id = descriptor.identifier_converter().encode(id);

        async {
            self.adapter
                .remove(entity_type, &entity_id, sequence_number)?
                .await
        }
        .inspect_err(|err| {
            error!(
                entity = entity_type,
                id = %entity_id,
                sequence_number,
                error = %err,
                "failed to remove snapshot"
            )
        })
        .await
    }

    /// 以整条快照为期望值的 CAS 替换，供离线迁移工具使用
    pub async fn replace<E>(
        &self,
        current: &Snapshot<E>,
        replacement: &Snapshot<E>,
    ) -> DomainResult<bool>
    where
        E: Entity,
    {
        async {
            let current = self.serializer.serialize(current)?;
            let replacement = self.serializer.serialize(replacement)?;
            self.adapter.replace(&current, &replacement)?.await
        }
        .inspect_err(|err| {
            error!(
                entity = %current.entity_type(),
                id = current.entity_id().encoded(),
                sequence_number = current.sequence_number(),
                error = %err,
                "failed to replace snapshot"
            )
        })
        .await
    }

    pub async fn purge<E>(&self, id: &E::Id) -> DomainResult<Option<u64>>
    where
        E: Entity,
    {
        let descriptor = self.descriptor::<E>()?;
        let entity_type = descriptor.entity_type().name();
        let entity_id = descriptor.identifier_converter().encode(id);

        async { self.adapter.purge(entity_type, &entity_id)?.await }
            .inspect_err(|err| {
                error!(
                    entity = entity_type,
                    id = %entity_id,
                    error = %err,
                    "failed to purge snapshots"
                )
            })
            .await
    }

    /// 删除 `sequence_number - history_length` 处的快照（若存在且允许）
    async fn trim<E>(
        &self,
        descriptor: &EntityDescriptor<E>,
        snapshot: &Snapshot<E>,
    ) -> DomainResult<()>
    where
        E: Entity,
    {
        let configuration = descriptor.configuration();
        let history_length = configuration.snapshot_history_length;
        if history_length <= 0 || !self.adapter.supports_removal() {
            return Ok(());
        }
        let candidate = snapshot.sequence_number().saturating_sub(history_length);
        if candidate < 1 {
            return Ok(());
        }

        let entity_type = snapshot.entity_type().name();
        let entity_id = snapshot.entity_id().encoded();
        let outcome = async {
            self.adapter
                .remove(entity_type, entity_id, candidate)?
                .await
        }
        .await;

        match outcome {
            Ok(true) => {
                debug!(
                    entity = entity_type,
                    id = entity_id,
                    sequence_number = candidate,
                    "trimmed snapshot outside retention window"
                );
                Ok(())
            }
            Ok(false) => {
                info!(
                    entity = entity_type,
                    id = entity_id,
                    sequence_number = candidate,
                    "failed to remove snapshot outside retention window"
                );
                Ok(())
            }
            Err(err) if configuration.suppress_repair_errors => {
                error!(
                    entity = entity_type,
                    id = entity_id,
                    sequence_number = candidate,
                    error = %err,
                    "snapshot trim failed after save"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn descriptor<E>(&self) -> DomainResult<Arc<EntityDescriptor<E>>>
    where
        E: Entity,
    {
        self.registry.descriptor::<E>().inspect_err(|err| {
            error!(entity = type_name::<E>(), error = %err, "failed to resolve descriptor")
        })
    }
}
