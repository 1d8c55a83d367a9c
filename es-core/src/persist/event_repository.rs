//! 事件仓储
//!
//! 事件读写门面：写路径为 序列化 → CAS 保存；读路径为 读取 → 反序列化 → 读修复。
//! 每个操作失败时记录查找键并原样抛出。
//!
use crate::{
    domain_event::{Event, SaveRequest},
    entity::Entity,
    error::DomainResult,
    persist::{
        EventRepairFacility, EventSerializer, EventStorageAdapter, PersistenceContext,
        storage::EventStorage,
    },
    registry::{DescriptorRegistry, DescriptorRegistryExt, EntityDescriptor},
    serializer::Serializer,
};
use futures_util::TryFutureExt;
use std::{any::type_name, sync::Arc};
use tracing::{error, trace};

pub struct EventRepository<S> {
    registry: Arc<dyn DescriptorRegistry>,
    adapter: EventStorageAdapter,
    serializer: Arc<EventSerializer<S>>,
    repair: EventRepairFacility<S>,
}

impl<S> EventRepository<S>
where
    S: Serializer,
{
    pub fn new(context: &PersistenceContext<S>, storage: Arc<dyn EventStorage>) -> Self {
        let adapter = EventStorageAdapter::new(storage);
        let serializer = Arc::new(EventSerializer::new(context));
        let repair = EventRepairFacility::new(context, adapter.clone(), Arc::clone(&serializer));
        Self {
            registry: Arc::clone(context.registry()),
            adapter,
            serializer,
            repair,
        }
    }

    pub fn adapter(&self) -> &EventStorageAdapter {
        &self.adapter
    }

    pub fn repair_facility(&self) -> &EventRepairFacility<S> {
        &self.repair
    }

    pub async fn get<E>(&self, id: &E::Id, sequence_number: i64) -> DomainResult<Option<Event<E>>>
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
            let event = self.serializer.deserialize::<E>(&record)?;
            self.repair.process(event).await.map(Some)
        }
        .inspect_err(|err| {
            error!(
                entity = entity_type,
                id = %entity_id,
                sequence_number,
                error = %err,
                "failed to get event"
            )
        })
        .await
    }

    /// 读取区间内的事件；单次调用最多修复第一个符合条件的事件
    pub async fn list<E>(&self, id: &E::Id, skip: u64, limit: u64) -> DomainResult<Vec<Event<E>>>
    where
        E: Entity,
    {
        let descriptor = self.descriptor::<E>()?;
        let entity_type = descriptor.entity_type().name();
        let entity_id = descriptor.identifier_converter().encode(id);
        let repair_probability = descriptor.configuration().event_repair_probability;

        async {
            let records = self
                .adapter
                .list(entity_type, &entity_id, skip, limit)
                .await?;
            let mut events = self.serializer.deserialize_all::<E>(&records)?;

            if repair_probability > 0.0
                && let Some(position) = events.iter().position(|event| self.repair.eligible(event))
            {
                let event = events.remove(position);
                let repaired = self.repair.process(event).await?;
                events.insert(position, repaired);
            }

            trace!(
                entity = entity_type,
                id = %entity_id,
                skip,
                limit,
                count = events.len(),
                "events listed"
            );
            Ok(events)
        }
        .inspect_err(|err| {
            error!(
                entity = entity_type,
                id = %entity_id,
                skip,
                limit,
                error = %err,
                "failed to list events"
            )
        })
        .await
    }

    /// CAS 保存：目标序号已被占用时返回 `false`
    pub async fn save<E>(&self, request: &SaveRequest<E>) -> DomainResult<bool>
    where
        E: Entity,
    {
        async {
            let record = self.serializer.serialize_request(request)?;
            self.adapter.save(&record).await
        }
        .inspect_err(|err| {
            error!(
                entity = type_name::<E>(),
                id = ?request.id(),
                sequence_number = request.sequence_number(),
                error = %err,
                "failed to save event"
            )
        })
        .await
    }

    pub async fn get_sequence_number<E>(&self, id: &E::Id) -> DomainResult<Option<i64>>
    where
        E: Entity,
    {
        let descriptor = self.descriptor::<E>()?;
        let entity_type = descriptor.entity_type().name();
        let entity_id = descriptor.identifier_converter().encode(id);

        self.adapter
            .get_sequence_number(entity_type, &entity_id)
            .inspect_err(|err| {
                error!(
                    entity = entity_type,
                    id = %entity_id,
                    error = %err,
                    "failed to get event sequence number"
                )
            })
            .await
    }

    /// 删除实体的全部事件；后端不支持清空时同步失败
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
                    "failed to purge events"
                )
            })
            .await
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
