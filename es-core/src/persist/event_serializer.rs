//! 事件序列化器
//!
//! 在强类型 `Event<E>` 与线上 `SerializedEvent` 之间转换：
//! 通过注册表解析实体/变更类型与标识编码，通过通用序列化器编解码载荷。
//! 载荷的具体类型由存储印记（类型名 + 版本）决定，与进程内表示无关。
//! 失败时记录完整上下文并原样抛出，是否容忍由调用方决定。
//!
use crate::{
    domain_event::{Event, SaveRequest, normalize_metadata},
    entity::{Entity, Identifier},
    error::{DomainError, DomainResult},
    mutation::Mutation,
    persist::{PersistenceContext, SerializedEvent},
    registry::{DescriptorRegistry, DescriptorRegistryExt, EntityDescriptor},
    serializer::Serializer,
    utility::TimeSource,
};
use std::sync::Arc;
use tracing::error;

pub struct EventSerializer<S> {
    registry: Arc<dyn DescriptorRegistry>,
    serializer: Arc<S>,
    time_source: Arc<dyn TimeSource>,
}

impl<S> EventSerializer<S>
where
    S: Serializer,
{
    pub fn new(context: &PersistenceContext<S>) -> Self {
        Self {
            registry: Arc::clone(context.registry()),
            serializer: Arc::clone(context.serializer()),
            time_source: Arc::clone(context.time_source()),
        }
    }

    /// 由保存请求构造事件，并以时间源标记确认时间
    pub fn to_event<E>(&self, request: &SaveRequest<E>) -> DomainResult<Event<E>>
    where
        E: Entity,
    {
        self.build_event(request).inspect_err(|err| {
            error!(
                entity = std::any::type_name::<E>(),
                id = ?request.id(),
                sequence_number = request.sequence_number(),
                error = %err,
                "failed to build event from save request"
            )
        })
    }

    pub fn serialize_request<E>(&self, request: &SaveRequest<E>) -> DomainResult<SerializedEvent>
    where
        E: Entity,
    {
        let event = self.to_event(request)?;
        self.serialize(&event)
    }

    pub fn serialize<E>(&self, event: &Event<E>) -> DomainResult<SerializedEvent>
    where
        E: Entity,
    {
        self.encode(event).inspect_err(|err| {
            error!(
                entity = %event.entity_type(),
                id = event.entity_id().encoded(),
                sequence_number = event.sequence_number(),
                mutation_type = %event.mutation_type(),
                error = %err,
                "failed to serialize event"
            )
        })
    }

    pub fn deserialize<E>(&self, record: &SerializedEvent) -> DomainResult<Event<E>>
    where
        E: Entity,
    {
        self.decode(record).inspect_err(|err| {
            error!(
                entity = record.entity_type(),
                id = record.entity_id(),
                sequence_number = record.sequence_number(),
                mutation_type = record.mutation_type(),
                mutation_version = record.mutation_version(),
                error = %err,
                "failed to deserialize event"
            )
        })
    }

    /// 逐条反序列化，首个失败终止整批
    pub fn deserialize_all<E>(&self, records: &[SerializedEvent]) -> DomainResult<Vec<Event<E>>>
    where
        E: Entity,
    {
        records
            .iter()
            .map(|record| self.deserialize(record))
            .collect()
    }

    fn build_event<E>(&self, request: &SaveRequest<E>) -> DomainResult<Event<E>>
    where
        E: Entity,
    {
        let descriptor = self.registry.descriptor::<E>()?;
        let mutation_type = descriptor
            .mutation_type_of(request.mutation().symbol())?
            .clone();

        Ok(Event::<E>::builder()
            .entity_type(descriptor.entity_type().clone())
            .entity_id(descriptor.identifier_converter().identifier(request.id()))
            .sequence_number(request.sequence_number())
            .mutation_type(mutation_type)
            .mutation(request.mutation().clone())
            .occurred_at(request.occurred_at())
            .acknowledged_at(self.time_source.now())
            .maybe_metadata(request.metadata().cloned())
            .build())
    }

    fn encode<E>(&self, event: &Event<E>) -> DomainResult<SerializedEvent>
    where
        E: Entity,
    {
        let payload = event.mutation().encode(self.serializer.as_ref())?;

        Ok(SerializedEvent::builder()
            .entity_type(event.entity_type().name().to_string())
            .entity_id(event.entity_id().encoded().to_string())
            .sequence_number(event.sequence_number())
            .mutation_type(event.mutation_type().type_name().to_string())
            .mutation_version(event.mutation_type().version())
            .payload(payload)
            .occurred_at(event.occurred_at())
            .acknowledged_at(event.acknowledged_at())
            .metadata(normalize_metadata(event.metadata()))
            .build())
    }

    fn decode<E>(&self, record: &SerializedEvent) -> DomainResult<Event<E>>
    where
        E: Entity,
    {
        let descriptor = self.registry.descriptor::<E>()?;
        ensure_entity_type(&descriptor, record.entity_type())?;

        let mutation_type = descriptor
            .mutation_type(record.mutation_type(), record.mutation_version())?
            .clone();
        let id = descriptor
            .identifier_converter()
            .decode(record.entity_id())?;
        let mutation = E::Mutation::decode(
            mutation_type.symbol(),
            record.payload(),
            self.serializer.as_ref(),
        )?;
        if mutation.symbol() != mutation_type.symbol() {
            return Err(DomainError::TypeMismatch {
                expected: mutation_type.symbol().to_string(),
                found: mutation.symbol().to_string(),
            });
        }

        Ok(Event::<E>::builder()
            .entity_type(descriptor.entity_type().clone())
            .entity_id(Identifier::new(id, record.entity_id()))
            .sequence_number(record.sequence_number())
            .mutation_type(mutation_type)
            .mutation(mutation)
            .occurred_at(record.occurred_at())
            .acknowledged_at(record.acknowledged_at())
            .metadata(record.metadata().clone())
            .build())
    }
}

pub(crate) fn ensure_entity_type<E>(
    descriptor: &EntityDescriptor<E>,
    found: &str,
) -> DomainResult<()>
where
    E: Entity,
{
    if descriptor.entity_type().name() != found {
        return Err(DomainError::TypeMismatch {
            expected: descriptor.entity_type().name().to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}
