//! 快照序列化器
//!
use crate::{
    domain_event::{Snapshot, normalize_metadata},
    entity::{Entity, Identifier},
    error::DomainResult,
    persist::{PersistenceContext, SerializedSnapshot, event_serializer::ensure_entity_type},
    registry::{DescriptorRegistry, DescriptorRegistryExt},
    serializer::Serializer,
};
use std::sync::Arc;
use tracing::error;

pub struct SnapshotSerializer<S> {
    registry: Arc<dyn DescriptorRegistry>,
    serializer: Arc<S>,
}

impl<S> SnapshotSerializer<S>
where
    S: Serializer,
{
    pub fn new(context: &PersistenceContext<S>) -> Self {
        Self {
            registry: Arc::clone(context.registry()),
            serializer: Arc::clone(context.serializer()),
        }
    }

    pub fn serialize<E>(&self, snapshot: &Snapshot<E>) -> DomainResult<SerializedSnapshot>
    where
        E: Entity,
    {
        self.encode(snapshot).inspect_err(|err| {
            error!(
                entity = %snapshot.entity_type(),
                id = snapshot.entity_id().encoded(),
                sequence_number = snapshot.sequence_number(),
                entity_version = snapshot.entity_version(),
                error = %err,
                "failed to serialize snapshot"
            )
        })
    }

    pub fn deserialize<E>(&self, record: &SerializedSnapshot) -> DomainResult<Snapshot<E>>
    where
        E: Entity,
    {
        self.decode(record).inspect_err(|err| {
            error!(
                entity = record.entity_type(),
                id = record.entity_id(),
                sequence_number = record.sequence_number(),
                entity_version = record.entity_version(),
                error = %err,
                "failed to deserialize snapshot"
            )
        })
    }

    pub fn deserialize_all<E>(
        &self,
        records: &[SerializedSnapshot],
    ) -> DomainResult<Vec<Snapshot<E>>>
    where
        E: Entity,
    {
        records
            .iter()
            .map(|record| self.deserialize(record))
            .collect()
    }

    fn encode<E>(&self, snapshot: &Snapshot<E>) -> DomainResult<SerializedSnapshot>
    where
        E: Entity,
    {
        let payload = self.serializer.serialize(snapshot.entity())?;

        Ok(SerializedSnapshot::builder()
            .entity_type(snapshot.entity_type().name().to_string())
            .entity_id(snapshot.entity_id().encoded().to_string())
            .sequence_number(snapshot.sequence_number())
            .entity_version(snapshot.entity_version())
            .payload(payload)
            .event_occurred_at(snapshot.event_occurred_at())
            .event_acknowledged_at(snapshot.event_acknowledged_at())
            .entity_created_at(snapshot.entity_created_at())
            .created_at(snapshot.created_at())
            .metadata(normalize_metadata(snapshot.metadata()))
            .build())
    }

    fn decode<E>(&self, record: &SerializedSnapshot) -> DomainResult<Snapshot<E>>
    where
        E: Entity,
    {
        let descriptor = self.registry.descriptor::<E>()?;
        ensure_entity_type(&descriptor, record.entity_type())?;

        let id = descriptor
            .identifier_converter()
            .decode(record.entity_id())?;
        let entity: E = self.serializer.deserialize(record.payload())?;

        Ok(Snapshot::<E>::builder()
            .entity_type(descriptor.entity_type().clone())
            .entity_id(Identifier::new(id, record.entity_id()))
            .sequence_number(record.sequence_number())
            .entity_version(record.entity_version())
            .entity(entity)
            .event_occurred_at(record.event_occurred_at())
            .event_acknowledged_at(record.event_acknowledged_at())
            .entity_created_at(record.entity_created_at())
            .created_at(record.created_at())
            .metadata(record.metadata().clone())
            .build())
    }
}
