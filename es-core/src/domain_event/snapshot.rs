use crate::entity::{Entity, EntityType, Identifier};
use bon::Builder;
use chrono::{DateTime, Utc};

use super::metadata::Metadata;

/// 快照：实体在某个事件序号处的物化状态
///
/// `entity_version` 为已生成快照的计数，单调递增且独立于 `sequence_number`。
#[derive(Builder, Debug, Clone)]
pub struct Snapshot<E>
where
    E: Entity,
{
    entity_type: EntityType,
    entity_id: Identifier<E::Id>,
    sequence_number: i64,
    entity_version: i64,
    entity: E,
    event_occurred_at: DateTime<Utc>,
    event_acknowledged_at: DateTime<Utc>,
    entity_created_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    metadata: Option<Metadata>,
}

impl<E> Snapshot<E>
where
    E: Entity,
{
    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn entity_id(&self) -> &Identifier<E::Id> {
        &self.entity_id
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn entity_version(&self) -> i64 {
        self.entity_version
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn event_occurred_at(&self) -> DateTime<Utc> {
        self.event_occurred_at
    }

    pub fn event_acknowledged_at(&self) -> DateTime<Utc> {
        self.event_acknowledged_at
    }

    pub fn entity_created_at(&self) -> DateTime<Utc> {
        self.entity_created_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}

impl<E> PartialEq for Snapshot<E>
where
    E: Entity,
{
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
            && self.entity_id == other.entity_id
            && self.sequence_number == other.sequence_number
            && self.entity_version == other.entity_version
    }
}
