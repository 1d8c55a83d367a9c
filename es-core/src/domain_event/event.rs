use crate::{
    entity::{Entity, EntityType, Identifier},
    mutation::MutationType,
};
use bon::Builder;
use chrono::{DateTime, Utc};

use super::metadata::Metadata;

/// 事件：一次变更作用于一个实体实例的不可变记录
///
/// 相等性只比较身份字段（实体类型、标识、序号、变更类型）。
/// 读修复不会原地修改事件，而是产出身份相同、变更类型/载荷不同的新事件。
#[derive(Builder, Debug, Clone)]
pub struct Event<E>
where
    E: Entity,
{
    entity_type: EntityType,
    entity_id: Identifier<E::Id>,
    sequence_number: i64,
    mutation_type: MutationType,
    mutation: E::Mutation,
    occurred_at: DateTime<Utc>,
    acknowledged_at: DateTime<Utc>,
    metadata: Option<Metadata>,
}

impl<E> Event<E>
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

    pub fn mutation_type(&self) -> &MutationType {
        &self.mutation_type
    }

    pub fn mutation(&self) -> &E::Mutation {
        &self.mutation
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn acknowledged_at(&self) -> DateTime<Utc> {
        self.acknowledged_at
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// 以新的变更替换当前变更，其余字段保持不变
    pub fn with_mutation(&self, mutation_type: MutationType, mutation: E::Mutation) -> Self {
        Self {
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            sequence_number: self.sequence_number,
            mutation_type,
            mutation,
            occurred_at: self.occurred_at,
            acknowledged_at: self.acknowledged_at,
            metadata: self.metadata.clone(),
        }
    }
}

impl<E> PartialEq for Event<E>
where
    E: Entity,
{
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
            && self.entity_id == other.entity_id
            && self.sequence_number == other.sequence_number
            && self.mutation_type == other.mutation_type
    }
}
