use crate::entity::Entity;
use bon::Builder;
use chrono::{DateTime, Utc};

use super::metadata::Metadata;

/// 保存请求：将一次变更写入指定序号的事件槽位
#[derive(Builder, Debug, Clone)]
pub struct SaveRequest<E>
where
    E: Entity,
{
    id: E::Id,
    mutation: E::Mutation,
    sequence_number: i64,
    /// 逻辑事件时间，由调用方提供
    occurred_at: DateTime<Utc>,
    metadata: Option<Metadata>,
}

impl<E> SaveRequest<E>
where
    E: Entity,
{
    pub fn id(&self) -> &E::Id {
        &self.id
    }

    pub fn mutation(&self) -> &E::Mutation {
        &self.mutation
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}
