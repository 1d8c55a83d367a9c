//! 事件持久化模型（SerializedEvent）
//!
//! 事件在存储边界的扁平形态：实体类型名、编码后的标识、变更类型印记与字节载荷。
//! 元数据在线上永不为 null，反序列化缺失字段时补为空映射。
//!
use crate::domain_event::Metadata;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 实体类型名
    entity_type: String,
    /// 编码后的实体标识
    entity_id: String,
    /// 事件序号（从 1 开始，按实体单调递增）
    sequence_number: i64,
    /// 变更类型名
    mutation_type: String,
    /// 变更类型版本
    mutation_version: i32,
    /// 变更载荷
    payload: Vec<u8>,
    occurred_at: DateTime<Utc>,
    acknowledged_at: DateTime<Utc>,
    #[serde(default)]
    #[builder(default)]
    metadata: Metadata,
}

impl SerializedEvent {
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn mutation_type(&self) -> &str {
        &self.mutation_type
    }

    pub fn mutation_version(&self) -> i32 {
        self.mutation_version
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn acknowledged_at(&self) -> DateTime<Utc> {
        self.acknowledged_at
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
