//! 快照持久化模型（SerializedSnapshot）
//!
use crate::domain_event::Metadata;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    entity_type: String,
    entity_id: String,
    /// 快照所反映的事件序号
    sequence_number: i64,
    /// 快照计数，独立于事件序号
    entity_version: i64,
    /// 实体状态载荷
    payload: Vec<u8>,
    event_occurred_at: DateTime<Utc>,
    event_acknowledged_at: DateTime<Utc>,
    entity_created_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    #[builder(default)]
    metadata: Metadata,
}

impl SerializedSnapshot {
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn entity_version(&self) -> i64 {
        self.entity_version
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
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

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
