//! 持久化核心（persist）
//!
//! - 线上记录：`SerializedEvent` / `SerializedSnapshot`；
//! - 存储契约与能力探测适配器：`storage`、`EventStorageAdapter`、`SnapshotStorageAdapter`；
//! - 序列化器：`EventSerializer` / `SnapshotSerializer`；
//! - 维护设施：`EventRepairFacility`（读修复）、`SnapshotRemovalFacility`（快照保留）；
//! - 仓储门面：`EventRepository` / `SnapshotRepository`。
//!
//! 本层不持有锁、不启动任务，同一实体上的并发写入完全依赖后端的 CAS 原语。
//!
mod context;
mod event_repair;
mod event_repository;
mod event_serializer;
mod event_storage_adapter;
mod serialized_event;
mod serialized_snapshot;
mod snapshot_removal;
mod snapshot_repository;
mod snapshot_serializer;
mod snapshot_storage_adapter;
pub mod storage;

#[cfg(any(test, feature = "inmemory"))]
pub mod inmemory;

pub use context::PersistenceContext;
pub use event_repair::EventRepairFacility;
pub use event_repository::EventRepository;
pub use event_serializer::EventSerializer;
pub use event_storage_adapter::EventStorageAdapter;
pub use serialized_event::SerializedEvent;
pub use serialized_snapshot::SerializedSnapshot;
pub use snapshot_removal::SnapshotRemovalFacility;
pub use snapshot_repository::SnapshotRepository;
pub use snapshot_serializer::SnapshotSerializer;
pub use snapshot_storage_adapter::SnapshotStorageAdapter;
