//! 事件溯源持久化核心（es-core）
//!
//! 将强类型、带版本的变更序列落为支持乐观并发的事件与快照记录，
//! 并在没有后台调度器的前提下保持存储历史的健康：
//! - 领域记录（`domain_event`）、实体与变更抽象（`entity`、`mutation`）；
//! - 描述符注册表（`registry`）与载荷序列化器（`serializer`）；
//! - 概率仲裁与时间源（`utility`）；
//! - 存储契约、能力探测适配器、序列化器、读修复与快照保留、仓储门面（`persist`）。
//!
//! 典型用法：
//! 1. 为实体实现 `Entity` / `Mutation`，废弃的变更实现 `DeprecatedMutation`；
//! 2. 向 `InMemoryDescriptorRegistry` 注册 `EntityDescriptor`；
//! 3. 以 `PersistenceContext` 与具体存储后端构造 `EventRepository` / `SnapshotRepository`。
//!
pub mod domain_event;
pub mod entity;
pub mod error;
pub mod mutation;
pub mod persist;
pub mod registry;
pub mod serializer;
pub mod utility;

#[cfg(test)]
mod testing;
