//! 领域记录（Event / Snapshot / SaveRequest）
//!
//! 定义持久化核心处理的强类型记录：事件为一次变更的不可变出现，快照为实体在
//! 某个事件序号处的物化状态，保存请求为写路径的输入。记录只按值传递，核心不
//! 缓存、不共享可变状态。

mod event;
mod metadata;
mod save_request;
mod snapshot;

pub use event::Event;
pub use metadata::{Metadata, normalize_metadata};
pub use save_request::SaveRequest;
pub use snapshot::Snapshot;
