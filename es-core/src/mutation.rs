//! 变更（Mutation）与变更类型
//!
//! 一次变更是作用于实体的最小修改单元，事件即为其持久化后的出现。
//! - `MutationType` 描述变更在存储层的印记（类型名 + 版本）；
//! - 载荷只编码具体变体自身，解码按印记解析出的 symbol 分派，
//!   进程内的枚举变体名不出现在线上；
//! - `DeprecatedMutation` 表示可被异步上抬为新表示的旧变更（读修复）；
//! - `DependencyInjector` 为上抬过程提供外部依赖。
//!
use crate::{error::DomainResult, serializer::Serializer};
use async_trait::async_trait;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::{self, Debug, Display},
    sync::Arc,
};

/// 变更载荷需要满足的通用能力边界
pub trait Mutation: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// 变更种类标识（同一种类的不同表示共享 symbol 仅在迁移期间出现）
    fn symbol(&self) -> &'static str;

    /// 若为已废弃的表示，返回可上抬的句柄
    fn deprecated(&self) -> Option<&dyn DeprecatedMutation<Self>> {
        None
    }

    /// 编码当前变体承载的具体值
    fn encode<S>(&self, serializer: &S) -> DomainResult<Vec<u8>>
    where
        S: Serializer;

    /// 将载荷解码为 `symbol` 指定的具体变体；未知 symbol 报告 `DomainError::Codec`
    fn decode<S>(symbol: &str, payload: &[u8], serializer: &S) -> DomainResult<Self>
    where
        S: Serializer;
}

/// 已废弃的变更：声明异步上抬能力
#[async_trait]
pub trait DeprecatedMutation<M>: Send + Sync {
    async fn upgrade(&self, injector: &dyn DependencyInjector) -> DomainResult<M>;
}

/// 变更类型：进程内种类标识 + 存储层印记
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationType {
    symbol: &'static str,
    type_name: String,
    version: i32,
}

impl MutationType {
    pub fn new(symbol: &'static str, type_name: impl Into<String>, version: i32) -> Self {
        Self {
            symbol,
            type_name: type_name.into(),
            version,
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// 是否表示同一具体变更种类
    pub fn equal_symbols(&self, other: &MutationType) -> bool {
        self.symbol == other.symbol
    }

    /// 存储印记（类型名 + 版本）是否一致，即线上编码可互换
    pub fn equal_storage_print(&self, other: &MutationType) -> bool {
        self.version == other.version && self.type_name == other.type_name
    }
}

impl Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.type_name, self.version)
    }
}

/// 上抬过程使用的依赖注入器
pub trait DependencyInjector: Send + Sync {
    fn resolve(&self, key: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

pub trait DependencyInjectorExt: DependencyInjector {
    /// 按类型取出依赖
    fn get<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.resolve(TypeId::of::<T>())?.downcast::<T>().ok()
    }
}

impl<T> DependencyInjectorExt for T where T: DependencyInjector + ?Sized {}

/// 以类型为键的简单依赖表
#[derive(Default, Clone)]
pub struct Dependencies {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T>(mut self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }
}

impl DependencyInjector for Dependencies {
    fn resolve(&self, key: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.entries.get(&key).cloned()
    }
}
