//! 实体描述符注册表
//!
//! 注册表是从类型擦除的实体令牌到强类型描述符的唯一运行时桥梁：
//! - `EntityConfiguration`：按实体类型的可调参数（快照保留、读修复概率等）；
//! - `EntityDescriptor<E>`：实体类型、标识编解码器、已知变更类型与配置；
//! - `DescriptorRegistry`：按 `TypeId` 查找描述符（对象安全），
//!   `DescriptorRegistryExt::descriptor::<E>()` 完成强类型下转。
//!
use crate::{
    entity::{Entity, EntityType, IdentifierConverter},
    error::{DomainError, DomainResult},
    mutation::MutationType,
};
use bon::Builder;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::{
    any::{Any, TypeId, type_name},
    sync::Arc,
};

/// 按实体类型的可调参数，各字段相互独立
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfiguration {
    /// 保留的快照数量，`<= 0` 关闭裁剪
    #[builder(default = -1)]
    pub snapshot_history_length: i64,
    /// 生成快照的事件间隔
    #[builder(default = 25)]
    pub snapshot_interval: i64,
    /// 读取快照时触发清理的概率
    #[builder(default = 0.1)]
    pub snapshot_cleanup_probability: f64,
    #[builder(default = 0.5)]
    pub snapshot_read_repair_probability: f64,
    /// 读取事件时触发上抬修复的概率
    #[builder(default = 0.5)]
    pub event_repair_probability: f64,
    /// 维护类错误（修复/清理）仅记录日志，不向调用方传播
    #[builder(default = false)]
    pub suppress_repair_errors: bool,
    #[builder(default = false)]
    pub suppress_listener_errors: bool,
    #[builder(default = true)]
    pub await_listeners: bool,
    #[builder(default = false)]
    pub repair_snapshot_on_reads: bool,
}

impl Default for EntityConfiguration {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EntityConfiguration {
    /// 校验概率区间与快照间隔
    pub fn validate(&self) -> DomainResult<()> {
        let probabilities = [
            (
                "snapshot_cleanup_probability",
                self.snapshot_cleanup_probability,
            ),
            (
                "snapshot_read_repair_probability",
                self.snapshot_read_repair_probability,
            ),
            ("event_repair_probability", self.event_repair_probability),
        ];

        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(DomainError::InvalidConfiguration {
                    reason: format!("{name} must be within [0, 1], got {value}"),
                });
            }
        }

        if self.snapshot_interval <= 0 {
            return Err(DomainError::InvalidConfiguration {
                reason: format!(
                    "snapshot_interval must be positive, got {}",
                    self.snapshot_interval
                ),
            });
        }

        Ok(())
    }
}

/// 实体描述符
#[derive(Builder)]
pub struct EntityDescriptor<E>
where
    E: Entity,
{
    entity_type: EntityType,
    identifier_converter: Arc<dyn IdentifierConverter<E::Id>>,
    mutation_types: Vec<MutationType>,
    #[builder(default)]
    configuration: EntityConfiguration,
}

impl<E> EntityDescriptor<E>
where
    E: Entity,
{
    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn identifier_converter(&self) -> &dyn IdentifierConverter<E::Id> {
        self.identifier_converter.as_ref()
    }

    pub fn mutation_types(&self) -> &[MutationType] {
        &self.mutation_types
    }

    pub fn configuration(&self) -> &EntityConfiguration {
        &self.configuration
    }

    /// 按具体变更种类查找
    pub fn mutation_type_of(&self, symbol: &str) -> DomainResult<&MutationType> {
        self.mutation_types
            .iter()
            .find(|ty| ty.symbol() == symbol)
            .ok_or_else(|| DomainError::UnknownMutationSymbol {
                entity: self.entity_type.name().to_string(),
                symbol: symbol.to_string(),
            })
    }

    /// 按存储印记（类型名 + 版本）查找
    pub fn mutation_type(&self, type_name: &str, version: i32) -> DomainResult<&MutationType> {
        self.mutation_types
            .iter()
            .find(|ty| ty.type_name() == type_name && ty.version() == version)
            .ok_or_else(|| DomainError::UnknownMutationType {
                mutation_type: type_name.to_string(),
                version,
            })
    }
}

/// 描述符注册表
pub trait DescriptorRegistry: Send + Sync {
    /// 按实体 `TypeId` 查找类型擦除后的描述符
    fn lookup(&self, entity: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

impl<T> DescriptorRegistry for Arc<T>
where
    T: DescriptorRegistry + ?Sized,
{
    fn lookup(&self, entity: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        (**self).lookup(entity)
    }
}

pub trait DescriptorRegistryExt: DescriptorRegistry {
    fn descriptor<E>(&self) -> DomainResult<Arc<EntityDescriptor<E>>>
    where
        E: Entity,
    {
        let erased = self
            .lookup(TypeId::of::<E>())
            .ok_or_else(|| DomainError::UnknownEntity {
                entity: type_name::<E>().to_string(),
            })?;

        erased
            .downcast::<EntityDescriptor<E>>()
            .map_err(|_| DomainError::TypeMismatch {
                expected: type_name::<EntityDescriptor<E>>().to_string(),
                found: "foreign descriptor".to_string(),
            })
    }
}

impl<T> DescriptorRegistryExt for T where T: DescriptorRegistry + ?Sized {}

/// 基于 DashMap 的内存注册表
#[derive(Default)]
pub struct InMemoryDescriptorRegistry {
    descriptors: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl InMemoryDescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册描述符（同一实体重复注册时覆盖）
    pub fn register<E>(&self, descriptor: EntityDescriptor<E>) -> DomainResult<()>
    where
        E: Entity,
    {
        descriptor.configuration().validate()?;
        self.descriptors
            .insert(TypeId::of::<E>(), Arc::new(descriptor));
        Ok(())
    }
}

impl DescriptorRegistry for InMemoryDescriptorRegistry {
    fn lookup(&self, entity: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.descriptors
            .get(&entity)
            .map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Counter, counter_descriptor};

    #[test]
    fn configuration_defaults() {
        let config = EntityConfiguration::default();
        assert_eq!(config.snapshot_history_length, -1);
        assert_eq!(config.snapshot_interval, 25);
        assert_eq!(config.snapshot_cleanup_probability, 0.1);
        assert_eq!(config.snapshot_read_repair_probability, 0.5);
        assert_eq!(config.event_repair_probability, 0.5);
        assert!(!config.suppress_repair_errors);
        assert!(!config.suppress_listener_errors);
        assert!(config.await_listeners);
        assert!(!config.repair_snapshot_on_reads);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn configuration_partial_document_fills_defaults() {
        let config: EntityConfiguration = serde_json::from_str(
            r#"{"snapshot_history_length": 5, "suppress_repair_errors": true}"#,
        )
        .unwrap();
        assert_eq!(config.snapshot_history_length, 5);
        assert!(config.suppress_repair_errors);
        assert_eq!(config.snapshot_interval, 25);
        assert_eq!(config.event_repair_probability, 0.5);
    }

    #[test]
    fn configuration_validation() {
        let bad = EntityConfiguration::builder()
            .event_repair_probability(1.5)
            .build();
        assert!(matches!(
            bad.validate(),
            Err(DomainError::InvalidConfiguration { .. })
        ));

        let nan = EntityConfiguration::builder()
            .snapshot_cleanup_probability(f64::NAN)
            .build();
        assert!(nan.validate().is_err());

        let interval = EntityConfiguration::builder().snapshot_interval(0).build();
        assert!(interval.validate().is_err());
    }

    #[test]
    fn registry_resolves_typed_descriptor() {
        let registry = InMemoryDescriptorRegistry::new();
        assert!(matches!(
            registry.descriptor::<Counter>(),
            Err(DomainError::UnknownEntity { .. })
        ));

        registry
            .register(counter_descriptor(EntityConfiguration::default()))
            .unwrap();

        let descriptor = registry.descriptor::<Counter>().unwrap();
        assert_eq!(descriptor.entity_type().name(), "counter");
        assert_eq!(
            descriptor.mutation_type("increment", 2).unwrap().symbol(),
            "Increment"
        );
        assert_eq!(
            descriptor.mutation_type_of("LegacyIncrement").unwrap().version(),
            1
        );
        assert!(matches!(
            descriptor.mutation_type("increment", 9),
            Err(DomainError::UnknownMutationType { version: 9, .. })
        ));
        assert!(matches!(
            descriptor.mutation_type_of("Reset"),
            Err(DomainError::UnknownMutationSymbol { .. })
        ));
    }

    #[test]
    fn registry_rejects_invalid_configuration() {
        let registry = InMemoryDescriptorRegistry::new();
        let config = EntityConfiguration::builder()
            .snapshot_cleanup_probability(-0.1)
            .build();
        assert!(registry.register(counter_descriptor(config)).is_err());
        assert!(registry.descriptor::<Counter>().is_err());
    }
}
