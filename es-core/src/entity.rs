//! 实体（Entity）基础抽象
//!
//! 为事件溯源的实体提供统一的标识（`Identifier`）、类型令牌（`EntityType`）
//! 与标识编解码（`IdentifierConverter`）能力。
//!
use crate::error::{DomainError, DomainResult};
use crate::mutation::Mutation;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    any::{TypeId, type_name},
    fmt::{self, Debug, Display},
    marker::PhantomData,
    str::FromStr,
};

/// 可被事件溯源的实体抽象
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 实体标识类型
    type Id: Clone + Debug + PartialEq + Send + Sync + 'static;
    /// 该实体支持的变更类型
    type Mutation: Mutation;
}

/// 实体类型令牌：存储层使用的类型名与进程内的类型标识
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityType {
    name: String,
    symbol: TypeId,
}

impl EntityType {
    pub fn of<E: Entity>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: TypeId::of::<E>(),
        }
    }

    /// 存储层类型名
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> TypeId {
        self.symbol
    }

    pub fn is<E: Entity>(&self) -> bool {
        self.symbol == TypeId::of::<E>()
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// 实体标识：原始值与其编码形式同时保留
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier<Id> {
    symbol: Id,
    encoded: String,
}

impl<Id> Identifier<Id> {
    pub fn new(symbol: Id, encoded: impl Into<String>) -> Self {
        Self {
            symbol,
            encoded: encoded.into(),
        }
    }

    pub fn symbol(&self) -> &Id {
        &self.symbol
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// 标识编解码器，要求在合法标识上构成可往返的双射
pub trait IdentifierConverter<Id>: Send + Sync {
    fn encode(&self, id: &Id) -> String;

    fn decode(&self, encoded: &str) -> DomainResult<Id>;

    fn identifier(&self, id: &Id) -> Identifier<Id>
    where
        Id: Clone,
    {
        Identifier::new(id.clone(), self.encode(id))
    }
}

/// 基于 `Display` / `FromStr` 的默认编解码器（适用于 String、整数、Uuid 等）
pub struct FromStrConverter<Id> {
    _marker: PhantomData<fn() -> Id>,
}

impl<Id> FromStrConverter<Id> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<Id> Default for FromStrConverter<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id> IdentifierConverter<Id> for FromStrConverter<Id>
where
    Id: Display + FromStr,
    <Id as FromStr>::Err: Display,
{
    fn encode(&self, id: &Id) -> String {
        id.to_string()
    }

    fn decode(&self, encoded: &str) -> DomainResult<Id> {
        encoded
            .parse::<Id>()
            .map_err(|err| DomainError::InvalidIdentifier {
                encoded: encoded.to_string(),
                reason: format!("{} ({})", err, type_name::<Id>()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Counter;

    #[test]
    fn from_str_converter_roundtrip() {
        let converter = FromStrConverter::<i64>::new();
        assert_eq!(converter.encode(&42), "42");
        assert_eq!(converter.decode("42").unwrap(), 42);

        let identifier = converter.identifier(&7);
        assert_eq!(identifier.symbol(), &7);
        assert_eq!(identifier.encoded(), "7");
    }

    #[test]
    fn from_str_converter_rejects_garbage() {
        let converter = FromStrConverter::<i64>::new();
        match converter.decode("not-a-number").unwrap_err() {
            DomainError::InvalidIdentifier { encoded, .. } => assert_eq!(encoded, "not-a-number"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn entity_type_tracks_symbol() {
        let ty = EntityType::of::<Counter>("counter");
        assert!(ty.is::<Counter>());
        assert_eq!(ty.name(), "counter");
        assert_eq!(ty.to_string(), "counter");
    }
}
