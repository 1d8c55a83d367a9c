//! 通用载荷序列化器
//!
//! 持久化核心只依赖 `Serializer` 契约（对象 ⇄ 字节），默认提供基于 serde_json 的实现。
//! 其他实现应将编解码失败报告为 `DomainError::Codec`。
//!
use crate::error::DomainResult;
use serde::{Serialize, de::DeserializeOwned};

pub trait Serializer: Send + Sync + 'static {
    fn serialize<T>(&self, value: &T) -> DomainResult<Vec<u8>>
    where
        T: Serialize + ?Sized;

    fn deserialize<T>(&self, bytes: &[u8]) -> DomainResult<T>
    where
        T: DeserializeOwned;
}

/// JSON 载荷序列化器
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<T>(&self, value: &T) -> DomainResult<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> DomainResult<T>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_slice(bytes)?)
    }
}
