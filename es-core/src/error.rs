//! 持久化核心统一错误定义
//!
//! 聚焦编解码、存储后端、能力缺失、注册表解析与变更上抬等最小必要集合。
//! 乐观并发（CAS）失败不属于错误，始终以 `bool` 结果表达。
//!
use thiserror::Error;

/// 统一错误类型（持久化核心最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/编解码 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("codec error: {reason}")]
    Codec { reason: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },
    #[error("invalid identifier: encoded={encoded}, reason={reason}")]
    InvalidIdentifier { encoded: String, reason: String },

    // --- 存储后端 ---
    #[error("storage error: {reason}")]
    Storage { reason: String },
    #[error("storage {storage} doesn't support {operation} operation")]
    UnsupportedOperation {
        operation: &'static str,
        storage: &'static str,
    },

    // --- 注册表/描述符 ---
    #[error("unknown entity: {entity}")]
    UnknownEntity { entity: String },
    #[error("unknown mutation type: type={mutation_type}, version={version}")]
    UnknownMutationType { mutation_type: String, version: i32 },
    #[error("unknown mutation symbol: entity={entity}, symbol={symbol}")]
    UnknownMutationSymbol { entity: String, symbol: String },
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    // --- 变更上抬（读修复） ---
    #[error("mutation upgrade failed: {reason}")]
    Upgrade { reason: String },
    #[error(
        "illegal mutation upgrade: storage print for original {original} and upgraded {upgraded} mutation types is equal"
    )]
    IllegalMutationUpgrade { original: String, upgraded: String },
}

impl DomainError {
    pub fn storage(reason: impl Into<String>) -> Self {
        DomainError::Storage {
            reason: reason.into(),
        }
    }

    pub fn codec(reason: impl Into<String>) -> Self {
        DomainError::Codec {
            reason: reason.into(),
        }
    }

    pub fn upgrade(reason: impl Into<String>) -> Self {
        DomainError::Upgrade {
            reason: reason.into(),
        }
    }

    /// 上抬实现错误：不受 `suppress_repair_errors` 影响，总是向调用方传播
    pub fn is_illegal_upgrade(&self) -> bool {
        matches!(self, DomainError::IllegalMutationUpgrade { .. })
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_operation_names_capability_and_storage() {
        let err = DomainError::UnsupportedOperation {
            operation: "purge",
            storage: "SqlEventStorage",
        };
        let message = err.to_string();
        assert!(message.contains("purge"));
        assert!(message.contains("SqlEventStorage"));
    }

    #[test]
    fn only_illegal_upgrade_is_flagged() {
        let illegal = DomainError::IllegalMutationUpgrade {
            original: "increment@v1".into(),
            upgraded: "increment@v1".into(),
        };
        assert!(illegal.is_illegal_upgrade());
        assert!(!DomainError::storage("boom").is_illegal_upgrade());
        assert!(!DomainError::upgrade("overflow").is_illegal_upgrade());
    }
}
