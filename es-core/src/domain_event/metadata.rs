use serde_json::{Map, Value};

/// 记录附带的元数据
pub type Metadata = Map<String, Value>;

/// 缺失的元数据统一替换为空映射（线上与领域两侧均不出现 null）
pub fn normalize_metadata(metadata: Option<&Metadata>) -> Metadata {
    metadata.cloned().unwrap_or_default()
}
