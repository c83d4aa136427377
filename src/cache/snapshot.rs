//! 实体快照
//!
//! 缓存中的实体以 `{"kind", "version", "data"}` 形式保存。
//! kind 或 version 与当前读取方不一致、或无法解码的条目视为过旧，按未命中处理。

use super::CacheError;
use crate::models::{GlobalModel, Model};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 负缓存标记，仅用于解析 key
pub const NOT_FOUND_SENTINEL: &str = "NOT_FOUND";

/// 可缓存的实体
///
/// 实体字段发生不兼容变化时必须递增 `VERSION`。
pub trait Snapshot: Serialize + DeserializeOwned {
    const KIND: &'static str;
    const VERSION: u32;
}

impl Snapshot for GlobalModel {
    const KIND: &'static str = "global_model";
    const VERSION: u32 = 1;
}

impl Snapshot for Model {
    const KIND: &'static str = "model";
    const VERSION: u32 = 1;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    kind: &'a str,
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    kind: String,
    version: u32,
    data: Value,
}

/// 缓存读取结果
#[derive(Debug, Clone, PartialEq)]
pub enum CachedEntry<T> {
    /// 当前版本的快照
    Fresh(T),
    /// 负缓存标记
    NotFound,
    /// 过旧或损坏，附原因
    Stale(String),
}

/// 序列化为快照字符串
pub fn encode_snapshot<T: Snapshot>(entity: &T) -> Result<String, CacheError> {
    serde_json::to_string(&EnvelopeRef {
        kind: T::KIND,
        version: T::VERSION,
        data: entity,
    })
    .map_err(|e| CacheError::Serialization(e.to_string()))
}

/// 解码快照，不识别负缓存标记
pub fn decode_snapshot<T: Snapshot>(raw: &str) -> CachedEntry<T> {
    let envelope: Envelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(e) => return CachedEntry::Stale(format!("无法解析快照: {e}")),
    };

    if envelope.kind != T::KIND {
        return CachedEntry::Stale(format!(
            "快照类型不匹配: 期望 {}, 实际 {}",
            T::KIND,
            envelope.kind
        ));
    }
    if envelope.version != T::VERSION {
        return CachedEntry::Stale(format!(
            "快照版本过旧: 期望 {}, 实际 {}",
            T::VERSION,
            envelope.version
        ));
    }

    match serde_json::from_value(envelope.data) {
        Ok(entity) => CachedEntry::Fresh(entity),
        Err(e) => CachedEntry::Stale(format!("快照数据无效: {e}")),
    }
}

/// 解码解析 key 上的条目（快照或负缓存标记）
pub fn decode_resolve_entry<T: Snapshot>(raw: &str) -> CachedEntry<T> {
    if raw == NOT_FOUND_SENTINEL {
        return CachedEntry::NotFound;
    }
    decode_snapshot(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_decode_global_model() {
        let gm = GlobalModel::new("g1", "gpt-4").with_capabilities(["vision"]);
        let raw = encode_snapshot(&gm).unwrap();

        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["kind"], "global_model");
        assert_eq!(value["version"], GlobalModel::VERSION);
        assert_eq!(value["data"]["name"], "gpt-4");

        assert_eq!(decode_snapshot::<GlobalModel>(&raw), CachedEntry::Fresh(gm));
    }

    #[test]
    fn test_old_version_is_stale() {
        let raw = json!({
            "kind": "global_model",
            "version": GlobalModel::VERSION + 1,
            "data": {"id": "g1", "name": "gpt-4"}
        })
        .to_string();

        assert!(matches!(
            decode_snapshot::<GlobalModel>(&raw),
            CachedEntry::Stale(_)
        ));
    }

    #[test]
    fn test_unversioned_dict_is_stale() {
        // 没有版本信息的旧格式条目
        let raw = json!({"id": "g1", "name": "gpt-4"}).to_string();
        assert!(matches!(
            decode_snapshot::<GlobalModel>(&raw),
            CachedEntry::Stale(_)
        ));
    }

    #[test]
    fn test_kind_mismatch_is_stale() {
        let model = Model::new("m1", "p1", "g1", "claude-3");
        let raw = encode_snapshot(&model).unwrap();
        assert!(matches!(
            decode_snapshot::<GlobalModel>(&raw),
            CachedEntry::Stale(_)
        ));
    }

    #[test]
    fn test_sentinel_only_on_resolve_entry() {
        assert_eq!(
            decode_resolve_entry::<GlobalModel>(NOT_FOUND_SENTINEL),
            CachedEntry::NotFound
        );
        assert!(matches!(
            decode_snapshot::<GlobalModel>(NOT_FOUND_SENTINEL),
            CachedEntry::Stale(_)
        ));
    }
}
