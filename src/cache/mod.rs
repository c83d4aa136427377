//! 缓存层
//!
//! 定义缓存后端接口、缓存 key 规则与带版本号的实体快照。
//! 缓存不可用时调用方按未命中处理，正确性不依赖缓存。

pub mod keys;
mod memory;
mod snapshot;

pub use memory::MemoryCache;
pub use snapshot::{
    decode_resolve_entry, decode_snapshot, encode_snapshot, CachedEntry, Snapshot,
    NOT_FOUND_SENTINEL,
};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 缓存错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// 后端不可用
    #[error("缓存不可用: {0}")]
    Unavailable(String),

    /// 快照序列化失败
    #[error("缓存序列化失败: {0}")]
    Serialization(String),
}

/// 缓存后端
///
/// 值为字符串（JSON 快照或负缓存标记），每个条目带 TTL。
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// 读取，不存在或已过期返回 `None`
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// 写入并设置 TTL
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// 删除，key 不存在时也返回成功
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
