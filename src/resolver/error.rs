//! 解析错误类型

use crate::datastore::DatastoreError;
use thiserror::Error;

/// 解析错误
///
/// 缓存故障不会出现在这里：读失败按未命中处理，写失败只记录事件。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// 数据存储查询失败
    #[error("模型解析失败: {0}")]
    Datastore(#[from] DatastoreError),
}

impl ResolveError {
    /// 获取错误类型字符串
    pub fn error_type(&self) -> &'static str {
        match self {
            ResolveError::Datastore(DatastoreError::UnsupportedPredicate(_)) => {
                "unsupported_predicate"
            }
            ResolveError::Datastore(DatastoreError::Backend(_)) => "datastore_error",
        }
    }
}
