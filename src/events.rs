//! 结构化事件
//!
//! 核心组件不直接写日志，而是把事件发送给注入的 [`EventSink`]。
//! 默认的 [`TracingEventSink`] 将事件转发给 `tracing`。

use crate::logger::sanitize_log_message;
use crate::resolver::ResolutionMethod;
use parking_lot::Mutex;
use std::time::Duration;

/// 核心事件
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// 缓存命中
    CacheHit { key: String },
    /// 缓存条目版本过旧或无法解码，按未命中处理
    CacheStale { key: String, reason: String },
    /// 缓存读取失败（按未命中处理）
    CacheReadFailed { key: String, error: String },
    /// 缓存写入失败（忽略）
    CacheWriteFailed { key: String, error: String },
    /// 缓存删除失败（忽略）
    CacheDeleteFailed { key: String, error: String },
    /// 缓存已写入
    CacheStored { key: String, ttl: Duration },
    /// 缓存已清除
    CacheInvalidated { keys: Vec<String> },
    /// 数据存储不支持映射名称包含查询，回退到全量扫描
    MembershipPredicateFallback { name: String, reason: String },
    /// 同一名称匹配到多个不同的 GlobalModel
    MappingConflict {
        name: String,
        candidates: Vec<String>,
        selected: String,
    },
    /// 解析成功
    Resolved {
        name: String,
        method: ResolutionMethod,
        global_model: String,
    },
    /// 解析未找到
    NotFound { name: String },
    /// Headers 规则无法解析，原样返回 headers
    HeaderRulesRejected { error: String },
    /// 单个 header 值替换失败，保留原值
    ReplaceValueFailed { header: String, error: String },
}

/// 事件接收器
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CoreEvent);
}

/// 转发到 tracing 的事件接收器
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: CoreEvent) {
        match event {
            CoreEvent::CacheHit { key } => {
                tracing::debug!(key = %key, "[ModelResolver] 缓存命中");
            }
            CoreEvent::CacheStale { key, reason } => {
                tracing::debug!(key = %key, reason = %reason, "[ModelResolver] 缓存条目过旧，刷新");
            }
            CoreEvent::CacheReadFailed { key, error } => {
                tracing::warn!(key = %key, error = %error, "[ModelResolver] 缓存读取失败，按未命中处理");
            }
            CoreEvent::CacheWriteFailed { key, error } => {
                tracing::warn!(key = %key, error = %error, "[ModelResolver] 缓存写入失败");
            }
            CoreEvent::CacheDeleteFailed { key, error } => {
                tracing::warn!(key = %key, error = %error, "[ModelResolver] 缓存删除失败");
            }
            CoreEvent::CacheStored { key, ttl } => {
                tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "[ModelResolver] 已缓存");
            }
            CoreEvent::CacheInvalidated { keys } => {
                tracing::debug!(keys = ?keys, "[ModelResolver] 缓存已清除");
            }
            CoreEvent::MembershipPredicateFallback { name, reason } => {
                tracing::debug!(
                    name = %name,
                    reason = %reason,
                    "[ModelResolver] 映射名称查询不受支持，回退到内存过滤"
                );
            }
            CoreEvent::MappingConflict {
                name,
                candidates,
                selected,
            } => {
                tracing::warn!(
                    name = %name,
                    candidates = %candidates.join(", "),
                    selected = %selected,
                    "[ModelResolver] 模型映射冲突，使用第一个匹配结果"
                );
            }
            CoreEvent::Resolved {
                name,
                method,
                global_model,
            } => {
                tracing::debug!(
                    name = %name,
                    method = %method,
                    global_model = %global_model,
                    "[ModelResolver] 模型解析成功"
                );
            }
            CoreEvent::NotFound { name } => {
                tracing::debug!(name = %name, "[ModelResolver] 模型未找到");
            }
            CoreEvent::HeaderRulesRejected { error } => {
                tracing::warn!(
                    error = %sanitize_log_message(&error),
                    "[HeaderRules] 规则解析失败，使用原始 headers"
                );
            }
            CoreEvent::ReplaceValueFailed { header, error } => {
                tracing::warn!(
                    header = %header,
                    error = %sanitize_log_message(&error),
                    "[HeaderRules] 值替换失败，保留原值"
                );
            }
        }
    }
}

/// 记录事件的接收器，用于断言
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<CoreEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录事件的副本
    pub fn events(&self) -> Vec<CoreEvent> {
        self.events.lock().clone()
    }

    /// 按条件统计事件数量
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CoreEvent) -> bool,
    {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: CoreEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingEventSink::new();
        sink.emit(CoreEvent::NotFound {
            name: "a".to_string(),
        });
        sink.emit(CoreEvent::CacheHit {
            key: "k".to_string(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CoreEvent::NotFound { .. }));
        assert_eq!(sink.count(|e| matches!(e, CoreEvent::CacheHit { .. })), 1);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_every_event() {
        let sink = TracingEventSink;
        sink.emit(CoreEvent::HeaderRulesRejected {
            error: "Authorization: Bearer abc".to_string(),
        });
        sink.emit(CoreEvent::CacheInvalidated {
            keys: vec!["model:id:m1".to_string()],
        });
    }
}
