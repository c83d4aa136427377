//! relay-core
//!
//! API 网关热路径上的三个核心组件：
//! - `resolver`: 模型名称 / 映射名称解析为 GlobalModel（带缓存、负缓存、冲突裁决）
//! - `header_rules`: 声明式 Headers 规则引擎
//! - `usage`: 上游 usage 字段提取
//!
//! 缓存、数据存储、指标和事件输出都通过 trait 注入，本 crate 附带内存与 SQLite 实现。

pub mod cache;
pub mod config;
pub mod database;
pub mod datastore;
pub mod events;
pub mod header_rules;
pub mod logger;
pub mod models;
pub mod resolver;
pub mod usage;

pub use cache::{CacheBackend, CacheError, MemoryCache};
pub use config::{CacheConfig, ConfigError, CoreConfig, LoggingConfig};
pub use database::SqliteDatastore;
pub use datastore::{Datastore, DatastoreError, MemoryDatastore, ModelPair};
pub use events::{CoreEvent, EventSink, RecordingEventSink, TracingEventSink};
pub use header_rules::{
    apply_header_rules, merge_legacy_headers, validate_header_rules, HeaderRuleEngine,
    HeaderRuleError, HeaderRules, Headers, ReplaceValueRule, ValueRewrite,
};
pub use models::{GlobalModel, Model, ModelAlias, Provider};
pub use resolver::{
    InMemoryResolutionMetrics, ModelInvalidation, ModelResolver, ResolutionMethod,
    ResolutionMetrics, ResolveError,
};
pub use usage::{
    build_sse_headers, extract_cache_creation, extract_cache_creation_tokens, CacheCreation,
    CacheCreationSource, UsageFieldError,
};
