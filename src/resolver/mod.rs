//! 模型解析模块
//!
//! 将任意模型名称（GlobalModel 名称、Provider 侧模型名称或映射名称）解析为 GlobalModel。
//!
//! 查找顺序：
//! 1. 解析缓存（含负缓存）
//! 2. 映射名称 / provider_model_name 匹配（映射名称优先，同级按 GlobalModel 名称排序）
//! 3. GlobalModel.name 直接匹配
//!
//! 另提供按 ID / 名称的带缓存点查询与缓存失效。

mod candidates;
mod error;
mod metrics;
mod service;

pub use candidates::{rank_candidates, Candidate, Selection};
pub use error::ResolveError;
pub use metrics::{
    DurationHistogram, InMemoryResolutionMetrics, ResolutionMethod, ResolutionMetrics,
    DURATION_BUCKETS_SECS,
};
pub use service::{ModelInvalidation, ModelResolver};
