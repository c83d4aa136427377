//! 解析指标
//!
//! - 冲突计数
//! - 解析结果计数（method, cache_hit）
//! - 解析耗时直方图（method）

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// 映射名称匹配
    Alias,
    /// Provider 侧模型名称匹配
    ProviderModelName,
    /// GlobalModel 名称直接匹配（缓存命中也记为此项）
    DirectMatch,
    /// 未找到
    NotFound,
}

impl ResolutionMethod {
    pub const ALL: [ResolutionMethod; 4] = [
        ResolutionMethod::Alias,
        ResolutionMethod::ProviderModelName,
        ResolutionMethod::DirectMatch,
        ResolutionMethod::NotFound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::Alias => "alias",
            ResolutionMethod::ProviderModelName => "provider_model_name",
            ResolutionMethod::DirectMatch => "direct_match",
            ResolutionMethod::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 指标接收器
pub trait ResolutionMetrics: Send + Sync {
    /// 同一名称匹配到多个不同 GlobalModel
    fn record_conflict(&self);

    /// 一次解析的结果
    fn record_resolution(&self, method: ResolutionMethod, cache_hit: bool);

    /// 一次解析的耗时
    fn observe_resolution_duration(&self, method: ResolutionMethod, duration: Duration);
}

/// 耗时直方图桶上限（秒）
pub const DURATION_BUCKETS_SECS: [f64; 9] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

/// 耗时直方图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationHistogram {
    /// 每个桶的计数（非累计），最后一项为 +Inf
    pub buckets: Vec<u64>,
    pub count: u64,
    pub sum_secs: f64,
}

impl Default for DurationHistogram {
    fn default() -> Self {
        Self {
            buckets: vec![0; DURATION_BUCKETS_SECS.len() + 1],
            count: 0,
            sum_secs: 0.0,
        }
    }
}

impl DurationHistogram {
    pub fn observe(&mut self, duration: Duration) {
        let secs = duration.as_secs_f64();
        let index = DURATION_BUCKETS_SECS
            .iter()
            .position(|bound| secs <= *bound)
            .unwrap_or(DURATION_BUCKETS_SECS.len());
        self.buckets[index] += 1;
        self.count += 1;
        self.sum_secs += secs;
    }
}

/// 内存指标
#[derive(Debug, Default)]
pub struct InMemoryResolutionMetrics {
    conflicts: AtomicU64,
    resolutions: Mutex<HashMap<(ResolutionMethod, bool), u64>>,
    durations: Mutex<HashMap<ResolutionMethod, DurationHistogram>>,
}

impl InMemoryResolutionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conflict_count(&self) -> u64 {
        self.conflicts.load(Ordering::Relaxed)
    }

    pub fn resolution_count(&self, method: ResolutionMethod, cache_hit: bool) -> u64 {
        self.resolutions
            .lock()
            .get(&(method, cache_hit))
            .copied()
            .unwrap_or(0)
    }

    /// 所有解析结果计数之和
    pub fn total_resolutions(&self) -> u64 {
        self.resolutions.lock().values().sum()
    }

    pub fn duration_histogram(&self, method: ResolutionMethod) -> DurationHistogram {
        self.durations
            .lock()
            .get(&method)
            .cloned()
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        self.conflicts.store(0, Ordering::Relaxed);
        self.resolutions.lock().clear();
        self.durations.lock().clear();
    }
}

impl ResolutionMetrics for InMemoryResolutionMetrics {
    fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_resolution(&self, method: ResolutionMethod, cache_hit: bool) {
        *self
            .resolutions
            .lock()
            .entry((method, cache_hit))
            .or_insert(0) += 1;
    }

    fn observe_resolution_duration(&self, method: ResolutionMethod, duration: Duration) {
        self.durations
            .lock()
            .entry(method)
            .or_default()
            .observe(duration);
    }
}
