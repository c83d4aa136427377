//! 模型解析服务
//!
//! 组合缓存后端与数据存储，提供带缓存的模型查询、名称解析和缓存失效。

use super::candidates::rank_candidates;
use super::error::ResolveError;
use super::metrics::{InMemoryResolutionMetrics, ResolutionMethod, ResolutionMetrics};
use crate::cache::{
    decode_resolve_entry, decode_snapshot, encode_snapshot, keys, CacheBackend, CachedEntry,
    Snapshot, NOT_FOUND_SENTINEL,
};
use crate::config::CacheConfig;
use crate::datastore::{Datastore, DatastoreError, ModelPair};
use crate::events::{CoreEvent, EventSink, TracingEventSink};
use crate::models::{GlobalModel, Model, ModelAlias};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Model 缓存失效目标
///
/// 只有同时提供 `provider_id` 与 `global_model_id` 时才清除 provider+global 缓存。
#[derive(Debug, Clone, Default)]
pub struct ModelInvalidation<'a> {
    pub model_id: &'a str,
    pub provider_id: Option<&'a str>,
    pub global_model_id: Option<&'a str>,
    pub provider_model_name: Option<&'a str>,
    pub provider_model_aliases: Option<&'a [ModelAlias]>,
}

impl<'a> ModelInvalidation<'a> {
    pub fn new(model_id: &'a str) -> Self {
        Self {
            model_id,
            ..Default::default()
        }
    }

    /// 覆盖某个 Model 相关的全部缓存 key
    pub fn for_model(model: &'a Model) -> Self {
        Self {
            model_id: &model.id,
            provider_id: Some(&model.provider_id),
            global_model_id: Some(&model.global_model_id),
            provider_model_name: Some(&model.provider_model_name),
            provider_model_aliases: Some(&model.provider_model_aliases),
        }
    }

    pub fn provider(mut self, provider_id: &'a str, global_model_id: &'a str) -> Self {
        self.provider_id = Some(provider_id);
        self.global_model_id = Some(global_model_id);
        self
    }

    pub fn provider_model_name(mut self, name: &'a str) -> Self {
        self.provider_model_name = Some(name);
        self
    }

    pub fn aliases(mut self, aliases: &'a [ModelAlias]) -> Self {
        self.provider_model_aliases = Some(aliases);
        self
    }

    /// 需要删除的缓存 key（有序、不去重）
    pub fn cache_keys(&self) -> Vec<String> {
        let mut keys_to_clear = vec![keys::model_by_id(self.model_id)];

        if let (Some(provider_id), Some(global_model_id)) = (self.provider_id, self.global_model_id)
        {
            keys_to_clear.push(keys::model_by_provider_and_global(
                provider_id,
                global_model_id,
            ));
        }

        // provider_model_name 与映射名称都可能被用作解析 key
        if let Some(name) = self.provider_model_name.filter(|n| !n.is_empty()) {
            keys_to_clear.push(keys::global_model_resolve(name));
        }
        if let Some(aliases) = self.provider_model_aliases {
            keys_to_clear.extend(
                aliases
                    .iter()
                    .map(ModelAlias::trimmed_name)
                    .filter(|name| !name.is_empty())
                    .map(keys::global_model_resolve),
            );
        }

        keys_to_clear
    }
}

#[derive(Debug, Clone, Copy)]
struct Outcome {
    method: ResolutionMethod,
    cache_hit: bool,
}

/// 模型解析服务
///
/// 无内部可变状态，可在多个请求间共享。同一名称的并发解析可能重复查询，后写者覆盖缓存。
#[derive(Clone)]
pub struct ModelResolver {
    cache: Arc<dyn CacheBackend>,
    datastore: Arc<dyn Datastore>,
    events: Arc<dyn EventSink>,
    metrics: Arc<dyn ResolutionMetrics>,
    /// 未调用 `with_metrics` 时的内置指标
    builtin_metrics: Option<Arc<InMemoryResolutionMetrics>>,
    ttl: Duration,
}

impl ModelResolver {
    /// 使用默认 TTL、tracing 事件输出与内存指标创建
    ///
    /// 内存指标通过 [`ModelResolver::builtin_metrics`] 读取；
    /// 需要接入外部指标系统时用 [`ModelResolver::with_metrics`] 替换。
    pub fn new(cache: Arc<dyn CacheBackend>, datastore: Arc<dyn Datastore>) -> Self {
        let builtin = Arc::new(InMemoryResolutionMetrics::new());
        Self {
            cache,
            datastore,
            events: Arc::new(TracingEventSink),
            metrics: builtin.clone(),
            builtin_metrics: Some(builtin),
            ttl: CacheConfig::default().model_ttl(),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn ResolutionMetrics>) -> Self {
        self.metrics = metrics;
        self.builtin_metrics = None;
        self
    }

    /// 内置内存指标；调用过 `with_metrics` 后为 `None`
    pub fn builtin_metrics(&self) -> Option<&Arc<InMemoryResolutionMetrics>> {
        self.builtin_metrics.as_ref()
    }

    pub fn with_cache_config(mut self, config: &CacheConfig) -> Self {
        self.ttl = config.model_ttl();
        self
    }

    /// 缓存 TTL（含负缓存）
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // ========== 带缓存的点查询 ==========

    /// 按 ID 获取 Model
    pub async fn get_model_by_id(&self, model_id: &str) -> Result<Option<Model>, ResolveError> {
        self.read_through(
            keys::model_by_id(model_id),
            self.datastore.model_by_id(model_id),
        )
        .await
    }

    /// 按 ID 获取 GlobalModel
    pub async fn get_global_model_by_id(
        &self,
        global_model_id: &str,
    ) -> Result<Option<GlobalModel>, ResolveError> {
        self.read_through(
            keys::global_model_by_id(global_model_id),
            self.datastore.global_model_by_id(global_model_id),
        )
        .await
    }

    /// 按名称获取 GlobalModel（精确匹配，不含映射名称）
    pub async fn get_global_model_by_name(
        &self,
        name: &str,
    ) -> Result<Option<GlobalModel>, ResolveError> {
        self.read_through(
            keys::global_model_by_name(name),
            self.datastore.global_model_by_name(name),
        )
        .await
    }

    /// 获取某 Provider 下绑定到指定 GlobalModel 的启用 Model
    pub async fn get_model_by_provider_and_global_model(
        &self,
        provider_id: &str,
        global_model_id: &str,
    ) -> Result<Option<Model>, ResolveError> {
        self.read_through(
            keys::model_by_provider_and_global(provider_id, global_model_id),
            self.datastore
                .active_model_by_provider_and_global_model(provider_id, global_model_id),
        )
        .await
    }

    // ========== 名称解析 ==========

    /// 通过名称或映射名称解析 GlobalModel
    ///
    /// 空名称直接返回 `None`，不查缓存也不记录指标。
    /// 未找到时写入负缓存；映射名称冲突只记录事件和指标，不报错。
    pub async fn resolve_global_model_by_name_or_alias(
        &self,
        model_name: &str,
    ) -> Result<Option<GlobalModel>, ResolveError> {
        let normalized = model_name.trim();
        if normalized.is_empty() {
            return Ok(None);
        }

        let started = Instant::now();
        let mut outcome = Outcome {
            method: ResolutionMethod::NotFound,
            cache_hit: false,
        };

        let result = self.resolve_normalized(normalized, &mut outcome).await;

        self.metrics
            .record_resolution(outcome.method, outcome.cache_hit);
        self.metrics
            .observe_resolution_duration(outcome.method, started.elapsed());

        result
    }

    async fn resolve_normalized(
        &self,
        name: &str,
        outcome: &mut Outcome,
    ) -> Result<Option<GlobalModel>, ResolveError> {
        let cache_key = keys::global_model_resolve(name);

        // 1. 解析缓存
        if let Some(raw) = self.cache_get(&cache_key).await {
            match decode_resolve_entry::<GlobalModel>(&raw) {
                CachedEntry::NotFound => {
                    outcome.cache_hit = true;
                    outcome.method = ResolutionMethod::NotFound;
                    self.events.emit(CoreEvent::CacheHit { key: cache_key });
                    return Ok(None);
                }
                CachedEntry::Fresh(global_model) => {
                    // 缓存条目不记录原始解析方式
                    outcome.cache_hit = true;
                    outcome.method = ResolutionMethod::DirectMatch;
                    self.events.emit(CoreEvent::CacheHit { key: cache_key });
                    return Ok(Some(global_model));
                }
                CachedEntry::Stale(reason) => {
                    self.events.emit(CoreEvent::CacheStale {
                        key: cache_key.clone(),
                        reason,
                    });
                }
            }
        }

        // 2. provider_model_name / 映射名称匹配
        let pairs = self.load_candidate_pairs(name).await?;
        if let Some(selection) = rank_candidates(name, pairs) {
            if let Some(candidates) = selection.conflicting {
                self.metrics.record_conflict();
                self.events.emit(CoreEvent::MappingConflict {
                    name: name.to_string(),
                    candidates,
                    selected: selection.selected.global_model.name.clone(),
                });
            }

            outcome.method = selection.selected.method;
            return Ok(Some(
                self.finish_resolved(&cache_key, name, outcome.method, selection.selected.global_model)
                    .await,
            ));
        }

        // 3. GlobalModel.name 直接匹配
        if let Some(global_model) = self.datastore.active_global_model_by_name(name).await? {
            outcome.method = ResolutionMethod::DirectMatch;
            return Ok(Some(
                self.finish_resolved(&cache_key, name, outcome.method, global_model)
                    .await,
            ));
        }

        // 4. 未找到，写入负缓存
        outcome.method = ResolutionMethod::NotFound;
        self.cache_set(&cache_key, NOT_FOUND_SENTINEL.to_string())
            .await;
        self.events.emit(CoreEvent::NotFound {
            name: name.to_string(),
        });
        Ok(None)
    }

    /// 查询候选连接结果，不支持映射名称查询时回退到全量扫描
    async fn load_candidate_pairs(&self, name: &str) -> Result<Vec<ModelPair>, ResolveError> {
        match self.datastore.active_models_by_name_or_alias(name).await {
            Ok(pairs) => Ok(pairs),
            Err(DatastoreError::UnsupportedPredicate(reason)) => {
                self.events.emit(CoreEvent::MembershipPredicateFallback {
                    name: name.to_string(),
                    reason,
                });
                Ok(self.datastore.all_active_model_pairs().await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn finish_resolved(
        &self,
        cache_key: &str,
        name: &str,
        method: ResolutionMethod,
        global_model: GlobalModel,
    ) -> GlobalModel {
        self.store_snapshot(cache_key, &global_model).await;
        self.events.emit(CoreEvent::Resolved {
            name: name.to_string(),
            method,
            global_model: global_model.name.clone(),
        });
        global_model
    }

    // ========== 缓存失效 ==========

    /// 清除 Model 相关缓存
    pub async fn invalidate_model_cache(&self, target: &ModelInvalidation<'_>) {
        self.delete_keys(target.cache_keys()).await;
    }

    /// 清除 GlobalModel 相关缓存
    ///
    /// GlobalModel 名称本身也是解析 key，提供名称时一并清除。
    pub async fn invalidate_global_model_cache(&self, global_model_id: &str, name: Option<&str>) {
        let mut keys_to_clear = vec![keys::global_model_by_id(global_model_id)];
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            keys_to_clear.push(keys::global_model_by_name(name));
            keys_to_clear.push(keys::global_model_resolve(name));
        }
        self.delete_keys(keys_to_clear).await;
    }

    // ========== 缓存访问（故障时放行） ==========

    async fn read_through<T, F>(&self, key: String, fetch: F) -> Result<Option<T>, ResolveError>
    where
        T: Snapshot,
        F: Future<Output = Result<Option<T>, DatastoreError>>,
    {
        if let Some(entity) = self.cached_snapshot::<T>(&key).await {
            return Ok(Some(entity));
        }

        let entity = fetch.await?;
        if let Some(entity) = &entity {
            self.store_snapshot(&key, entity).await;
        }
        Ok(entity)
    }

    async fn cached_snapshot<T: Snapshot>(&self, key: &str) -> Option<T> {
        let raw = self.cache_get(key).await?;
        match decode_snapshot::<T>(&raw) {
            CachedEntry::Fresh(entity) => {
                self.events.emit(CoreEvent::CacheHit {
                    key: key.to_string(),
                });
                Some(entity)
            }
            CachedEntry::Stale(reason) => {
                self.events.emit(CoreEvent::CacheStale {
                    key: key.to_string(),
                    reason,
                });
                None
            }
            // decode_snapshot 不会产生负缓存标记
            CachedEntry::NotFound => None,
        }
    }

    async fn store_snapshot<T: Snapshot>(&self, key: &str, entity: &T) {
        match encode_snapshot(entity) {
            Ok(raw) => self.cache_set(key, raw).await,
            Err(e) => self.events.emit(CoreEvent::CacheWriteFailed {
                key: key.to_string(),
                error: e.to_string(),
            }),
        }
    }

    async fn cache_get(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                self.events.emit(CoreEvent::CacheReadFailed {
                    key: key.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn cache_set(&self, key: &str, value: String) {
        match self.cache.set(key, value, self.ttl).await {
            Ok(()) => self.events.emit(CoreEvent::CacheStored {
                key: key.to_string(),
                ttl: self.ttl,
            }),
            Err(e) => self.events.emit(CoreEvent::CacheWriteFailed {
                key: key.to_string(),
                error: e.to_string(),
            }),
        }
    }

    async fn delete_keys(&self, keys_to_clear: Vec<String>) {
        for key in &keys_to_clear {
            if let Err(e) = self.cache.delete(key).await {
                self.events.emit(CoreEvent::CacheDeleteFailed {
                    key: key.clone(),
                    error: e.to_string(),
                });
            }
        }
        self.events.emit(CoreEvent::CacheInvalidated {
            keys: keys_to_clear,
        });
    }
}
