//! 内存数据存储
//!
//! 记录每类查询的调用次数，可模拟不支持映射名称查询或后端故障。

use super::{Datastore, DatastoreError, ModelPair};
use crate::models::{GlobalModel, Model, Provider};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// 查询类型，用于调用计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    ModelById,
    GlobalModelById,
    GlobalModelByName,
    ModelByProviderAndGlobal,
    ModelsByNameOrAlias,
    AllActivePairs,
    ActiveGlobalModelByName,
}

#[derive(Debug, Default)]
struct Tables {
    providers: Vec<Provider>,
    models: Vec<Model>,
    global_models: Vec<GlobalModel>,
}

/// 内存数据存储
#[derive(Debug)]
pub struct MemoryDatastore {
    tables: RwLock<Tables>,
    calls: Mutex<HashMap<QueryKind, usize>>,
    membership_predicate: AtomicBool,
    backend_failure: Mutex<Option<String>>,
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            calls: Mutex::new(HashMap::new()),
            membership_predicate: AtomicBool::new(true),
            backend_failure: Mutex::new(None),
        }
    }
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或替换 Provider（按 ID）
    pub fn upsert_provider(&self, provider: Provider) {
        let mut tables = self.tables.write();
        match tables.providers.iter_mut().find(|p| p.id == provider.id) {
            Some(existing) => *existing = provider,
            None => tables.providers.push(provider),
        }
    }

    /// 插入或替换 GlobalModel（按 ID）
    pub fn upsert_global_model(&self, global_model: GlobalModel) {
        let mut tables = self.tables.write();
        match tables
            .global_models
            .iter_mut()
            .find(|g| g.id == global_model.id)
        {
            Some(existing) => *existing = global_model,
            None => tables.global_models.push(global_model),
        }
    }

    /// 插入或替换 Model（按 ID）
    pub fn upsert_model(&self, model: Model) {
        let mut tables = self.tables.write();
        match tables.models.iter_mut().find(|m| m.id == model.id) {
            Some(existing) => *existing = model,
            None => tables.models.push(model),
        }
    }

    /// 设置是否支持映射名称包含查询
    pub fn set_membership_predicate_supported(&self, supported: bool) {
        self.membership_predicate.store(supported, Ordering::SeqCst);
    }

    /// 之后的所有查询都返回后端错误；`None` 恢复正常
    pub fn set_backend_failure(&self, message: Option<String>) {
        *self.backend_failure.lock() = message;
    }

    /// 某类查询的调用次数
    pub fn call_count(&self, kind: QueryKind) -> usize {
        self.calls.lock().get(&kind).copied().unwrap_or(0)
    }

    /// 所有查询的调用总数
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn begin(&self, kind: QueryKind) -> Result<(), DatastoreError> {
        *self.calls.lock().entry(kind).or_insert(0) += 1;
        match self.backend_failure.lock().as_ref() {
            Some(message) => Err(DatastoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn active_pairs<F>(&self, filter: F) -> Vec<ModelPair>
    where
        F: Fn(&Model) -> bool,
    {
        let tables = self.tables.read();
        tables
            .models
            .iter()
            .filter(|m| m.is_active && filter(m))
            .filter(|m| {
                tables
                    .providers
                    .iter()
                    .any(|p| p.id == m.provider_id && p.is_active)
            })
            .filter_map(|m| {
                tables
                    .global_models
                    .iter()
                    .find(|g| g.id == m.global_model_id && g.is_active)
                    .map(|g| ModelPair::new(m.clone(), g.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn model_by_id(&self, model_id: &str) -> Result<Option<Model>, DatastoreError> {
        self.begin(QueryKind::ModelById)?;
        Ok(self
            .tables
            .read()
            .models
            .iter()
            .find(|m| m.id == model_id)
            .cloned())
    }

    async fn global_model_by_id(
        &self,
        global_model_id: &str,
    ) -> Result<Option<GlobalModel>, DatastoreError> {
        self.begin(QueryKind::GlobalModelById)?;
        Ok(self
            .tables
            .read()
            .global_models
            .iter()
            .find(|g| g.id == global_model_id)
            .cloned())
    }

    async fn global_model_by_name(
        &self,
        name: &str,
    ) -> Result<Option<GlobalModel>, DatastoreError> {
        self.begin(QueryKind::GlobalModelByName)?;
        Ok(self
            .tables
            .read()
            .global_models
            .iter()
            .find(|g| g.name == name)
            .cloned())
    }

    async fn active_model_by_provider_and_global_model(
        &self,
        provider_id: &str,
        global_model_id: &str,
    ) -> Result<Option<Model>, DatastoreError> {
        self.begin(QueryKind::ModelByProviderAndGlobal)?;
        Ok(self
            .tables
            .read()
            .models
            .iter()
            .find(|m| {
                m.provider_id == provider_id && m.global_model_id == global_model_id && m.is_active
            })
            .cloned())
    }

    async fn active_models_by_name_or_alias(
        &self,
        name: &str,
    ) -> Result<Vec<ModelPair>, DatastoreError> {
        self.begin(QueryKind::ModelsByNameOrAlias)?;
        if !self.membership_predicate.load(Ordering::SeqCst) {
            return Err(DatastoreError::UnsupportedPredicate(
                "provider_model_aliases 包含查询不受支持".to_string(),
            ));
        }
        // 与 JSON 包含语义一致：映射名称按原值精确比较
        Ok(self.active_pairs(|m| {
            m.provider_model_name == name
                || m.provider_model_aliases.iter().any(|a| a.name == name)
        }))
    }

    async fn all_active_model_pairs(&self) -> Result<Vec<ModelPair>, DatastoreError> {
        self.begin(QueryKind::AllActivePairs)?;
        Ok(self.active_pairs(|_| true))
    }

    async fn active_global_model_by_name(
        &self,
        name: &str,
    ) -> Result<Option<GlobalModel>, DatastoreError> {
        self.begin(QueryKind::ActiveGlobalModelByName)?;
        Ok(self
            .tables
            .read()
            .global_models
            .iter()
            .find(|g| g.name == name && g.is_active)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryDatastore {
        let store = MemoryDatastore::new();
        store.upsert_provider(Provider::new("p1", "openai"));
        store.upsert_provider(Provider::new("p2", "azure").with_active(false));
        store.upsert_global_model(GlobalModel::new("g1", "gpt-4"));
        store.upsert_model(Model::new("m1", "p1", "g1", "gpt-4-0613").with_aliases(["gpt4"]));
        store.upsert_model(Model::new("m2", "p2", "g1", "gpt-4-azure").with_aliases(["gpt4"]));
        store
    }

    #[tokio::test]
    async fn test_membership_filters_inactive_provider() {
        let store = seeded();
        let pairs = store.active_models_by_name_or_alias("gpt4").await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].model.id, "m1");
        assert_eq!(store.call_count(QueryKind::ModelsByNameOrAlias), 1);
    }

    #[tokio::test]
    async fn test_unsupported_predicate() {
        let store = seeded();
        store.set_membership_predicate_supported(false);

        let err = store.active_models_by_name_or_alias("gpt4").await.unwrap_err();
        assert!(matches!(err, DatastoreError::UnsupportedPredicate(_)));
        assert_eq!(store.all_active_model_pairs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure() {
        let store = seeded();
        store.set_backend_failure(Some("connection reset".to_string()));
        assert_eq!(
            store.model_by_id("m1").await.unwrap_err(),
            DatastoreError::Backend("connection reset".to_string())
        );

        store.set_backend_failure(None);
        assert!(store.model_by_id("m1").await.unwrap().is_some());
        assert_eq!(store.call_count(QueryKind::ModelById), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = seeded();
        store.upsert_global_model(GlobalModel::new("g1", "gpt-4").with_active(false));
        assert!(store
            .active_global_model_by_name("gpt-4")
            .await
            .unwrap()
            .is_none());
        assert!(store.global_model_by_name("gpt-4").await.unwrap().is_some());
    }
}
