//! 数据存储接口
//!
//! Provider / Model / GlobalModel 的只读查询面。
//! 映射名称包含查询（"JSON 数组中存在 name = x 的对象"）是可选能力，
//! 不支持时返回 [`DatastoreError::UnsupportedPredicate`]，由调用方回退到全量扫描。

mod memory;

pub use memory::{MemoryDatastore, QueryKind};

use crate::models::{GlobalModel, Model};
use async_trait::async_trait;
use thiserror::Error;

/// 数据存储错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatastoreError {
    /// 不支持映射名称包含查询
    #[error("不支持的查询条件: {0}")]
    UnsupportedPredicate(String),

    /// 后端错误
    #[error("数据存储错误: {0}")]
    Backend(String),
}

/// 一条 Model 与其 GlobalModel 的连接结果
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPair {
    pub model: Model,
    pub global_model: GlobalModel,
}

impl ModelPair {
    pub fn new(model: Model, global_model: GlobalModel) -> Self {
        Self {
            model,
            global_model,
        }
    }
}

/// 只读数据存储
#[async_trait]
pub trait Datastore: Send + Sync {
    /// 按 ID 查询 Model（不过滤启用状态）
    async fn model_by_id(&self, model_id: &str) -> Result<Option<Model>, DatastoreError>;

    /// 按 ID 查询 GlobalModel（不过滤启用状态）
    async fn global_model_by_id(
        &self,
        global_model_id: &str,
    ) -> Result<Option<GlobalModel>, DatastoreError>;

    /// 按名称查询 GlobalModel（不过滤启用状态）
    async fn global_model_by_name(&self, name: &str)
        -> Result<Option<GlobalModel>, DatastoreError>;

    /// 查询某 Provider 下绑定到指定 GlobalModel 的启用 Model
    async fn active_model_by_provider_and_global_model(
        &self,
        provider_id: &str,
        global_model_id: &str,
    ) -> Result<Option<Model>, DatastoreError>;

    /// 启用的 Provider / Model / GlobalModel 连接结果中，
    /// `provider_model_name == name` 或映射名称列表包含 `{"name": name}` 的行
    async fn active_models_by_name_or_alias(
        &self,
        name: &str,
    ) -> Result<Vec<ModelPair>, DatastoreError>;

    /// 所有启用的 Provider / Model / GlobalModel 连接结果
    async fn all_active_model_pairs(&self) -> Result<Vec<ModelPair>, DatastoreError>;

    /// 按名称查询启用的 GlobalModel
    async fn active_global_model_by_name(
        &self,
        name: &str,
    ) -> Result<Option<GlobalModel>, DatastoreError>;
}
