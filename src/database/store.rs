use super::dao::{GlobalModelDao, ModelDao};
use super::DbConnection;
use crate::datastore::{Datastore, DatastoreError, ModelPair};
use crate::models::{GlobalModel, Model};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;

/// SQLite 数据存储
///
/// 所有查询在连接锁内同步完成，不跨越 await。
#[derive(Clone)]
pub struct SqliteDatastore {
    conn: DbConnection,
    membership_predicate: bool,
}

impl SqliteDatastore {
    pub fn new(conn: DbConnection) -> Self {
        Self {
            conn,
            membership_predicate: true,
        }
    }

    /// 打开数据库文件（不存在时创建并建表）
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatastoreError> {
        super::open_database(path)
            .map(Self::new)
            .map_err(backend_error)
    }

    pub fn open_in_memory() -> Result<Self, DatastoreError> {
        super::open_in_memory()
            .map(Self::new)
            .map_err(backend_error)
    }

    /// 关闭后映射名称查询直接返回 `UnsupportedPredicate`
    pub fn with_membership_predicate(mut self, enabled: bool) -> Self {
        self.membership_predicate = enabled;
        self
    }

    pub fn connection(&self) -> DbConnection {
        self.conn.clone()
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, rusqlite::Error>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self.conn.lock().map_err(|e| {
            rusqlite::Error::InvalidParameterName(format!("数据库连接锁已损坏: {e}"))
        })?;
        f(&conn)
    }
}

fn backend_error(e: rusqlite::Error) -> DatastoreError {
    DatastoreError::Backend(e.to_string())
}

/// 缺少 JSON 函数的 SQLite 构建会报 "no such function" / "no such table: json_each"
fn membership_error(e: rusqlite::Error) -> DatastoreError {
    let message = e.to_string();
    let unsupported = message.contains("no such function")
        || message.contains("json_each")
        || message.contains("json_valid")
        || message.contains("json_extract");
    if unsupported {
        DatastoreError::UnsupportedPredicate(message)
    } else {
        DatastoreError::Backend(message)
    }
}

#[async_trait]
impl Datastore for SqliteDatastore {
    async fn model_by_id(&self, model_id: &str) -> Result<Option<Model>, DatastoreError> {
        self.with_conn(|conn| ModelDao::get_by_id(conn, model_id))
            .map_err(backend_error)
    }

    async fn global_model_by_id(
        &self,
        global_model_id: &str,
    ) -> Result<Option<GlobalModel>, DatastoreError> {
        self.with_conn(|conn| GlobalModelDao::get_by_id(conn, global_model_id))
            .map_err(backend_error)
    }

    async fn global_model_by_name(
        &self,
        name: &str,
    ) -> Result<Option<GlobalModel>, DatastoreError> {
        self.with_conn(|conn| GlobalModelDao::get_by_name(conn, name))
            .map_err(backend_error)
    }

    async fn active_model_by_provider_and_global_model(
        &self,
        provider_id: &str,
        global_model_id: &str,
    ) -> Result<Option<Model>, DatastoreError> {
        self.with_conn(|conn| {
            ModelDao::get_active_by_provider_and_global(conn, provider_id, global_model_id)
        })
        .map_err(backend_error)
    }

    async fn active_models_by_name_or_alias(
        &self,
        name: &str,
    ) -> Result<Vec<ModelPair>, DatastoreError> {
        if !self.membership_predicate {
            return Err(DatastoreError::UnsupportedPredicate(
                "provider_model_aliases 包含查询已禁用".to_string(),
            ));
        }
        self.with_conn(|conn| ModelDao::find_active_pairs_by_name_or_alias(conn, name))
            .map_err(membership_error)
    }

    async fn all_active_model_pairs(&self) -> Result<Vec<ModelPair>, DatastoreError> {
        self.with_conn(ModelDao::list_active_pairs)
            .map_err(backend_error)
    }

    async fn active_global_model_by_name(
        &self,
        name: &str,
    ) -> Result<Option<GlobalModel>, DatastoreError> {
        self.with_conn(|conn| GlobalModelDao::get_active_by_name(conn, name))
            .map_err(backend_error)
    }
}
