//! SQLite 数据存储
//!
//! 基于 rusqlite 的 [`Datastore`](crate::datastore::Datastore) 实现。

pub mod dao;
pub mod schema;
mod store;

pub use store::SqliteDatastore;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub type DbConnection = Arc<Mutex<Connection>>;

/// 打开数据库文件并建表
pub fn open_database(path: impl AsRef<Path>) -> Result<DbConnection, rusqlite::Error> {
    let conn = Connection::open(path)?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 打开内存数据库并建表
pub fn open_in_memory() -> Result<DbConnection, rusqlite::Error> {
    let conn = Connection::open_in_memory()?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}
