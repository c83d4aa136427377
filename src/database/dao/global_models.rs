use super::json_string_list;
use crate::models::GlobalModel;
use rusqlite::{params, Connection, Row};

pub(crate) const GLOBAL_MODEL_COLUMNS: &str = "g.id, g.name, g.display_name,
    g.default_supports_vision, g.default_supports_function_calling,
    g.default_supports_streaming, g.default_supports_extended_thinking,
    g.default_supports_image_generation, g.supported_capabilities,
    g.is_active, g.description";

pub struct GlobalModelDao;

impl GlobalModelDao {
    pub fn get_by_id(conn: &Connection, id: &str) -> Result<Option<GlobalModel>, rusqlite::Error> {
        Self::query_one(
            conn,
            &format!("SELECT {GLOBAL_MODEL_COLUMNS} FROM global_models g WHERE g.id = ?"),
            id,
        )
    }

    pub fn get_by_name(
        conn: &Connection,
        name: &str,
    ) -> Result<Option<GlobalModel>, rusqlite::Error> {
        Self::query_one(
            conn,
            &format!("SELECT {GLOBAL_MODEL_COLUMNS} FROM global_models g WHERE g.name = ?"),
            name,
        )
    }

    pub fn get_active_by_name(
        conn: &Connection,
        name: &str,
    ) -> Result<Option<GlobalModel>, rusqlite::Error> {
        Self::query_one(
            conn,
            &format!(
                "SELECT {GLOBAL_MODEL_COLUMNS} FROM global_models g
                 WHERE g.name = ? AND g.is_active = 1"
            ),
            name,
        )
    }

    pub fn insert(conn: &Connection, global_model: &GlobalModel) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO global_models (id, name, display_name, default_supports_vision,
                                        default_supports_function_calling, default_supports_streaming,
                                        default_supports_extended_thinking,
                                        default_supports_image_generation, supported_capabilities,
                                        is_active, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                global_model.id,
                global_model.name,
                global_model.display_name,
                global_model.default_supports_vision,
                global_model.default_supports_function_calling,
                global_model.default_supports_streaming,
                global_model.default_supports_extended_thinking,
                global_model.default_supports_image_generation,
                serde_json::to_string(&global_model.supported_capabilities).unwrap_or_default(),
                global_model.is_active,
                global_model.description,
            ],
        )?;
        Ok(())
    }

    pub fn set_active(conn: &Connection, id: &str, is_active: bool) -> Result<(), rusqlite::Error> {
        conn.execute(
            "UPDATE global_models SET is_active = ?1 WHERE id = ?2",
            params![is_active, id],
        )?;
        Ok(())
    }

    /// 从 `offset` 列开始读取 GlobalModel
    pub(crate) fn from_row(row: &Row<'_>, offset: usize) -> Result<GlobalModel, rusqlite::Error> {
        let capabilities: Option<String> = row.get(offset + 8)?;

        Ok(GlobalModel {
            id: row.get(offset)?,
            name: row.get(offset + 1)?,
            display_name: row.get(offset + 2)?,
            default_supports_vision: row.get(offset + 3)?,
            default_supports_function_calling: row.get(offset + 4)?,
            default_supports_streaming: row.get(offset + 5)?,
            default_supports_extended_thinking: row.get(offset + 6)?,
            default_supports_image_generation: row.get(offset + 7)?,
            supported_capabilities: json_string_list(capabilities.as_deref()),
            is_active: row.get(offset + 9)?,
            description: row.get(offset + 10)?,
        })
    }

    fn query_one(
        conn: &Connection,
        sql: &str,
        param: &str,
    ) -> Result<Option<GlobalModel>, rusqlite::Error> {
        let mut stmt = conn.prepare(sql)?;
        let result = stmt.query_row([param], |row| Self::from_row(row, 0));

        match result {
            Ok(global_model) => Ok(Some(global_model)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
