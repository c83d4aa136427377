use super::global_models::{GlobalModelDao, GLOBAL_MODEL_COLUMNS};
use super::{json_aliases, json_value};
use crate::datastore::ModelPair;
use crate::models::Model;
use rusqlite::{params, Connection, Row};

const MODEL_COLUMNS: &str = "m.id, m.provider_id, m.global_model_id, m.provider_model_name,
    m.provider_model_aliases, m.is_active, m.is_available, m.price_per_request,
    m.tiered_pricing, m.supports_vision, m.supports_function_calling,
    m.supports_streaming, m.supports_extended_thinking, m.supports_image_generation,
    m.config";

/// `MODEL_COLUMNS` 的列数，连接查询中 GlobalModel 列从此处开始
const MODEL_COLUMN_COUNT: usize = 15;

const ACTIVE_PAIRS_FROM: &str = "FROM models m
    JOIN providers p ON m.provider_id = p.id
    JOIN global_models g ON m.global_model_id = g.id
    WHERE p.is_active = 1 AND m.is_active = 1 AND g.is_active = 1";

pub struct ModelDao;

impl ModelDao {
    pub fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Model>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!("SELECT {MODEL_COLUMNS} FROM models m WHERE m.id = ?"))?;
        let result = stmt.query_row([id], |row| Self::from_row(row, 0));

        match result {
            Ok(model) => Ok(Some(model)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_active_by_provider_and_global(
        conn: &Connection,
        provider_id: &str,
        global_model_id: &str,
    ) -> Result<Option<Model>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {MODEL_COLUMNS} FROM models m
             WHERE m.provider_id = ?1 AND m.global_model_id = ?2 AND m.is_active = 1
             ORDER BY m.id LIMIT 1"
        ))?;
        let result = stmt.query_row([provider_id, global_model_id], |row| Self::from_row(row, 0));

        match result {
            Ok(model) => Ok(Some(model)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 按 provider_model_name 或映射名称查询启用的连接结果
    ///
    /// 映射名称通过 `json_each` 匹配，需要 SQLite 的 JSON 支持。
    pub fn find_active_pairs_by_name_or_alias(
        conn: &Connection,
        name: &str,
    ) -> Result<Vec<ModelPair>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {MODEL_COLUMNS}, {GLOBAL_MODEL_COLUMNS} {ACTIVE_PAIRS_FROM}
               AND (m.provider_model_name = ?1
                    OR EXISTS (
                        SELECT 1 FROM json_each(
                            CASE WHEN json_valid(m.provider_model_aliases)
                                 THEN m.provider_model_aliases END
                        ) AS a
                        WHERE json_extract(a.value, '$.name') = ?1
                    ))
             ORDER BY m.id"
        ))?;

        let pairs = stmt.query_map([name], Self::pair_from_row)?;
        pairs.collect()
    }

    pub fn list_active_pairs(conn: &Connection) -> Result<Vec<ModelPair>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {MODEL_COLUMNS}, {GLOBAL_MODEL_COLUMNS} {ACTIVE_PAIRS_FROM} ORDER BY m.id"
        ))?;

        let pairs = stmt.query_map([], Self::pair_from_row)?;
        pairs.collect()
    }

    pub fn insert(conn: &Connection, model: &Model) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO models (id, provider_id, global_model_id, provider_model_name,
                                 provider_model_aliases, is_active, is_available,
                                 price_per_request, tiered_pricing, supports_vision,
                                 supports_function_calling, supports_streaming,
                                 supports_extended_thinking, supports_image_generation, config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                model.id,
                model.provider_id,
                model.global_model_id,
                model.provider_model_name,
                serde_json::to_string(&model.provider_model_aliases).unwrap_or_default(),
                model.is_active,
                model.is_available,
                model.price_per_request,
                model.tiered_pricing.as_ref().map(|v| v.to_string()),
                model.supports_vision,
                model.supports_function_calling,
                model.supports_streaming,
                model.supports_extended_thinking,
                model.supports_image_generation,
                model.config.as_ref().map(|v| v.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn set_active(conn: &Connection, id: &str, is_active: bool) -> Result<(), rusqlite::Error> {
        conn.execute(
            "UPDATE models SET is_active = ?1 WHERE id = ?2",
            params![is_active, id],
        )?;
        Ok(())
    }

    fn pair_from_row(row: &Row<'_>) -> Result<ModelPair, rusqlite::Error> {
        Ok(ModelPair::new(
            Self::from_row(row, 0)?,
            GlobalModelDao::from_row(row, MODEL_COLUMN_COUNT)?,
        ))
    }

    fn from_row(row: &Row<'_>, offset: usize) -> Result<Model, rusqlite::Error> {
        let aliases: Option<String> = row.get(offset + 4)?;
        let tiered_pricing: Option<String> = row.get(offset + 8)?;
        let config: Option<String> = row.get(offset + 14)?;

        Ok(Model {
            id: row.get(offset)?,
            provider_id: row.get(offset + 1)?,
            global_model_id: row.get(offset + 2)?,
            provider_model_name: row.get(offset + 3)?,
            provider_model_aliases: json_aliases(aliases.as_deref()),
            is_active: row.get(offset + 5)?,
            is_available: row.get(offset + 6)?,
            price_per_request: row.get(offset + 7)?,
            tiered_pricing: json_value(tiered_pricing.as_deref()),
            supports_vision: row.get(offset + 9)?,
            supports_function_calling: row.get(offset + 10)?,
            supports_streaming: row.get(offset + 11)?,
            supports_extended_thinking: row.get(offset + 12)?,
            supports_image_generation: row.get(offset + 13)?,
            config: json_value(config.as_deref()),
        })
    }
}
