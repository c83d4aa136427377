use rusqlite::Connection;

/// 创建解析所需的表结构
///
/// JSON 列（映射名称、能力标签、计费、配置）以 TEXT 保存。
pub fn create_tables(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS providers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS global_models (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT,
            default_supports_vision INTEGER NOT NULL DEFAULT 0,
            default_supports_function_calling INTEGER NOT NULL DEFAULT 0,
            default_supports_streaming INTEGER NOT NULL DEFAULT 1,
            default_supports_extended_thinking INTEGER NOT NULL DEFAULT 0,
            default_supports_image_generation INTEGER NOT NULL DEFAULT 0,
            supported_capabilities TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            description TEXT
        );

        CREATE TABLE IF NOT EXISTS models (
            id TEXT PRIMARY KEY,
            provider_id TEXT NOT NULL REFERENCES providers(id),
            global_model_id TEXT NOT NULL REFERENCES global_models(id),
            provider_model_name TEXT NOT NULL,
            provider_model_aliases TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_available INTEGER NOT NULL DEFAULT 1,
            price_per_request REAL,
            tiered_pricing TEXT,
            supports_vision INTEGER,
            supports_function_calling INTEGER,
            supports_streaming INTEGER,
            supports_extended_thinking INTEGER,
            supports_image_generation INTEGER,
            config TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_models_provider_model_name
            ON models(provider_model_name);
        CREATE INDEX IF NOT EXISTS idx_models_provider_global
            ON models(provider_id, global_model_id);",
    )
}
