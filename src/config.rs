//! 配置
//!
//! 支持从 YAML 加载，所有字段都有默认值。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 模型缓存默认 TTL（秒）
pub const DEFAULT_MODEL_CACHE_TTL_SECS: u64 = 300;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("解析配置失败: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("配置无效: {0}")]
    Invalid(String),
}

/// 顶层配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// 从 YAML 字符串解析
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 YAML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.model_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.model_ttl_secs 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 缓存配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Model / GlobalModel 缓存 TTL（秒），含负缓存
    pub model_ttl_secs: u64,
}

impl CacheConfig {
    pub fn model_ttl(&self) -> Duration {
        Duration::from_secs(self.model_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            model_ttl_secs: DEFAULT_MODEL_CACHE_TTL_SECS,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace / debug / info / warn / error
    pub level: String,
    /// 是否输出 ANSI 颜色
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
        }
    }
}
