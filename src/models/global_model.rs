//! GlobalModel 模型
//!
//! 跨 Provider 的统一模型身份，由管理端维护，本 crate 只读。

use super::provider_model::default_true;
use serde::{Deserialize, Serialize};

/// 统一模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalModel {
    pub id: String,
    /// 唯一名称（人工录入）
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub default_supports_vision: bool,
    #[serde(default)]
    pub default_supports_function_calling: bool,
    #[serde(default = "default_true")]
    pub default_supports_streaming: bool,
    #[serde(default)]
    pub default_supports_extended_thinking: bool,
    #[serde(default)]
    pub default_supports_image_generation: bool,
    /// 支持的能力标签
    #[serde(default)]
    pub supported_capabilities: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl GlobalModel {
    /// 创建启用状态、默认能力的 GlobalModel
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            default_supports_vision: false,
            default_supports_function_calling: false,
            default_supports_streaming: true,
            default_supports_extended_thinking: false,
            default_supports_image_generation: false,
            supported_capabilities: Vec::new(),
            is_active: true,
            description: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// 是否声明了某项能力标签
    pub fn supports(&self, capability: &str) -> bool {
        self.supported_capabilities.iter().any(|c| c == capability)
    }
}
