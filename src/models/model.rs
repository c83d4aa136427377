//! Model 模型
//!
//! 某个 Provider 的具体模型，绑定到唯一的 GlobalModel。

use super::provider_model::default_true;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 映射名称记录
///
/// 除 `name` 外的字段原样保留。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAlias {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelAlias {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Map::new(),
        }
    }

    /// 去除首尾空白后的名称
    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }
}

/// Provider 模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub provider_id: String,
    pub global_model_id: String,
    /// Provider 侧模型名称
    pub provider_model_name: String,
    /// 映射名称列表（有序）
    #[serde(default)]
    pub provider_model_aliases: Vec<ModelAlias>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub price_per_request: Option<f64>,
    #[serde(default)]
    pub tiered_pricing: Option<Value>,
    #[serde(default)]
    pub supports_vision: Option<bool>,
    #[serde(default)]
    pub supports_function_calling: Option<bool>,
    #[serde(default)]
    pub supports_streaming: Option<bool>,
    #[serde(default)]
    pub supports_extended_thinking: Option<bool>,
    #[serde(default)]
    pub supports_image_generation: Option<bool>,
    #[serde(default)]
    pub config: Option<Value>,
}

impl Model {
    pub fn new(
        id: impl Into<String>,
        provider_id: impl Into<String>,
        global_model_id: impl Into<String>,
        provider_model_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider_id: provider_id.into(),
            global_model_id: global_model_id.into(),
            provider_model_name: provider_model_name.into(),
            provider_model_aliases: Vec::new(),
            is_active: true,
            is_available: true,
            price_per_request: None,
            tiered_pricing: None,
            supports_vision: None,
            supports_function_calling: None,
            supports_streaming: None,
            supports_extended_thinking: None,
            supports_image_generation: None,
            config: None,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provider_model_aliases = aliases.into_iter().map(ModelAlias::new).collect();
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// 是否存在（去除空白后）与 `name` 相同的映射名称
    pub fn has_alias(&self, name: &str) -> bool {
        self.provider_model_aliases
            .iter()
            .any(|alias| alias.trimmed_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_keeps_extra_fields() {
        let alias: ModelAlias =
            serde_json::from_value(json!({"name": "gpt4-legacy", "weight": 3})).unwrap();
        assert_eq!(alias.name, "gpt4-legacy");
        assert_eq!(alias.extra.get("weight"), Some(&json!(3)));

        let back = serde_json::to_value(&alias).unwrap();
        assert_eq!(back, json!({"name": "gpt4-legacy", "weight": 3}));
    }

    #[test]
    fn test_has_alias_trims() {
        let model = Model::new("m1", "p1", "g1", "gpt-4-0613").with_aliases(["  gpt4-legacy "]);
        assert!(model.has_alias("gpt4-legacy"));
        assert!(!model.has_alias("gpt-4-0613"));
    }

    #[test]
    fn test_model_defaults_when_deserialized() {
        let model: Model = serde_json::from_value(json!({
            "id": "m1",
            "provider_id": "p1",
            "global_model_id": "g1",
            "provider_model_name": "claude-3"
        }))
        .unwrap();
        assert!(model.is_active);
        assert!(model.is_available);
        assert!(model.provider_model_aliases.is_empty());
        assert_eq!(model.supports_vision, None);
    }
}
