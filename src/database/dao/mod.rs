pub mod global_models;
pub mod models;
pub mod providers;

pub use global_models::GlobalModelDao;
pub use models::ModelDao;
pub use providers::ProviderDao;

use crate::models::ModelAlias;
use serde_json::Value;

/// 解析 JSON 列，无效 JSON 视为空
pub(crate) fn json_value(raw: Option<&str>) -> Option<Value> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .filter(|v: &Value| !v.is_null())
}

/// 解析映射名称列，只保留对象元素
pub(crate) fn json_aliases(raw: Option<&str>) -> Vec<ModelAlias> {
    match json_value(raw) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// 解析字符串数组列，非字符串元素忽略
pub(crate) fn json_string_list(raw: Option<&str>) -> Vec<String> {
    match json_value(raw) {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_aliases_skips_non_objects() {
        let aliases = json_aliases(Some(r#"[{"name": "a"}, "b", 3, {"name": "c", "w": 1}]"#));
        let names: Vec<&str> = aliases.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_json_aliases_invalid() {
        assert!(json_aliases(Some("not json")).is_empty());
        assert!(json_aliases(Some(r#"{"name": "a"}"#)).is_empty());
        assert!(json_aliases(None).is_empty());
    }

    #[test]
    fn test_json_string_list() {
        assert_eq!(
            json_string_list(Some(r#"["vision", 1, "tools"]"#)),
            vec!["vision".to_string(), "tools".to_string()]
        );
        assert!(json_string_list(Some("null")).is_empty());
    }
}
