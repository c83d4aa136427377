//! 缓存创建 tokens 提取
//!
//! 按优先级支持三种写法：
//! 1. 嵌套：`cache_creation.ephemeral_5m_input_tokens` + `cache_creation.ephemeral_1h_input_tokens`
//! 2. 扁平：`claude_cache_creation_5_m_tokens` + `claude_cache_creation_1_h_tokens`
//! 3. 旧格式：`cache_creation_input_tokens`
//!
//! 嵌套或扁平格式存在但合计为 0 时，回退到旧格式字段。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const NESTED_KEY: &str = "cache_creation";
const NESTED_5M: &str = "ephemeral_5m_input_tokens";
const NESTED_1H: &str = "ephemeral_1h_input_tokens";
const FLAT_5M: &str = "claude_cache_creation_5_m_tokens";
const FLAT_1H: &str = "claude_cache_creation_1_h_tokens";
const LEGACY: &str = "cache_creation_input_tokens";

/// 用量字段错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UsageFieldError {
    /// 字段值无法转换为整数
    #[error("用量字段 {field} 不是整数: {value}")]
    NotNumeric { field: String, value: Value },
}

/// 结果来自哪种写法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCreationSource {
    Nested,
    Flat,
    Legacy,
}

/// 缓存创建 tokens 及其来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCreation {
    pub tokens: i64,
    pub source: CacheCreationSource,
}

/// 提取缓存创建 tokens 及来源
///
/// 非对象的 usage 按 `{}` 处理。
pub fn extract_cache_creation(usage: &Value) -> Result<CacheCreation, UsageFieldError> {
    // 嵌套与扁平互斥，嵌套存在时不检查扁平字段
    let tier = match nested_total(usage)? {
        Some(total) => Some((total, CacheCreationSource::Nested)),
        None => flat_total(usage)?.map(|total| (total, CacheCreationSource::Flat)),
    };

    if let Some((total, source)) = tier {
        if total > 0 {
            return Ok(CacheCreation {
                tokens: total,
                source,
            });
        }
    }

    Ok(CacheCreation {
        tokens: field_or_zero(usage, LEGACY, LEGACY)?,
        source: CacheCreationSource::Legacy,
    })
}

/// 提取缓存创建 tokens
pub fn extract_cache_creation_tokens(usage: &Value) -> Result<i64, UsageFieldError> {
    extract_cache_creation(usage).map(|c| c.tokens)
}

fn nested_total(usage: &Value) -> Result<Option<i64>, UsageFieldError> {
    let Some(nested) = usage.get(NESTED_KEY).filter(|v| v.is_object()) else {
        return Ok(None);
    };
    let total = field_or_zero(nested, NESTED_5M, &format!("{NESTED_KEY}.{NESTED_5M}"))?
        .saturating_add(field_or_zero(
            nested,
            NESTED_1H,
            &format!("{NESTED_KEY}.{NESTED_1H}"),
        )?);
    Ok(Some(total))
}

fn flat_total(usage: &Value) -> Result<Option<i64>, UsageFieldError> {
    let present = usage.get(FLAT_5M).is_some() || usage.get(FLAT_1H).is_some();
    if !present {
        return Ok(None);
    }
    let total = field_or_zero(usage, FLAT_5M, FLAT_5M)?
        .saturating_add(field_or_zero(usage, FLAT_1H, FLAT_1H)?);
    Ok(Some(total))
}

/// 缺失为 0；存在但无法转换为整数时报错（包括 null）
fn field_or_zero(object: &Value, key: &str, field: &str) -> Result<i64, UsageFieldError> {
    match object.get(key) {
        None => Ok(0),
        Some(value) => coerce_int(value).ok_or_else(|| UsageFieldError::NotNumeric {
            field: field.to_string(),
            value: value.clone(),
        }),
    }
}

/// 整数、浮点（向零截断）、布尔、整数字符串
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let truncated = n.as_f64().filter(|f| f.is_finite())?.trunc();
            (truncated >= i64::MIN as f64 && truncated < i64::MAX as f64)
                .then_some(truncated as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tokens(usage: Value) -> i64 {
        extract_cache_creation_tokens(&usage).unwrap()
    }

    #[test]
    fn test_empty_usage() {
        assert_eq!(tokens(json!({})), 0);
        assert_eq!(tokens(Value::Null), 0);
    }

    #[test]
    fn test_nested_format() {
        let usage = json!({
            "cache_creation": {"ephemeral_5m_input_tokens": 456, "ephemeral_1h_input_tokens": 100}
        });
        let result = extract_cache_creation(&usage).unwrap();
        assert_eq!(result.tokens, 556);
        assert_eq!(result.source, CacheCreationSource::Nested);
    }

    #[test]
    fn test_nested_zero_falls_back_to_legacy() {
        let usage = json!({
            "cache_creation": {"ephemeral_5m_input_tokens": 0, "ephemeral_1h_input_tokens": 0},
            "cache_creation_input_tokens": 549
        });
        let result = extract_cache_creation(&usage).unwrap();
        assert_eq!(result.tokens, 549);
        assert_eq!(result.source, CacheCreationSource::Legacy);
    }

    #[test]
    fn test_nested_outranks_flat_and_legacy() {
        let usage = json!({
            "cache_creation": {"ephemeral_5m_input_tokens": 100, "ephemeral_1h_input_tokens": 200},
            "claude_cache_creation_5_m_tokens": 999,
            "claude_cache_creation_1_h_tokens": 888,
            "cache_creation_input_tokens": 777
        });
        assert_eq!(tokens(usage), 300);
    }

    #[test]
    fn test_zero_nested_skips_flat() {
        // 嵌套格式存在时不再检查扁平格式
        let usage = json!({
            "cache_creation": {},
            "claude_cache_creation_5_m_tokens": 999,
            "cache_creation_input_tokens": 7
        });
        assert_eq!(tokens(usage), 7);
    }

    #[test]
    fn test_non_object_nested_is_ignored() {
        let usage = json!({
            "cache_creation": 12,
            "claude_cache_creation_1_h_tokens": 30
        });
        let result = extract_cache_creation(&usage).unwrap();
        assert_eq!(result.tokens, 30);
        assert_eq!(result.source, CacheCreationSource::Flat);
    }

    #[test]
    fn test_flat_format() {
        assert_eq!(
            tokens(json!({
                "claude_cache_creation_5_m_tokens": 100,
                "claude_cache_creation_1_h_tokens": 50
            })),
            150
        );
        assert_eq!(tokens(json!({"claude_cache_creation_5_m_tokens": 80})), 80);
        assert_eq!(tokens(json!({"claude_cache_creation_1_h_tokens": 40})), 40);
    }

    #[test]
    fn test_flat_zero_falls_back_to_legacy() {
        let usage = json!({
            "claude_cache_creation_5_m_tokens": 0,
            "claude_cache_creation_1_h_tokens": 0,
            "cache_creation_input_tokens": 300
        });
        assert_eq!(tokens(usage), 300);
    }

    #[test]
    fn test_legacy_only() {
        let usage = json!({"cache_creation_input_tokens": 1024, "input_tokens": 10});
        let result = extract_cache_creation(&usage).unwrap();
        assert_eq!(result.tokens, 1024);
        assert_eq!(result.source, CacheCreationSource::Legacy);
    }

    #[test]
    fn test_all_zero() {
        let usage = json!({
            "cache_creation": {"ephemeral_5m_input_tokens": 0},
            "cache_creation_input_tokens": 0
        });
        assert_eq!(tokens(usage), 0);
    }

    #[test]
    fn test_unrelated_fields_ignored() {
        let usage = json!({
            "input_tokens": 100,
            "output_tokens": 50,
            "cache_read_input_tokens": 200
        });
        assert_eq!(tokens(usage), 0);
    }

    #[test]
    fn test_coercion() {
        assert_eq!(tokens(json!({"cache_creation_input_tokens": "42"})), 42);
        assert_eq!(tokens(json!({"cache_creation_input_tokens": " 7 "})), 7);
        assert_eq!(tokens(json!({"cache_creation_input_tokens": 12.9})), 12);
        assert_eq!(tokens(json!({"cache_creation_input_tokens": true})), 1);
        assert_eq!(
            tokens(json!({"cache_creation": {"ephemeral_5m_input_tokens": "5"}})),
            5
        );
    }

    #[test]
    fn test_non_numeric_value_is_error() {
        let err = extract_cache_creation_tokens(&json!({
            "cache_creation": {"ephemeral_1h_input_tokens": "many"}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            UsageFieldError::NotNumeric {
                field: "cache_creation.ephemeral_1h_input_tokens".to_string(),
                value: json!("many"),
            }
        );

        assert!(extract_cache_creation_tokens(&json!({"cache_creation_input_tokens": null})).is_err());
        assert!(extract_cache_creation_tokens(&json!({"cache_creation_input_tokens": "1.5"})).is_err());
    }
}
