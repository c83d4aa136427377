//! Headers 规则执行

use super::types::{HeaderRuleError, HeaderRules, Headers, STRUCTURAL_KEYS};
use crate::events::{CoreEvent, EventSink, TracingEventSink};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Headers 规则引擎
///
/// 无状态，规则失败通过事件报告，不向调用方返回错误。
#[derive(Clone)]
pub struct HeaderRuleEngine {
    events: Arc<dyn EventSink>,
}

impl Default for HeaderRuleEngine {
    fn default() -> Self {
        Self::new(Arc::new(TracingEventSink))
    }
}

impl HeaderRuleEngine {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self { events }
    }

    /// 解析并应用规则
    ///
    /// 规则为空或无法解析时原样返回 headers 的副本。
    pub fn apply(&self, headers: &Headers, rules: Option<&Value>) -> Headers {
        let Some(rules) = rules.filter(|r| is_truthy(r)) else {
            return headers.clone();
        };

        match HeaderRules::parse(rules) {
            Ok(parsed) => self.apply_rules(headers, &parsed),
            Err(e) => {
                self.events.emit(CoreEvent::HeaderRulesRejected {
                    error: e.to_string(),
                });
                headers.clone()
            }
        }
    }

    /// 应用已解析的规则
    ///
    /// 顺序：remove → replace_name → replace_value → add
    pub fn apply_rules(&self, headers: &Headers, rules: &HeaderRules) -> Headers {
        let mut result = headers.clone();
        if rules.is_empty() {
            return result;
        }

        // 1. 删除（同名不同大小写的全部删除）
        for name in &rules.remove {
            result.retain(|key, _| !key.eq_ignore_ascii_case(name));
        }

        // 2. 重命名，只处理第一个匹配
        for (old_name, new_name) in &rules.replace_name {
            if let Some(index) = find_ignore_case(&result, old_name) {
                if let Some((_, value)) = result.shift_remove_index(index) {
                    result.insert(new_name.clone(), value);
                }
            }
        }

        // 3. 值替换，只处理第一个匹配
        for (header, rewrite) in &rules.replace_value {
            let Some((key, value)) = find_ignore_case(&result, header)
                .and_then(|index| result.get_index_mut(index))
            else {
                continue;
            };

            match rewrite.rewrite(key, value) {
                Ok(replaced) => *value = replaced,
                Err(e) => self.events.emit(CoreEvent::ReplaceValueFailed {
                    header: key.clone(),
                    error: e.to_string(),
                }),
            }
        }

        // 4. 新增，不覆盖已存在的
        for (name, value) in &rules.add {
            if !result.contains_key(name) {
                result.insert(name.clone(), value.clone());
            }
        }

        result
    }
}

fn find_ignore_case(headers: &Headers, name: &str) -> Option<usize> {
    headers.keys().position(|key| key.eq_ignore_ascii_case(name))
}

/// null / false / 0 / 空字符串 / 空数组 / 空对象视为未配置
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// 使用 tracing 输出事件的便捷入口
pub fn apply_header_rules(headers: &Headers, rules: Option<&Value>) -> Headers {
    HeaderRuleEngine::default().apply(headers, rules)
}

/// 校验规则，错误信息可直接展示给配置者
///
/// 比 `apply` 严格：任一正则无法编译即视为无效。
pub fn validate_header_rules(rules: &Value) -> Result<(), HeaderRuleError> {
    if !rules.is_object() {
        return Err(HeaderRuleError::InvalidRules(
            "规则必须是 JSON 对象".to_string(),
        ));
    }
    HeaderRules::parse(rules)?.check()
}

/// 合并旧格式 headers 与规则
///
/// 以 `rules` 为起点；`headers` 为空时原样返回。否则旧格式的扁平规则先转换为
/// `{"add": ...}`，再把 `headers` 合并进 `add`，`headers` 优先。
pub fn merge_legacy_headers(headers: Option<&Headers>, rules: Option<&Value>) -> Value {
    let mut result = match rules {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    let Some(headers) = headers.filter(|h| !h.is_empty()) else {
        return Value::Object(result);
    };

    if is_legacy(&result) {
        let legacy = std::mem::take(&mut result);
        result.insert("add".to_string(), Value::Object(legacy));
    }

    let add = result
        .entry("add")
        .or_insert_with(|| Value::Object(Map::new()));
    if !add.is_object() {
        *add = Value::Object(Map::new());
    }
    if let Value::Object(add) = add {
        for (name, value) in headers {
            add.insert(name.clone(), Value::String(value.clone()));
        }
    }

    Value::Object(result)
}

fn is_legacy(map: &Map<String, Value>) -> bool {
    !map.is_empty() && !STRUCTURAL_KEYS.iter().any(|key| map.contains_key(*key))
}
