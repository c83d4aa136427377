//! Headers 规则类型定义

use indexmap::IndexMap;
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// 有序 headers
pub type Headers = IndexMap<String, String>;

/// 结构化规则的四个键，缺少全部四个键的对象按旧格式处理
pub(crate) const STRUCTURAL_KEYS: [&str; 4] = ["add", "remove", "replace_name", "replace_value"];

/// Headers 规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeaderRuleError {
    /// 规则结构无效
    #[error("Headers 规则无效: {0}")]
    InvalidRules(String),

    /// replace_value 中的正则无法编译
    #[error("'{header}' 的正则表达式无效: {message}")]
    InvalidRegex { header: String, message: String },

    /// 单个 header 的值替换失败
    #[error("'{header}' 的值替换失败: {message}")]
    Substitution { header: String, message: String },
}

fn default_case_sensitive() -> bool {
    true
}

/// replace_value 的单条规则（声明式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceValueRule {
    /// 要搜索的值
    pub search: String,
    /// 替换后的值
    ///
    /// 正则模式下用 `\1` / `\g<name>` 引用分组，`$` 按字面量处理。
    pub replace: String,
    /// 是否使用正则表达式
    #[serde(default)]
    pub regex: bool,
    /// 是否区分大小写
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
}

impl ReplaceValueRule {
    pub fn literal(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            replace: replace.into(),
            regex: false,
            case_sensitive: true,
        }
    }

    pub fn pattern(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            regex: true,
            ..Self::literal(search, replace)
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.case_sensitive = false;
        self
    }
}

/// 编译后的值替换
#[derive(Debug, Clone)]
pub enum ValueRewrite {
    /// 区分大小写的字面量替换
    Literal { search: String, replace: String },
    /// 大小写不敏感的字面量替换，替换串不展开 `$` 引用
    LiteralIgnoreCase { pattern: Regex, replace: String },
    /// 正则替换，替换串已转换为 regex 的 `${N}` / `${name}` 写法
    Pattern { pattern: Regex, replace: String },
    /// 正则无法编译，应用到该 header 时报错并保留原值
    Invalid { error: HeaderRuleError },
}

impl ValueRewrite {
    /// 编译一条规则，`header` 仅用于错误信息
    pub fn compile(header: &str, rule: &ReplaceValueRule) -> Result<Self, HeaderRuleError> {
        let replace = rule.replace.clone();

        if rule.regex {
            let replace = translate_template(&replace);
            let pattern = RegexBuilder::new(&rule.search)
                .case_insensitive(!rule.case_sensitive)
                .build()
                .map_err(|e| HeaderRuleError::InvalidRegex {
                    header: header.to_string(),
                    message: e.to_string(),
                })?;
            return Ok(ValueRewrite::Pattern { pattern, replace });
        }

        if rule.case_sensitive {
            return Ok(ValueRewrite::Literal {
                search: rule.search.clone(),
                replace,
            });
        }

        let pattern = RegexBuilder::new(&regex::escape(&rule.search))
            .case_insensitive(true)
            .build()
            .map_err(|e| HeaderRuleError::InvalidRegex {
                header: header.to_string(),
                message: e.to_string(),
            })?;
        Ok(ValueRewrite::LiteralIgnoreCase { pattern, replace })
    }

    /// 替换所有匹配
    pub fn rewrite(&self, header: &str, value: &str) -> Result<String, HeaderRuleError> {
        match self {
            ValueRewrite::Literal { search, replace } => Ok(value.replace(search.as_str(), replace)),
            ValueRewrite::LiteralIgnoreCase { pattern, replace } => Ok(pattern
                .replace_all(value, NoExpand(replace))
                .into_owned()),
            ValueRewrite::Pattern { pattern, replace } => {
                check_group_refs(pattern, replace).map_err(|message| {
                    HeaderRuleError::Substitution {
                        header: header.to_string(),
                        message,
                    }
                })?;
                Ok(pattern.replace_all(value, replace.as_str()).into_owned())
            }
            ValueRewrite::Invalid { error } => Err(error.clone()),
        }
    }
}

/// 转换替换串中的分组引用
///
/// `\1` / `\g<name>` 转为 `${1}` / `${name}`，`\\` 为反斜杠，`\n` `\t` `\r` 为控制字符，
/// 字面量 `$` 转义为 `$$`。其余反斜杠原样保留。
fn translate_template(replace: &str) -> String {
    let mut out = String::with_capacity(replace.len());
    let mut rest = replace;

    while let Some(pos) = rest.find(|c: char| c == '\\' || c == '$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if rest[pos..].starts_with('$') {
            out.push_str("$$");
            rest = tail;
            continue;
        }

        if let Some(after) = tail.strip_prefix('\\') {
            out.push('\\');
            rest = after;
            continue;
        }

        if let Some((name, after)) = tail
            .strip_prefix("g<")
            .and_then(|named| named.find('>').map(|end| (&named[..end], &named[end + 1..])))
        {
            out.push_str("${");
            out.push_str(name);
            out.push('}');
            rest = after;
            continue;
        }

        let digits = tail.bytes().take(2).take_while(u8::is_ascii_digit).count();
        if digits > 0 && !tail.starts_with('0') {
            out.push_str("${");
            out.push_str(&tail[..digits]);
            out.push('}');
            rest = &tail[digits..];
            continue;
        }

        let control = match tail.chars().next() {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            _ => None,
        };
        match control {
            Some(c) => {
                out.push(c);
                rest = &tail[1..];
            }
            None => {
                out.push('\\');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// 检查替换串中的 `$N` / `$name` / `${name}` 引用都指向存在的分组
fn check_group_refs(pattern: &Regex, replace: &str) -> Result<(), String> {
    let mut rest = replace;
    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];

        // `$$` 是字面量 `$`
        if let Some(tail) = rest.strip_prefix('$') {
            rest = tail;
            continue;
        }

        let (name, tail) = match rest.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], &braced[end + 1..]),
                None => continue,
            },
            None => {
                let end = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len());
                (&rest[..end], &rest[end..])
            }
        };
        rest = tail;

        if name.is_empty() {
            continue;
        }
        let known = match name.parse::<usize>() {
            Ok(index) => index < pattern.captures_len(),
            Err(_) => pattern.capture_names().flatten().any(|n| n == name),
        };
        if !known {
            return Err(format!("替换串引用了不存在的分组: {name}"));
        }
    }
    Ok(())
}

/// 声明式规则的原始结构
#[derive(Debug, Default, Deserialize)]
struct RawHeaderRules {
    #[serde(default)]
    add: Option<IndexMap<String, String>>,
    #[serde(default)]
    remove: Option<Vec<String>>,
    #[serde(default)]
    replace_name: Option<IndexMap<String, String>>,
    #[serde(default)]
    replace_value: Option<IndexMap<String, ReplaceValueRule>>,
}

/// 校验并编译后的规则集
#[derive(Debug, Clone, Default)]
pub struct HeaderRules {
    pub add: IndexMap<String, String>,
    pub remove: Vec<String>,
    pub replace_name: IndexMap<String, String>,
    pub replace_value: IndexMap<String, ValueRewrite>,
}

impl HeaderRules {
    /// 解析规则
    ///
    /// - 非对象（包括 null）视为空规则
    /// - 不含四个结构键的对象按旧格式处理为 `add`
    /// - 任一字段类型错误时整体失败
    /// - 正则无法编译只影响对应 header，见 [`HeaderRules::check`]
    pub fn parse(rules: &Value) -> Result<Self, HeaderRuleError> {
        let object = match rules.as_object() {
            Some(object) if !object.is_empty() => object,
            _ => return Ok(Self::default()),
        };

        if !STRUCTURAL_KEYS.iter().any(|key| object.contains_key(*key)) {
            let add = IndexMap::<String, String>::deserialize(rules)
                .map_err(|e| HeaderRuleError::InvalidRules(e.to_string()))?;
            return Ok(Self {
                add,
                ..Self::default()
            });
        }

        let raw = RawHeaderRules::deserialize(rules)
            .map_err(|e| HeaderRuleError::InvalidRules(e.to_string()))?;
        Self::compile(raw)
    }

    fn compile(raw: RawHeaderRules) -> Result<Self, HeaderRuleError> {
        let mut replace_value = IndexMap::new();
        for (header, rule) in raw.replace_value.unwrap_or_default() {
            let rewrite = ValueRewrite::compile(&header, &rule)
                .unwrap_or_else(|error| ValueRewrite::Invalid { error });
            replace_value.insert(header, rewrite);
        }

        Ok(Self {
            add: raw.add.unwrap_or_default(),
            remove: raw.remove.unwrap_or_default(),
            replace_name: raw.replace_name.unwrap_or_default(),
            replace_value,
        })
    }

    /// 返回第一条无法编译的 replace_value 规则的错误
    pub fn check(&self) -> Result<(), HeaderRuleError> {
        match self.replace_value.values().find_map(|rewrite| match rewrite {
            ValueRewrite::Invalid { error } => Some(error),
            _ => None,
        }) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// 没有任何规则
    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.remove.is_empty()
            && self.replace_name.is_empty()
            && self.replace_value.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_flat_map_becomes_add() {
        let rules = HeaderRules::parse(&json!({"X-A": "1", "X-B": "2"})).unwrap();
        assert_eq!(rules.add.get("X-A").map(String::as_str), Some("1"));
        assert_eq!(rules.add.len(), 2);
        assert!(rules.remove.is_empty());
    }

    #[test]
    fn test_non_object_is_empty() {
        assert!(HeaderRules::parse(&Value::Null).unwrap().is_empty());
        assert!(HeaderRules::parse(&json!(["X-A"])).unwrap().is_empty());
        assert!(HeaderRules::parse(&json!("X-A")).unwrap().is_empty());
        assert!(HeaderRules::parse(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_replace_value_defaults() {
        let rule: ReplaceValueRule =
            serde_json::from_value(json!({"search": "a", "replace": "b"})).unwrap();
        assert_eq!(rule, ReplaceValueRule::literal("a", "b"));
        assert!(rule.case_sensitive);
        assert!(!rule.regex);
    }

    #[test]
    fn test_invalid_regex_kept_per_header() {
        let rules = HeaderRules::parse(&json!({
            "replace_value": {
                "X-H": {"search": "[", "replace": "y", "regex": true},
                "X-V": {"search": "v(?=1)", "replace": "w", "regex": true},
                "X-OK": {"search": "a", "replace": "b", "regex": true}
            }
        }))
        .unwrap();

        assert!(matches!(rules.replace_value["X-H"], ValueRewrite::Invalid { .. }));
        assert!(matches!(rules.replace_value["X-V"], ValueRewrite::Invalid { .. }));
        assert!(matches!(rules.replace_value["X-OK"], ValueRewrite::Pattern { .. }));

        let err = rules.check().unwrap_err();
        assert!(matches!(err, HeaderRuleError::InvalidRegex { ref header, .. } if header == "X-H"));
        assert_eq!(
            rules.replace_value["X-H"].rewrite("X-H", "abc").unwrap_err(),
            err
        );
    }

    #[test]
    fn test_translate_template() {
        assert_eq!(translate_template(r"v\1.\2"), "v${1}.${2}");
        assert_eq!(translate_template(r"\g<ver>-\g<1>"), "${ver}-${1}");
        assert_eq!(translate_template(r"\12"), "${12}");
        assert_eq!(translate_template("$5 $"), "$$5 $$");
        assert_eq!(translate_template(r"a\\1"), r"a\1");
        assert_eq!(translate_template(r"\n\t"), "\n\t");
        assert_eq!(translate_template(r"\0 \x \g<"), r"\0 \x \g<");
        assert_eq!(translate_template("plain"), "plain");
    }

    #[test]
    fn test_regex_replace_python_references() {
        let rule = ReplaceValueRule::pattern(r"(?P<major>\d+)\.(\d+)", r"\g<major>_\2 $1");
        let rewrite = ValueRewrite::compile("X-V", &rule).unwrap();
        assert_eq!(rewrite.rewrite("X-V", "v1.2").unwrap(), "v1_2 $1");

        let missing = ValueRewrite::compile("X-V", &ReplaceValueRule::pattern("(a)", r"\3")).unwrap();
        assert!(missing.rewrite("X-V", "a").is_err());
    }

    #[test]
    fn test_wrong_field_type_rejected() {
        let err = HeaderRules::parse(&json!({"remove": "X-A"})).unwrap_err();
        assert!(matches!(err, HeaderRuleError::InvalidRules(_)));

        let err = HeaderRules::parse(&json!({"X-A": 1})).unwrap_err();
        assert!(matches!(err, HeaderRuleError::InvalidRules(_)));
    }

    #[test]
    fn test_group_reference_check() {
        let pattern = Regex::new(r"(?P<ver>\d+)\.(\d+)").unwrap();
        assert!(check_group_refs(&pattern, "v$1.$2").is_ok());
        assert!(check_group_refs(&pattern, "v${ver}").is_ok());
        assert!(check_group_refs(&pattern, "$$5").is_ok());
        assert!(check_group_refs(&pattern, "${3}").is_err());
        assert!(check_group_refs(&pattern, "$missing").is_err());
    }

    #[test]
    fn test_literal_ignore_case_does_not_expand() {
        let rewrite =
            ValueRewrite::compile("X-H", &ReplaceValueRule::literal("A.B", "$1").ignore_case())
                .unwrap();
        assert_eq!(rewrite.rewrite("X-H", "xa.by a.b").unwrap(), "x$1y $1");
        // 点号按字面量匹配
        assert_eq!(rewrite.rewrite("X-H", "aXb").unwrap(), "aXb");
    }
}
