//! Headers 规则模块
//!
//! 按声明式规则改写 headers，支持：
//! - remove: 删除（大小写不敏感）
//! - replace_name: 重命名（大小写不敏感，只处理第一个匹配）
//! - replace_value: 值替换（字面量或正则，可选大小写不敏感）
//! - add: 新增（不覆盖已存在的同名 header）
//!
//! 不含上述四个键的扁平对象视为旧格式，等价于 `{"add": <对象>}`。

mod engine;
mod types;

pub use engine::{apply_header_rules, merge_legacy_headers, validate_header_rules, HeaderRuleEngine};
pub use types::{HeaderRuleError, HeaderRules, Headers, ReplaceValueRule, ValueRewrite};
