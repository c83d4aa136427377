//! 上游响应用量字段提取
//!
//! - 缓存创建 tokens（嵌套 / 扁平 / 旧格式三种写法）
//! - SSE 响应头

mod sse;
mod tokens;

pub use sse::build_sse_headers;
pub use tokens::{
    extract_cache_creation, extract_cache_creation_tokens, CacheCreation, CacheCreationSource,
    UsageFieldError,
};
