//! SSE 响应头

use crate::header_rules::Headers;

/// 构建流式响应推荐的 headers，减少代理缓冲
///
/// `extra` 覆盖默认值。
pub fn build_sse_headers(extra: Option<&Headers>) -> Headers {
    let mut headers = Headers::new();
    // no-transform 避免代理压缩或改写流
    headers.insert("Cache-Control".to_string(), "no-cache, no-transform".to_string());
    // 提示 Nginx 关闭缓冲
    headers.insert("X-Accel-Buffering".to_string(), "no".to_string());

    if let Some(extra) = extra {
        headers.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    headers
}
