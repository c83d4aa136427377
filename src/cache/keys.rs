//! 缓存 key 规则

pub fn model_by_id(model_id: &str) -> String {
    format!("model:id:{model_id}")
}

pub fn global_model_by_id(global_model_id: &str) -> String {
    format!("global_model:id:{global_model_id}")
}

pub fn model_by_provider_and_global(provider_id: &str, global_model_id: &str) -> String {
    format!("model:provider_global:{provider_id}:{global_model_id}")
}

pub fn global_model_by_name(name: &str) -> String {
    format!("global_model:name:{name}")
}

/// 名称 / 映射名称解析结果的 key，`normalized_name` 已去除首尾空白
pub fn global_model_resolve(normalized_name: &str) -> String {
    format!("global_model:resolve:{normalized_name}")
}
