//! 数据模型
//!
//! Provider / Model / GlobalModel 的只读视图。

mod global_model;
mod model;
mod provider_model;

pub use global_model::GlobalModel;
pub use model::{Model, ModelAlias};
pub use provider_model::Provider;
