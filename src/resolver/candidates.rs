//! 候选匹配与冲突裁决
//!
//! 映射名称匹配（rank 0）优先于 provider_model_name 匹配（rank 1），
//! 同级按 GlobalModel 名称字典序，结果确定。

use super::metrics::ResolutionMethod;
use crate::datastore::ModelPair;
use crate::models::GlobalModel;
use indexmap::map::Entry;
use indexmap::IndexMap;

/// 一个匹配候选
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub model_id: String,
    pub global_model: GlobalModel,
    /// `Alias` 或 `ProviderModelName`
    pub method: ResolutionMethod,
}

impl Candidate {
    fn rank(&self) -> u8 {
        match self.method {
            ResolutionMethod::Alias => 0,
            _ => 1,
        }
    }
}

/// 裁决结果
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub selected: Candidate,
    /// 匹配到多个不同 GlobalModel 时，按排序后的顺序列出各自名称
    pub conflicting: Option<Vec<String>>,
}

/// 对连接结果分类、去重、排序并选出第一个
///
/// `name` 需已去除首尾空白。
pub fn rank_candidates(name: &str, pairs: Vec<ModelPair>) -> Option<Selection> {
    let mut matched: IndexMap<(String, String), Candidate> = IndexMap::new();

    for pair in pairs {
        let method = if pair.model.has_alias(name) {
            ResolutionMethod::Alias
        } else if pair.model.provider_model_name == name {
            ResolutionMethod::ProviderModelName
        } else {
            continue;
        };

        let candidate = Candidate {
            model_id: pair.model.id.clone(),
            global_model: pair.global_model,
            method,
        };
        let key = (pair.model.id, candidate.global_model.id.clone());

        match matched.entry(key) {
            // 同一 (Model, GlobalModel) 只保留更优的匹配，映射名称匹配不会被降级
            Entry::Occupied(mut existing) => {
                if candidate.rank() < existing.get().rank() {
                    existing.insert(candidate);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
        }
    }

    let mut candidates: Vec<Candidate> = matched.into_values().collect();
    candidates.sort_by(|a, b| {
        a.rank()
            .cmp(&b.rank())
            .then_with(|| a.global_model.name.cmp(&b.global_model.name))
    });

    let mut distinct: IndexMap<&str, &str> = IndexMap::new();
    for candidate in &candidates {
        distinct
            .entry(candidate.global_model.id.as_str())
            .or_insert(candidate.global_model.name.as_str());
    }
    let conflicting = (distinct.len() > 1)
        .then(|| distinct.values().map(|name| name.to_string()).collect());

    candidates.into_iter().next().map(|selected| Selection {
        selected,
        conflicting,
    })
}
