//! 토픽 패싯 집계
//!
//! 결과 목록에서 토픽별 버킷과 개수를 만들고 결정적인 순서로 정렬합니다.

use std::cmp::Ordering;
use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::knowledge::KnowledgeItem;

use super::filter::{normalize_topic, TopicKey};

/// 토픽 없음 버킷의 기본 표시 이름
pub const DEFAULT_NO_TOPIC_LABEL: &str = "No topic";

/// 토픽 패싯
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFacet {
    /// 정규화된 토픽 키 (또는 센티널)
    pub key: TopicKey,
    /// 표시 이름 (처음 본 원래 표기)
    pub label: String,
    /// 항목 수 (>= 1)
    pub count: usize,
}

/// 기본 라벨로 패싯 집계
pub fn aggregate(items: &[KnowledgeItem]) -> Vec<TopicFacet> {
    aggregate_with_label(items, DEFAULT_NO_TOPIC_LABEL)
}

/// 패싯 집계
///
/// 정렬 순서:
/// 1. 토픽 없음 버킷은 항상 마지막
/// 2. 개수 내림차순
/// 3. 라벨 오름차순 (악센트/대소문자 무시 비교 후 원문 비교)
pub fn aggregate_with_label(items: &[KnowledgeItem], no_topic_label: &str) -> Vec<TopicFacet> {
    let mut buckets: HashMap<TopicKey, TopicFacet> = HashMap::new();

    for item in items {
        let key = normalize_topic(&item.topic);
        buckets
            .entry(key.clone())
            .and_modify(|facet| facet.count += 1)
            .or_insert_with(|| {
                let label = match key {
                    TopicKey::NoTopic => no_topic_label.to_string(),
                    TopicKey::Topic(_) => item.topic.trim().to_string(),
                };
                TopicFacet {
                    key,
                    label,
                    count: 1,
                }
            });
    }

    let mut facets: Vec<TopicFacet> = buckets.into_values().collect();
    facets.sort_by(compare_facets);
    facets
}

fn compare_facets(a: &TopicFacet, b: &TopicFacet) -> Ordering {
    match (a.key.is_no_topic(), b.key.is_no_topic()) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }

    b.count
        .cmp(&a.count)
        .then_with(|| compare_labels(&a.label, &b.label))
        .then_with(|| a.key.cmp(&b.key))
}

/// 라벨 비교 (로케일 비슷한 순서)
///
/// 1차: 분해(NFD) 후 결합 문자를 버리고 소문자로 접은 기본 문자
/// 2차: 악센트는 살리고 소문자로 접은 문자
/// 3차: 원문 (전순서 보장)
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(primary_key(b))
        .then_with(|| {
            let folded_a = a.nfd().flat_map(char::to_lowercase);
            let folded_b = b.nfd().flat_map(char::to_lowercase);
            folded_a.cmp(folded_b)
        })
        .then_with(|| a.cmp(b))
}

fn primary_key(label: &str) -> impl Iterator<Item = char> + '_ {
    label
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

// ============================================================================
// Tests
// ============================================================================
