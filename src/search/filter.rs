//! 로컬 필터 엔진
//!
//! 이미 로드된 지식 목록에 대해 동기적으로 동작하는 다중 필드 부분 문자열/태그 매처입니다.
//! 순수 함수이며 입력 순서를 절대 바꾸지 않습니다.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::knowledge::{parse_timestamp, KnowledgeItem};

// ============================================================================
// Search Filter Fields
// ============================================================================

/// 검색어 매칭에 사용할 수 있는 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchFilterField {
    Title,
    Topic,
    Tags,
    Content,
    CreatedAt,
    UpdatedAt,
}

impl SearchFilterField {
    /// 토글 표시 순서
    pub const ALL: [SearchFilterField; 6] = [
        SearchFilterField::Title,
        SearchFilterField::Topic,
        SearchFilterField::Tags,
        SearchFilterField::Content,
        SearchFilterField::CreatedAt,
        SearchFilterField::UpdatedAt,
    ];

    /// 직렬화 이름 (snake_case)
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchFilterField::Title => "title",
            SearchFilterField::Topic => "topic",
            SearchFilterField::Tags => "tags",
            SearchFilterField::Content => "content",
            SearchFilterField::CreatedAt => "created_at",
            SearchFilterField::UpdatedAt => "updated_at",
        }
    }
}

impl fmt::Display for SearchFilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchFilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchFilterField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown search field: {}", s))
    }
}

// ============================================================================
// Selected Fields
// ============================================================================

/// 선택된 필드 집합
///
/// 빈 집합은 "모든 필드 선택"과 같은 의미입니다. 아무것도 매칭하지 않는 상태는 없습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFields(BTreeSet<SearchFilterField>);

impl SelectedFields {
    /// 모든 필드 선택 (기본값)
    pub fn all() -> Self {
        Self(SearchFilterField::ALL.into_iter().collect())
    }

    /// 빈 선택 (사용자가 모든 토글을 끈 상태)
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// 저장된 필드 이름 정리
    ///
    /// 알 수 없는 이름은 버리고, 남는 것이 없으면 전체 선택으로 돌아갑니다.
    pub fn sanitize<S: AsRef<str>>(names: &[S]) -> Self {
        let fields: BTreeSet<SearchFilterField> = names
            .iter()
            .filter_map(|name| name.as_ref().parse().ok())
            .collect();

        if fields.is_empty() {
            Self::all()
        } else {
            Self(fields)
        }
    }

    pub fn contains(&self, field: SearchFilterField) -> bool {
        self.0.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 필드 토글 (있으면 제거, 없으면 추가)
    pub fn toggle(&mut self, field: SearchFilterField) {
        if !self.0.remove(&field) {
            self.0.insert(field);
        }
    }

    /// 실제 매칭에 쓰이는 집합 (빈 집합 -> 전체)
    pub fn effective(&self) -> SelectedFields {
        if self.0.is_empty() {
            Self::all()
        } else {
            self.clone()
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SearchFilterField> + '_ {
        self.0.iter().copied()
    }

    /// 저장용 이름 목록
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|f| f.as_str().to_string()).collect()
    }
}

impl Default for SelectedFields {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<SearchFilterField> for SelectedFields {
    fn from_iter<I: IntoIterator<Item = SearchFilterField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Topic Keys
// ============================================================================

/// 토픽이 없는 항목의 저장용 키
pub const NO_TOPIC_KEY: &str = "__no_topic__";

/// 정규화된 토픽 키
///
/// 토픽이 없거나 "uncategorized"인 항목은 `NoTopic` 센티널로 묶입니다.
/// 별도 변형이므로 실제 토픽 이름과 충돌하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicKey {
    NoTopic,
    Topic(String),
}

impl TopicKey {
    /// 저장/표시용 문자열
    pub fn as_str(&self) -> &str {
        match self {
            TopicKey::NoTopic => NO_TOPIC_KEY,
            TopicKey::Topic(key) => key,
        }
    }

    /// 저장된 문자열에서 복원
    ///
    /// 빈 값은 `None`, 나머지는 `normalize_topic`과 같은 키로 접습니다.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed == NO_TOPIC_KEY {
            Some(TopicKey::NoTopic)
        } else if trimmed.is_empty() {
            None
        } else {
            Some(normalize_topic(trimmed))
        }
    }

    pub fn is_no_topic(&self) -> bool {
        matches!(self, TopicKey::NoTopic)
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 토픽 정규화 (trim + lowercase, 빈 값/"uncategorized" -> 센티널)
pub fn normalize_topic(raw: &str) -> TopicKey {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() || normalized == "uncategorized" {
        TopicKey::NoTopic
    } else {
        TopicKey::Topic(normalized)
    }
}

// ============================================================================
// Query Parsing
// ============================================================================

/// 파싱된 검색어
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMatcher {
    /// 텍스트 필터 없음
    Any,
    /// `#`로 시작하는 태그 전용 검색 (모든 토큰이 어떤 태그의 부분 문자열)
    Tags(Vec<String>),
    /// 선택된 필드 전체에서 모든 단어가 부분 문자열
    Fields {
        terms: Vec<String>,
        fields: SelectedFields,
    },
}

impl QueryMatcher {
    pub fn parse(query: &str, fields: &SelectedFields) -> Self {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return QueryMatcher::Any;
        }

        if trimmed.starts_with('#') {
            let terms: Vec<String> = trimmed
                .split_whitespace()
                .map(|token| token.trim_start_matches('#').to_lowercase())
                .filter(|token| !token.is_empty())
                .collect();
            return QueryMatcher::Tags(terms);
        }

        let terms: Vec<String> = trimmed
            .split_whitespace()
            .map(|term| term.to_lowercase())
            .collect();

        QueryMatcher::Fields {
            terms,
            fields: fields.effective(),
        }
    }

    pub fn matches(&self, item: &KnowledgeItem) -> bool {
        match self {
            QueryMatcher::Any => true,
            QueryMatcher::Tags(terms) => {
                let tags: Vec<String> = item.tags.iter().map(|t| t.to_lowercase()).collect();
                terms
                    .iter()
                    .all(|term| tags.iter().any(|tag| tag.contains(term.as_str())))
            }
            QueryMatcher::Fields { terms, fields } => {
                let haystack = build_haystack(item, fields);
                terms.iter().all(|term| haystack.contains(term.as_str()))
            }
        }
    }
}

/// 필드 고정 순서: title, topic, content, tags, created_at, updated_at
fn build_haystack(item: &KnowledgeItem, fields: &SelectedFields) -> String {
    let mut parts: Vec<&str> = Vec::new();

    if fields.contains(SearchFilterField::Title) {
        parts.push(&item.title);
    }
    if fields.contains(SearchFilterField::Topic) {
        parts.push(&item.topic);
    }
    if fields.contains(SearchFilterField::Content) {
        parts.push(&item.content);
    }
    if fields.contains(SearchFilterField::Tags) {
        parts.extend(item.tags.iter().map(String::as_str));
    }
    if fields.contains(SearchFilterField::CreatedAt) {
        parts.extend(parseable_timestamp(item.created_at.as_deref()));
    }
    if fields.contains(SearchFilterField::UpdatedAt) {
        parts.extend(parseable_timestamp(item.updated_at.as_deref()));
    }

    parts.join(" ").to_lowercase()
}

/// 파싱 불가능한 타임스탬프는 날짜 매칭에서 제외
fn parseable_timestamp(value: Option<&str>) -> Option<&str> {
    value.filter(|v| parse_timestamp(v).is_some())
}

// ============================================================================
// Filter
// ============================================================================

/// 로컬 필터
///
/// 1. 검색어 매칭 (태그 전용 또는 필드 모드)
/// 2. 활성 토픽 필터
///
/// 입력 순서를 유지합니다.
pub fn filter(
    items: &[KnowledgeItem],
    query: &str,
    selected_fields: &SelectedFields,
    active_topic: Option<&TopicKey>,
) -> Vec<KnowledgeItem> {
    let matcher = QueryMatcher::parse(query, selected_fields);

    items
        .iter()
        .filter(|item| matcher.matches(item))
        .filter(|item| match active_topic {
            Some(topic) => normalize_topic(&item.topic) == *topic,
            None => true,
        })
        .cloned()
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
