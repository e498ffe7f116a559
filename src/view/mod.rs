//! 검색 화면 어댑터
//!
//! 로컬 필터, 토픽 패싯, 하이브리드 검색, 세션 저장을 하나의 세션으로 묶고
//! 화면에 그릴 행(row) 데이터를 만들어 줍니다.
//!
//! 모든 변경 함수는 호출 후 전체 스냅샷을 저장합니다. 비동기로 도착하는
//! 하이브리드 결과도 변경 콜백을 통해 저장됩니다.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::RemoteSearchClient;
use crate::knowledge::{sort_by_recency, KnowledgeItem};
use crate::search::{
    aggregate_with_label, filter, HybridSearch, HybridSettings, HybridState, SearchFilterField,
    SelectedFields, TopicFacet, TopicKey, DEFAULT_DEBOUNCE, DEFAULT_FAILURE_MESSAGE,
    DEFAULT_NO_TOPIC_LABEL, DEFAULT_REMOTE_LIMIT,
};
use crate::search::lock;
use crate::session::{PersistedSearchSession, SessionPersister};
use crate::text::{format_date, preview};

// ============================================================================
// Messages
// ============================================================================

/// 화면에 필요한 (로컬라이즈된) 문자열
#[derive(Debug, Clone)]
pub struct Messages {
    pub no_topic: String,
    pub search_failed: String,
    pub empty: String,
    pub no_tags: String,
    pub field_labels: BTreeMap<SearchFilterField, String>,
}

impl Messages {
    /// 한국어 문자열
    pub fn korean() -> Self {
        let field_labels = [
            (SearchFilterField::Title, "제목"),
            (SearchFilterField::Topic, "토픽"),
            (SearchFilterField::Tags, "태그"),
            (SearchFilterField::Content, "내용"),
            (SearchFilterField::CreatedAt, "생성일"),
            (SearchFilterField::UpdatedAt, "수정일"),
        ]
        .into_iter()
        .map(|(field, label)| (field, label.to_string()))
        .collect();

        Self {
            no_topic: "토픽 없음".to_string(),
            search_failed: "검색에 실패했습니다".to_string(),
            empty: "검색 결과가 없습니다.".to_string(),
            no_tags: "태그 없음".to_string(),
            field_labels,
        }
    }

    /// 언어 코드로 선택 (`ko*`면 한국어, 나머지는 영어)
    pub fn for_lang(lang: &str) -> Self {
        if lang.trim().to_lowercase().starts_with("ko") {
            Self::korean()
        } else {
            Self::default()
        }
    }

    /// 필드 토글 라벨 (없으면 직렬화 이름)
    pub fn field_label(&self, field: SearchFilterField) -> &str {
        self.field_labels
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.as_str())
    }
}

impl Default for Messages {
    fn default() -> Self {
        let field_labels = [
            (SearchFilterField::Title, "Title"),
            (SearchFilterField::Topic, "Topic"),
            (SearchFilterField::Tags, "Tags"),
            (SearchFilterField::Content, "Content"),
            (SearchFilterField::CreatedAt, "Created"),
            (SearchFilterField::UpdatedAt, "Updated"),
        ]
        .into_iter()
        .map(|(field, label)| (field, label.to_string()))
        .collect();

        Self {
            no_topic: DEFAULT_NO_TOPIC_LABEL.to_string(),
            search_failed: DEFAULT_FAILURE_MESSAGE.to_string(),
            empty: "No results found.".to_string(),
            no_tags: "No tags".to_string(),
            field_labels,
        }
    }
}

// ============================================================================
// View Types
// ============================================================================

/// 결과 카드 한 줄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: i64,
    pub title: String,
    pub topic: String,
    pub tags: Vec<String>,
    /// 평문 미리보기 (최대 200자 + `...`)
    pub preview: String,
    /// `YYYY-MM-DD` 또는 `-`
    pub created: String,
    pub updated: String,
}

/// 필드 토글
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterToggle {
    pub field: SearchFilterField,
    pub label: String,
    pub active: bool,
}

/// 토픽 사이드바 한 줄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRow {
    pub key: TopicKey,
    pub label: String,
    pub count: usize,
    pub active: bool,
}

/// 하이브리드 검색 영역
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridView {
    /// 기능이 꺼져 있으면 영역 자체를 숨김
    pub available: bool,
    pub draft: String,
    pub submitted_query: String,
    /// 원격 결과가 기본 목록을 대체하는 중
    pub active: bool,
    /// 로딩 표시 여부 (활성 + 진행 중)
    pub loading: bool,
    pub error: Option<String>,
    pub can_submit: bool,
    pub can_reset: bool,
}

/// 화면 전체
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchView {
    pub query: String,
    pub filters: Vec<FilterToggle>,
    pub hybrid: HybridView,
    pub rows: Vec<ResultRow>,
    pub topics: Vec<TopicRow>,
    /// 빈 결과 메시지를 보여야 하는지 (로딩 중이면 false)
    pub empty: bool,
}

// ============================================================================
// Options
// ============================================================================

/// 세션 생성 옵션
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub hybrid_available: bool,
    pub debounce: Duration,
    pub remote_limit: usize,
    pub messages: Messages,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            hybrid_available: true,
            debounce: DEFAULT_DEBOUNCE,
            remote_limit: DEFAULT_REMOTE_LIMIT,
            messages: Messages::default(),
        }
    }
}

// ============================================================================
// KnowledgeSearch
// ============================================================================

/// 로컬 화면 상태
#[derive(Debug, Clone, Default)]
struct LocalState {
    query: String,
    active_topic: Option<TopicKey>,
    selected_fields: SelectedFields,
}

impl LocalState {
    fn snapshot(&self, hybrid: &HybridState) -> PersistedSearchSession {
        PersistedSearchSession {
            query: self.query.clone(),
            hyper_query: hybrid.query_draft().to_string(),
            hyper_submitted_query: hybrid.submitted_query().to_string(),
            hyper_results: hybrid.results().to_vec(),
            active_topic: self.active_topic.as_ref().map(|key| key.as_str().to_string()),
            selected_filters: self.selected_fields.names(),
        }
    }
}

/// 지식 검색 세션
pub struct KnowledgeSearch {
    local: Arc<Mutex<LocalState>>,
    items: Vec<KnowledgeItem>,
    hybrid: HybridSearch,
    persister: SessionPersister,
    messages: Messages,
}

impl KnowledgeSearch {
    /// 세션 마운트
    ///
    /// 저장된 상태를 복원합니다. 네트워크 호출은 하지 않으며, 복원된 하이브리드
    /// 결과는 사용자가 다시 제출하기 전까지 정적 데이터로 남습니다.
    pub fn mount(
        items: &[KnowledgeItem],
        client: Arc<dyn RemoteSearchClient>,
        persister: SessionPersister,
        options: SearchOptions,
    ) -> Self {
        let restored = persister.restore();

        let local = Arc::new(Mutex::new(LocalState {
            query: restored.query,
            active_topic: restored.active_topic,
            selected_fields: restored.selected_fields,
        }));

        let settings = HybridSettings {
            debounce: options.debounce,
            limit: options.remote_limit,
            failure_message: options.messages.search_failed.clone(),
        };
        let hybrid = HybridSearch::with_state(
            client,
            settings,
            options.hybrid_available,
            HybridState::restored(
                restored.hyper_query,
                restored.hyper_submitted_query,
                restored.hyper_results,
            ),
        );

        let hook_local = Arc::clone(&local);
        let hook_persister = persister.clone();
        hybrid.set_change_hook(Arc::new(move |state: &HybridState| {
            let session = lock(&hook_local).snapshot(state);
            hook_persister.save(&session);
        }));

        let search = Self {
            local,
            items: sort_by_recency(items),
            hybrid,
            persister,
            messages: options.messages,
        };

        tracing::debug!(
            "Mounted knowledge search ({} items, hybrid available: {})",
            search.items.len(),
            search.hybrid.is_available()
        );
        search.persist();
        search
    }

    // ------------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------------

    /// 지식 목록 교체 (최신순으로 한 번 정렬)
    pub fn set_items(&mut self, items: &[KnowledgeItem]) {
        self.items = sort_by_recency(items);
    }

    pub fn set_query(&self, query: &str) {
        lock(&self.local).query = query.to_string();
        self.persist();
    }

    pub fn toggle_field(&self, field: SearchFilterField) {
        lock(&self.local).selected_fields.toggle(field);
        self.persist();
    }

    /// 토픽 선택 (이미 선택된 토픽이면 해제)
    pub fn select_topic(&self, key: TopicKey) {
        {
            let mut local = lock(&self.local);
            if local.active_topic.as_ref() == Some(&key) {
                local.active_topic = None;
            } else {
                local.active_topic = Some(key);
            }
        }
        self.persist();
    }

    /// 태그 클릭 -> 태그 전용 검색어
    pub fn click_tag(&self, tag: &str) {
        self.set_query(&format!("#{}", tag));
    }

    pub fn set_hyper_draft(&self, draft: &str) {
        self.hybrid.set_draft(draft);
    }

    pub fn submit_hyper(&self, draft: &str) {
        self.hybrid.submit(draft);
    }

    /// 전체 보기: 하이브리드 초기화 + 검색어/토픽 해제
    pub fn show_all(&self) {
        {
            let mut local = lock(&self.local);
            local.query.clear();
            local.active_topic = None;
        }
        self.hybrid.reset();
    }

    pub fn set_hybrid_available(&self, available: bool) {
        self.hybrid.set_available(available);
        self.persist();
    }

    /// 대기 중인 하이브리드 작업 완료까지 대기
    pub async fn settle(&self) {
        self.hybrid.settle().await;
    }

    /// 저장된 세션 삭제
    pub fn forget(&self) {
        self.persister.clear();
    }

    // ------------------------------------------------------------------------
    // Read Side
    // ------------------------------------------------------------------------

    pub fn query(&self) -> String {
        lock(&self.local).query.clone()
    }

    pub fn active_topic(&self) -> Option<TopicKey> {
        lock(&self.local).active_topic.clone()
    }

    pub fn selected_fields(&self) -> SelectedFields {
        lock(&self.local).selected_fields.clone()
    }

    pub fn hybrid(&self) -> HybridState {
        self.hybrid.snapshot()
    }

    pub fn is_hybrid_active(&self) -> bool {
        self.hybrid.is_active()
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// 필터 전 기본 목록 (하이브리드 활성 시 원격 결과)
    pub fn base_results(&self) -> Vec<KnowledgeItem> {
        if self.hybrid.is_active() {
            self.hybrid.snapshot().results().to_vec()
        } else {
            self.items.clone()
        }
    }

    /// 현재 보이는 결과
    pub fn results(&self) -> Vec<KnowledgeItem> {
        let base = self.base_results();
        let local = lock(&self.local).clone();
        filter(
            &base,
            &local.query,
            &local.selected_fields,
            local.active_topic.as_ref(),
        )
    }

    /// 토픽 패싯 (검색어 적용 전 기본 목록 기준)
    pub fn facets(&self) -> Vec<TopicFacet> {
        aggregate_with_label(&self.base_results(), &self.messages.no_topic)
    }

    /// 화면 모델 생성
    pub fn view(&self) -> SearchView {
        let local = lock(&self.local).clone();
        let state = self.hybrid.snapshot();
        let available = self.hybrid.is_available();
        let active = available && state.has_submission();

        let base = if active {
            state.results().to_vec()
        } else {
            self.items.clone()
        };

        let rows: Vec<ResultRow> = filter(
            &base,
            &local.query,
            &local.selected_fields,
            local.active_topic.as_ref(),
        )
        .iter()
        .map(result_row)
        .collect();

        let filters = SearchFilterField::ALL
            .into_iter()
            .map(|field| FilterToggle {
                field,
                label: self.messages.field_label(field).to_string(),
                active: local.selected_fields.contains(field),
            })
            .collect();

        let topics = aggregate_with_label(&base, &self.messages.no_topic)
            .into_iter()
            .map(|facet| TopicRow {
                active: local.active_topic.as_ref() == Some(&facet.key),
                key: facet.key,
                label: facet.label,
                count: facet.count,
            })
            .collect();

        let loading = active && state.is_pending();
        let hybrid = HybridView {
            available,
            draft: state.query_draft().to_string(),
            submitted_query: state.submitted_query().to_string(),
            active,
            loading,
            error: state.error().map(str::to_string),
            can_submit: available && !state.is_pending() && !state.query_draft().trim().is_empty(),
            can_reset: !loading,
        };

        SearchView {
            empty: rows.is_empty() && !loading,
            query: local.query,
            filters,
            hybrid,
            rows,
            topics,
        }
    }

    /// 변경 콜백과 같은 락 아래에서 저장 (나중 저장이 항상 더 최신 상태)
    fn persist(&self) {
        self.hybrid.with_snapshot(|state| {
            let session = lock(&self.local).snapshot(state);
            self.persister.save(&session);
        });
    }
}

fn result_row(item: &KnowledgeItem) -> ResultRow {
    ResultRow {
        id: item.id,
        title: item.title.clone(),
        topic: item.topic.clone(),
        tags: item.tags.clone(),
        preview: preview(&item.content),
        created: format_date(item.created_at.as_deref()),
        updated: format_date(item.updated_at.as_deref()),
    }
}

// ============================================================================
// Tests
// ============================================================================
