//! 검색 모듈 - 로컬 필터, 토픽 패싯, 하이브리드(원격) 검색
//!
//! 로컬 필터와 패싯은 순수 함수이고, 하이브리드 검색은
//! 상태 머신(`hybrid`)과 이를 구동하는 오케스트레이터로 나뉩니다.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod facet;
mod filter;
mod hybrid;
mod orchestrator;

pub use facet::{aggregate, aggregate_with_label, compare_labels, TopicFacet, DEFAULT_NO_TOPIC_LABEL};
pub use filter::{
    filter, normalize_topic, QueryMatcher, SearchFilterField, SelectedFields, TopicKey,
    NO_TOPIC_KEY,
};
pub use hybrid::{HybridPhase, HybridState, SearchOutcome, Submission, DEFAULT_FAILURE_MESSAGE};
pub use orchestrator::{
    ChangeHook, HybridSearch, HybridSettings, DEFAULT_DEBOUNCE, DEFAULT_REMOTE_LIMIT,
};

/// 락 획득 (poison 상태여도 내부 값 사용)
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
