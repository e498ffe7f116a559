//! 세션 상태 저장 모듈
//!
//! 검색 화면 상태를 고정 키 아래 JSON으로 저장하고, 다음 실행 때 복원합니다.
//! 저장 실패는 로그만 남기고 무시합니다. 읽기 실패는 "저장된 상태 없음"으로 취급합니다.

mod store;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::knowledge::KnowledgeItem;
use crate::search::{SelectedFields, TopicKey};

pub use store::{DurableKeyValueStore, MemoryStore, SqliteStore, SESSION_DB_FILE};

/// 세션 저장 키
pub const SESSION_STORAGE_KEY: &str = "hippobox_knowledge_search_state";

// ============================================================================
// Types
// ============================================================================

/// 저장되는 세션 스냅샷 (camelCase JSON)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSearchSession {
    pub query: String,
    pub hyper_query: String,
    pub hyper_submitted_query: String,
    pub hyper_results: Vec<KnowledgeItem>,
    pub active_topic: Option<String>,
    pub selected_filters: Vec<String>,
}

impl PersistedSearchSession {
    /// JSON 객체에서 필드 단위로 관대하게 읽기
    ///
    /// 타입이 맞지 않는 필드는 없는 것으로 취급합니다.
    fn from_object(object: &Map<String, Value>) -> Self {
        let string = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };

        let hyper_results = match object.get("hyperResults") {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| serde_json::from_value::<KnowledgeItem>(v.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };

        let selected_filters = match object.get("selectedFilters") {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Self {
            query: string("query"),
            hyper_query: string("hyperQuery"),
            hyper_submitted_query: string("hyperSubmittedQuery"),
            hyper_results,
            active_topic: object
                .get("activeTopic")
                .and_then(Value::as_str)
                .map(str::to_string),
            selected_filters,
        }
    }
}

/// 정리된 복원 상태
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoredSession {
    pub query: String,
    pub hyper_query: String,
    pub hyper_submitted_query: String,
    pub hyper_results: Vec<KnowledgeItem>,
    pub active_topic: Option<TopicKey>,
    pub selected_fields: SelectedFields,
}

impl From<PersistedSearchSession> for RestoredSession {
    fn from(session: PersistedSearchSession) -> Self {
        Self {
            query: session.query,
            hyper_query: session.hyper_query,
            hyper_submitted_query: session.hyper_submitted_query,
            hyper_results: session.hyper_results,
            active_topic: session.active_topic.as_deref().and_then(TopicKey::parse),
            selected_fields: SelectedFields::sanitize(&session.selected_filters),
        }
    }
}

// ============================================================================
// SessionPersister
// ============================================================================

/// 세션 저장/복원기
#[derive(Clone)]
pub struct SessionPersister {
    store: Arc<dyn DurableKeyValueStore>,
    key: String,
}

impl SessionPersister {
    pub fn new(store: Arc<dyn DurableKeyValueStore>) -> Self {
        Self::with_key(store, SESSION_STORAGE_KEY)
    }

    pub fn with_key(store: Arc<dyn DurableKeyValueStore>, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    /// 스냅샷 저장 (실패는 무시)
    pub fn save(&self, session: &PersistedSearchSession) {
        let payload = match serde_json::to_string(session) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize search session: {}", e);
                return;
            }
        };

        match self.store.set(&self.key, &payload) {
            Ok(()) => tracing::debug!("Saved search session ({} bytes)", payload.len()),
            Err(e) => tracing::warn!("Failed to save search session: {}", e),
        }
    }

    /// 저장된 스냅샷 읽기
    ///
    /// 없거나, 읽을 수 없거나, JSON 객체가 아니면 `None`.
    pub fn load(&self) -> Option<PersistedSearchSession> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!("Failed to read search session: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(object)) => Some(PersistedSearchSession::from_object(&object)),
            Ok(_) => {
                tracing::debug!("Stored search session is not an object, ignoring");
                None
            }
            Err(e) => {
                tracing::debug!("Stored search session is not valid JSON: {}", e);
                None
            }
        }
    }

    /// 복원 (정리된 상태, 저장된 것이 없으면 기본값)
    pub fn restore(&self) -> RestoredSession {
        self.load().map(RestoredSession::from).unwrap_or_default()
    }

    /// 저장된 스냅샷 삭제
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            tracing::warn!("Failed to clear search session: {}", e);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
