//! hippo-search - 하이브리드 지식 검색 엔진
//!
//! 로드된 지식 목록에 대한 로컬 다중 필드 필터링, 토픽 패싯,
//! 디바운스된 원격 시맨틱 검색, 세션 상태 저장을 제공합니다.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod search;
pub mod session;
pub mod text;
pub mod view;

// Re-exports
pub use client::{HttpKnowledgeClient, OfflineClient, RemoteSearchClient};
pub use config::{FeatureFlags, SearchConfig};
pub use error::{SearchError, StoreError};
pub use knowledge::{JsonFileSource, KnowledgeItem, KnowledgeListSource};
pub use search::{
    aggregate, filter, HybridPhase, HybridSearch, HybridSettings, HybridState, SearchFilterField,
    SelectedFields, TopicFacet, TopicKey,
};
pub use session::{
    DurableKeyValueStore, MemoryStore, PersistedSearchSession, RestoredSession, SessionPersister,
    SqliteStore,
};
pub use view::{KnowledgeSearch, Messages, SearchOptions, SearchView};
