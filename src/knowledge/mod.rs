//! Knowledge 모듈 - 지식 항목 모델과 목록 소스
//!
//! - Item: 원격 API와 같은 형태의 읽기 전용 지식 항목
//! - Source: 지식 목록 공급 인터페이스 (JSON 파일 구현 포함)

mod item;
mod source;

// Re-exports
pub use item::{parse_timestamp, sort_by_recency, KnowledgeItem};
pub use source::{JsonFileSource, KnowledgeListSource};
