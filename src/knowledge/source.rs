//! 지식 목록 소스
//!
//! 검색 코어에 지식 항목 목록을 공급하는 인터페이스입니다.
//! 원격 API 구현은 `client` 모듈에 있습니다.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::item::KnowledgeItem;

// ============================================================================
// KnowledgeListSource Trait
// ============================================================================

/// 지식 목록 소스 트레이트
#[async_trait]
pub trait KnowledgeListSource: Send + Sync {
    /// 현재 지식 항목 전체 로드
    async fn load_items(&self) -> Result<Vec<KnowledgeItem>>;

    /// 소스 이름 (로그용)
    fn name(&self) -> &str;
}

// ============================================================================
// JsonFileSource
// ============================================================================

/// JSON 파일 소스
///
/// `KnowledgeItem` 배열을 담은 JSON 파일을 읽습니다.
/// API 응답을 덤프한 파일을 오프라인으로 탐색할 때 사용합니다.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KnowledgeListSource for JsonFileSource {
    async fn load_items(&self) -> Result<Vec<KnowledgeItem>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        let items: Vec<KnowledgeItem> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid knowledge list in {}", self.path.display()))?;

        tracing::debug!("Loaded {} items from {}", items.len(), self.path.display());
        Ok(items)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

// ============================================================================
// Tests
// ============================================================================
