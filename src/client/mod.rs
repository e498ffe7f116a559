//! 원격 API 클라이언트 - 지식 목록, 시맨틱 검색, 기능 플래그
//!
//! ## 사용법
//! ```rust,ignore
//! let client = HttpKnowledgeClient::from_config(&SearchConfig::from_env())?;
//! let results = client.search("cats", 5).await?;
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{FeatureFlags, SearchConfig};
use crate::error::SearchError;
use crate::knowledge::{KnowledgeItem, KnowledgeListSource};
use crate::search::SearchOutcome;

/// HTTP 요청 타임아웃
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// RemoteSearchClient Trait
// ============================================================================

/// 원격 시맨틱 검색 트레이트
///
/// 본문이 없는 성공 응답은 `Ok(None)`으로 돌려줍니다.
#[async_trait]
pub trait RemoteSearchClient: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> SearchOutcome;
}

// ============================================================================
// HttpKnowledgeClient
// ============================================================================

/// API 에러 응답 (`{"detail": "..."}`)
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: String,
}

/// 서버 설정 응답
#[derive(Debug, Deserialize)]
struct ServerConfig {
    #[serde(default)]
    vdb_enabled: Option<bool>,
}

/// HTTP 지식 API 클라이언트
#[derive(Debug, Clone)]
pub struct HttpKnowledgeClient {
    client: reqwest::Client,
    config: SearchConfig,
}

impl HttpKnowledgeClient {
    /// 설정으로 생성
    ///
    /// HTTP 클라이언트는 절대 URL만 다루므로 오리진이 필요합니다.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        if config.api_origin.is_empty() {
            anyhow::bail!(
                "API origin not set. Set HIPPOBOX_API_URL or pass --api-url, \
                 or use --items <file> to search a local dump."
            );
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 에러 응답 메시지 추출 (detail 필드 > 본문 > 상태 텍스트)
    fn error_message(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(error) = serde_json::from_str::<ApiErrorBody>(body) {
            return error.detail;
        }
        if !body.trim().is_empty() {
            return body.trim().to_string();
        }
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    }

    /// 전체 지식 목록 조회 (`GET {api}/knowledge`)
    pub async fn list_knowledge(&self) -> Result<Vec<KnowledgeItem>, SearchError> {
        let url = self.config.api_url("/knowledge", &[]);
        tracing::debug!("Fetching knowledge list: {}", url);

        let response = self.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SearchError::Server {
                status: status.as_u16(),
                message: Self::error_message(status, &body),
            });
        }

        decode_items(&body).map(Option::unwrap_or_default)
    }

    /// 서버 기능 플래그 조회 (`GET {origin}/config`)
    ///
    /// 서버가 값을 주지 않으면 로컬 설정을 그대로 사용합니다.
    pub async fn fetch_features(&self) -> Result<FeatureFlags> {
        let url = self.config.origin_url("/config");
        let response = self
            .get(&url)
            .send()
            .await
            .context("Failed to fetch server config")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Server config request failed ({})", status);
        }

        let server: ServerConfig = response
            .json()
            .await
            .context("Failed to parse server config")?;

        let mut features = self.config.features;
        if let Some(enabled) = server.vdb_enabled {
            features.hybrid_search_enabled = features.hybrid_search_enabled && enabled;
        }
        Ok(features)
    }
}

#[async_trait]
impl RemoteSearchClient for HttpKnowledgeClient {
    async fn search(&self, query: &str, limit: usize) -> SearchOutcome {
        let url = self.config.api_url(
            "/knowledge/search",
            &[
                ("query", Some(query.to_string())),
                ("limit", Some(limit.to_string())),
            ],
        );

        let response = self.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SearchError::Server {
                status: status.as_u16(),
                message: Self::error_message(status, &body),
            });
        }

        decode_items(&body)
    }
}

#[async_trait]
impl KnowledgeListSource for HttpKnowledgeClient {
    async fn load_items(&self) -> Result<Vec<KnowledgeItem>> {
        self.list_knowledge()
            .await
            .context("Failed to load knowledge list")
    }

    fn name(&self) -> &str {
        "hippobox-api"
    }
}

// ============================================================================
// OfflineClient
// ============================================================================

/// API 오리진이 없을 때 쓰는 클라이언트 (항상 실패)
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineClient;

#[async_trait]
impl RemoteSearchClient for OfflineClient {
    async fn search(&self, _query: &str, _limit: usize) -> SearchOutcome {
        Err(SearchError::Transport("API origin not configured".to_string()))
    }
}

/// 항목 배열 디코딩 (빈 본문 / `null` -> `None`)
fn decode_items(body: &str) -> Result<Option<Vec<KnowledgeItem>>, SearchError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<Vec<KnowledgeItem>>>(body)
        .map_err(|e| SearchError::Decode(e.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
