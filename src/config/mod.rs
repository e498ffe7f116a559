//! 설정 모듈 - 환경변수 기반 설정과 API URL 조립
//!
//! 환경변수:
//! - `HIPPOBOX_API_URL`: API 오리진 (비어 있으면 상대 경로)
//! - `HIPPOBOX_API_BASE`: API 기본 경로 (기본값 `/api/v1`)
//! - `HIPPOBOX_ACCESS_TOKEN`: Bearer 토큰 (선택)
//! - `HIPPOBOX_HYBRID_SEARCH`: 하이브리드 검색 기능 플래그 (기본값 true)
//! - `HIPPOBOX_DATA_DIR`: 세션 DB 위치 (기본값 ~/.hippo-search)

use std::path::PathBuf;
use std::time::Duration;

use url::form_urlencoded;

use crate::search::{DEFAULT_DEBOUNCE, DEFAULT_REMOTE_LIMIT};

pub const ENV_API_URL: &str = "HIPPOBOX_API_URL";
pub const ENV_API_BASE: &str = "HIPPOBOX_API_BASE";
pub const ENV_ACCESS_TOKEN: &str = "HIPPOBOX_ACCESS_TOKEN";
pub const ENV_HYBRID_SEARCH: &str = "HIPPOBOX_HYBRID_SEARCH";
pub const ENV_DATA_DIR: &str = "HIPPOBOX_DATA_DIR";

/// 기본 API 경로
pub const DEFAULT_API_BASE: &str = "/api/v1";

// ============================================================================
// Data Directory
// ============================================================================

/// 기본 데이터 디렉토리 (~/.hippo-search/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hippo-search")
}

// ============================================================================
// Types
// ============================================================================

/// 기능 플래그
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// 원격 시맨틱(하이브리드) 검색 사용 가능 여부
    pub hybrid_search_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            hybrid_search_enabled: true,
        }
    }
}

/// 검색 설정
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// API 오리진 (끝 슬래시 제거됨, 비어 있을 수 있음)
    pub api_origin: String,
    pub api_base: String,
    pub access_token: Option<String>,
    pub features: FeatureFlags,
    pub data_dir: PathBuf,
    pub debounce: Duration,
    pub remote_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_origin: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            access_token: None,
            features: FeatureFlags::default(),
            data_dir: get_data_dir(),
            debounce: DEFAULT_DEBOUNCE,
            remote_limit: DEFAULT_REMOTE_LIMIT,
        }
    }
}

impl SearchConfig {
    /// 환경변수에서 읽기
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 조회 함수로 읽기 (테스트에서 환경변수 대신 사용)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_origin = lookup(ENV_API_URL)
            .map(|v| trim_trailing_slash(v.trim()).to_string())
            .unwrap_or_default();

        let api_base = lookup(ENV_API_BASE)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base);

        let access_token = lookup(ENV_ACCESS_TOKEN)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let features = FeatureFlags {
            hybrid_search_enabled: to_boolean(lookup(ENV_HYBRID_SEARCH).as_deref(), true),
        };

        let data_dir = lookup(ENV_DATA_DIR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        if access_token.is_some() {
            tracing::debug!("Using access token from {}", ENV_ACCESS_TOKEN);
        }

        Self {
            api_origin,
            api_base,
            access_token,
            features,
            data_dir,
            ..defaults
        }
    }

    /// API URL 조립
    pub fn api_url(&self, path: &str, query: &[(&str, Option<String>)]) -> String {
        build_api_url(&self.api_origin, &self.api_base, path, query)
    }

    /// 오리진 기준 URL (API 기본 경로 없이)
    pub fn origin_url(&self, path: &str) -> String {
        format!("{}{}", self.api_origin, ensure_leading_slash(path))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// 문자열 불리언 해석
///
/// `true`/`1`/`yes`만 참 (대소문자 무시). 없거나 공백이면 `fallback`.
pub fn to_boolean(value: Option<&str>, fallback: bool) -> bool {
    let Some(value) = value else {
        return fallback;
    };

    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return fallback;
    }

    matches!(normalized.as_str(), "true" | "1" | "yes")
}

/// API URL 조립
///
/// - 오리진이 비어 있으면 기본 경로만 사용 (상대 URL)
/// - 기본 경로 끝의 `/`는 제거, 경로 앞에는 `/` 보장
/// - 값이 없는 쿼리 파라미터는 생략
pub fn build_api_url(
    origin: &str,
    base: &str,
    path: &str,
    query: &[(&str, Option<String>)],
) -> String {
    let origin = trim_trailing_slash(origin.trim());
    let base = if base.trim().is_empty() {
        DEFAULT_API_BASE
    } else {
        base.trim()
    };

    let base_url = if origin.is_empty() {
        base.to_string()
    } else {
        format!("{}{}", origin, ensure_leading_slash(base))
    };
    let base_url = base_url.strip_suffix('/').unwrap_or(&base_url);

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut has_query = false;
    for (key, value) in query {
        if let Some(value) = value {
            serializer.append_pair(key, value);
            has_query = true;
        }
    }

    let mut url = format!("{}{}", base_url, ensure_leading_slash(path));
    if has_query {
        url.push('?');
        url.push_str(&serializer.finish());
    }
    url
}

fn trim_trailing_slash(value: &str) -> &str {
    value.trim_end_matches('/')
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_to_boolean() {
        assert!(to_boolean(Some("true"), false));
        assert!(to_boolean(Some(" YES "), false));
        assert!(to_boolean(Some("1"), false));
        assert!(!to_boolean(Some("no"), true));
        assert!(!to_boolean(Some("on"), true));
        assert!(to_boolean(Some("   "), true));
        assert!(!to_boolean(None, false));
    }

    #[test]
    fn test_build_api_url() {
        assert_eq!(
            build_api_url("https://hippo.example///", "/api/v1", "knowledge/search", &[]),
            "https://hippo.example/api/v1/knowledge/search"
        );
        assert_eq!(
            build_api_url("", "/api/v1/", "/knowledge", &[]),
            "/api/v1/knowledge"
        );
        assert_eq!(
            build_api_url("http://localhost:8000", "api", "/knowledge", &[]),
            "http://localhost:8000/api/knowledge"
        );
    }

    #[test]
    fn test_build_api_url_query() {
        let url = build_api_url(
            "http://localhost",
            "/api/v1",
            "/knowledge/search",
            &[
                ("query", Some("cats & dogs".to_string())),
                ("topic", None),
                ("limit", Some("5".to_string())),
            ],
        );
        assert_eq!(
            url,
            "http://localhost/api/v1/knowledge/search?query=cats+%26+dogs&limit=5"
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = SearchConfig::from_lookup(lookup(&[]));
        assert_eq!(config.api_origin, "");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.access_token.is_none());
        assert!(config.features.hybrid_search_enabled);
        assert_eq!(config.debounce, Duration::from_millis(350));
        assert_eq!(config.remote_limit, 5);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = SearchConfig::from_lookup(lookup(&[
            (ENV_API_URL, " http://hippo:8000/ "),
            (ENV_API_BASE, "/v2"),
            (ENV_ACCESS_TOKEN, "  "),
            (ENV_HYBRID_SEARCH, "false"),
            (ENV_DATA_DIR, "/tmp/hippo"),
        ]));

        assert_eq!(config.api_origin, "http://hippo:8000");
        assert_eq!(config.api_base, "/v2");
        assert!(config.access_token.is_none());
        assert!(!config.features.hybrid_search_enabled);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/hippo"));
        assert_eq!(
            config.api_url("/knowledge", &[]),
            "http://hippo:8000/v2/knowledge"
        );
        assert_eq!(config.origin_url("config"), "http://hippo:8000/config");
    }
}
