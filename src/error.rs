//! 에러 타입
//!
//! 트레이트 경계(원격 검색, 키-값 저장소)에서 쓰는 타입 에러입니다.
//! 애플리케이션 레벨(설정, CLI)은 anyhow를 그대로 사용합니다.

use thiserror::Error;

/// 원격 시맨틱 검색 실패
///
/// 코어는 "성공/실패"만 구분하므로 변형은 로그용입니다.
#[derive(Debug, Error)]
pub enum SearchError {
    /// 네트워크 레벨 실패 (연결, 타임아웃 등)
    #[error("search request failed: {0}")]
    Transport(String),

    /// 서버가 에러 응답을 반환
    #[error("search API error ({status}): {message}")]
    Server { status: u16, message: String },

    /// 응답 본문 파싱 실패
    #[error("failed to decode search response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::Decode(err.to_string())
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

/// 키-값 저장소 실패
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SearchError::Server {
            status: 500,
            message: "qdrant down".to_string(),
        };
        assert_eq!(err.to_string(), "search API error (500): qdrant down");

        let err = StoreError::Unavailable("quota exceeded".to_string());
        assert!(err.to_string().contains("quota exceeded"));
    }
}
