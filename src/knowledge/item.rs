//! 지식 항목 모델
//!
//! 외부 지식 목록에서 받아오는 읽기 전용 항목과 타임스탬프 처리 헬퍼입니다.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Types
// ============================================================================

/// 지식 항목
///
/// 원격 API의 snake_case JSON 형태를 그대로 따릅니다.
/// 문자열/태그 필드는 없거나 `null`이면 빈 값으로 읽습니다.
/// 코어는 이 값을 읽기만 하고 절대 수정하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topic: String,
    /// 마크다운 본문
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// ISO-8601 타임스탬프 (없을 수 있음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl KnowledgeItem {
    /// 생성 시각 (파싱 가능한 경우만)
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// 최신순 정렬 (created_at 내림차순)
///
/// 날짜가 없거나 파싱할 수 없는 항목은 epoch 0으로 취급합니다.
/// 안정 정렬이므로 같은 시각의 항목은 원래 순서를 유지합니다.
pub fn sort_by_recency(items: &[KnowledgeItem]) -> Vec<KnowledgeItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| std::cmp::Reverse(recency_key(item)));
    sorted
}

fn recency_key(item: &KnowledgeItem) -> i64 {
    item.created().map(|dt| dt.timestamp_millis()).unwrap_or(0)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `null`을 기본값으로 읽기
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 타임스탬프 문자열 파싱
///
/// 지원 형식:
/// - RFC3339 (`2024-01-05T10:00:00Z`, `2024-01-05T10:00:00+09:00`)
/// - 타임존 없는 날짜시간 (`2024-01-05T10:00:00`, `2024-01-05 10:00:00.123`) - UTC로 간주
/// - 날짜만 (`2024-01-05`) - UTC 자정
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, created_at: Option<&str>) -> KnowledgeItem {
        KnowledgeItem {
            id,
            title: format!("Item {}", id),
            topic: String::new(),
            content: String::new(),
            tags: vec![],
            created_at: created_at.map(str::to_string),
            updated_at: None,
        }
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let item: KnowledgeItem = serde_json::from_str(
            r#"{"id": 1, "title": null, "topic": null, "content": null, "tags": null, "created_at": null}"#,
        )
        .unwrap();

        assert_eq!(item.title, "");
        assert_eq!(item.topic, "");
        assert_eq!(item.content, "");
        assert!(item.tags.is_empty());
        assert!(item.created_at.is_none());

        let item: KnowledgeItem = serde_json::from_str(r#"{"id": 2}"#).unwrap();
        assert!(item.tags.is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-05T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-01-05T10:00:00+09:00").is_some());
        assert!(parse_timestamp("2024-01-05T10:00:00.123456").is_some());
        assert!(parse_timestamp("2024-01-05 10:00:00").is_some());
        assert!(parse_timestamp("2024-01-05").is_some());

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-45").is_none());
    }

    #[test]
    fn test_date_only_is_midnight_utc() {
        let dt = parse_timestamp("2024-01-05").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-05T00:00:00+00:00");
    }

    #[test]
    fn test_sort_by_recency() {
        let items = vec![
            item(1, Some("2024-01-01")),
            item(2, None),
            item(3, Some("2024-03-01T00:00:00Z")),
            item(4, Some("garbage")),
            item(5, Some("2024-02-01")),
        ];

        let ids: Vec<i64> = sort_by_recency(&items).iter().map(|i| i.id).collect();
        // 날짜 없음/파싱 실패는 epoch 0 -> 맨 뒤, 원래 순서 유지
        assert_eq!(ids, vec![3, 5, 1, 2, 4]);
    }

    #[test]
    fn test_deserialize_api_shape() {
        let json = r#"{
            "id": 7,
            "title": "Onboarding",
            "topic": "Guides",
            "content": "Hello",
            "tags": ["setup"],
            "created_at": "2024-01-05T00:00:00"
        }"#;
        let parsed: KnowledgeItem = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, 7);
        assert_eq!(parsed.tags, vec!["setup".to_string()]);
        assert!(parsed.updated_at.is_none());
        assert!(parsed.created().is_some());

        let minimal: KnowledgeItem = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(minimal.tags.is_empty());
        assert!(minimal.title.is_empty());
    }
}
