//! 텍스트 정규화 모듈 - 마크다운 본문을 미리보기용 평문으로 변환
//!
//! 마크다운 -> HTML -> 텍스트 노드 추출 -> 공백 정리 순서로 처리합니다.
//! 어떤 입력이 와도 실패하지 않으며, 깨진 마크다운은 가능한 만큼만 평문화합니다.

use pulldown_cmark::{html, Event, Options, Parser};
use scraper::Html;

use crate::knowledge::parse_timestamp;

/// 미리보기 길이 (유니코드 코드 포인트 기준)
pub const PREVIEW_LIMIT: usize = 200;

/// 잘림 표시
pub const TRUNCATION_MARKER: &str = "...";

// ============================================================================
// Plain Text
// ============================================================================

/// 마크다운을 평문으로 변환
///
/// GFM(테이블, 취소선, 체크리스트)을 지원하고 단일 줄바꿈도 줄바꿈으로 취급합니다.
/// 결과는 연속 공백이 하나로 합쳐지고 양끝이 잘린 한 줄 문자열입니다.
pub fn to_plain_text(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    let html = render_html(markdown);
    let fragment = Html::parse_fragment(&html);

    // textContent와 동일하게 텍스트 노드를 구분자 없이 이어붙임
    let text: String = fragment.root_element().text().collect();

    collapse_whitespace(&text)
}

/// 마크다운 -> HTML
fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// 연속 공백 정리
fn collapse_whitespace(text: &str) -> String {
    if let Ok(re) = regex::Regex::new(r"\s+") {
        re.replace_all(text, " ").trim().to_string()
    } else {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

// ============================================================================
// Truncation
// ============================================================================

/// 텍스트 자르기 (코드 포인트 기준, UTF-8 안전)
///
/// `max_len` 이하이면 그대로 반환하고, 넘으면 앞부분 `max_len`자 뒤에 `...`를 붙입니다.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_len).collect();
    format!("{}{}", truncated, TRUNCATION_MARKER)
}

/// 결과 카드용 미리보기
pub fn preview(markdown: &str) -> String {
    truncate(&to_plain_text(markdown), PREVIEW_LIMIT)
}

// ============================================================================
// Dates
// ============================================================================

/// 날짜 표시 (`YYYY-MM-DD`, 없거나 파싱 실패 시 `-`)
pub fn format_date(value: Option<&str>) -> String {
    value
        .and_then(parse_timestamp)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

// ============================================================================
// Tests
// ============================================================================
