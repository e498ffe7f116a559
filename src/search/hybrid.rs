//! 하이브리드 검색 상태 머신
//!
//! 원격 시맨틱 검색의 상태 전이만 담당하는 순수 상태 머신입니다.
//! 타이머와 네트워크 호출은 `orchestrator` 모듈이 구동합니다.
//!
//! 요청 식별은 단조 증가하는 시퀀스 번호로 합니다. 응답은 자신의 시퀀스가
//! 현재 시퀀스와 같을 때만 반영되고, 그렇지 않으면 조용히 버려집니다.

use crate::error::SearchError;
use crate::knowledge::KnowledgeItem;

/// 기본 실패 메시지
pub const DEFAULT_FAILURE_MESSAGE: &str = "Search failed";

// ============================================================================
// Types
// ============================================================================

/// 하이브리드 검색 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridPhase {
    Idle,
    Pending,
    Success,
    Failed,
}

/// 제출 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// 빈 검색어 -> Idle로 전환, 요청 없음
    Cleared,
    /// 디바운스 타이머를 걸어야 함
    Armed { seq: u64, query: String },
    /// 이미 같은 검색어가 활성 상태
    Unchanged,
}

/// 원격 검색 응답 (본문이 없으면 `None`)
pub type SearchOutcome = Result<Option<Vec<KnowledgeItem>>, SearchError>;

/// 하이브리드 검색 상태
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridState {
    query_draft: String,
    submitted_query: String,
    results: Vec<KnowledgeItem>,
    pending: bool,
    error: Option<String>,
    enabled: bool,
    answered: bool,
    seq: u64,
}

// ============================================================================
// HybridState
// ============================================================================

impl HybridState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 세션에서 복원
    ///
    /// 결과는 정적 데이터로만 복원되며, 사용자가 다시 제출하기 전까지 요청하지 않습니다.
    pub fn restored(
        query_draft: String,
        submitted_query: String,
        results: Vec<KnowledgeItem>,
    ) -> Self {
        Self {
            query_draft,
            submitted_query,
            results,
            ..Self::default()
        }
    }

    pub fn query_draft(&self) -> &str {
        &self.query_draft
    }

    pub fn submitted_query(&self) -> &str {
        &self.submitted_query
    }

    pub fn results(&self) -> &[KnowledgeItem] {
        &self.results
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 현재 요청 시퀀스 번호
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    pub fn phase(&self) -> HybridPhase {
        if self.pending {
            HybridPhase::Pending
        } else if self.error.is_some() {
            HybridPhase::Failed
        } else if self.answered {
            HybridPhase::Success
        } else {
            HybridPhase::Idle
        }
    }

    /// 제출된 검색어가 있는지 (결과가 기본 목록을 대체하는지)
    pub fn has_submission(&self) -> bool {
        !self.submitted_query.trim().is_empty()
    }

    /// 입력창 값 변경
    ///
    /// 입력이 비면 제출된 검색어도 지워지고 진행 중 요청은 무효화됩니다.
    /// 반환값은 무효화 여부입니다.
    pub fn set_draft(&mut self, draft: &str) -> bool {
        self.query_draft = draft.to_string();
        if draft.trim().is_empty() && !self.submitted_query.is_empty() {
            self.submitted_query.clear();
            self.clear_outcome();
            self.invalidate();
            return true;
        }
        false
    }

    /// 검색어 제출
    pub fn submit(&mut self, draft: &str) -> Submission {
        self.query_draft = draft.to_string();

        let trimmed = draft.trim();
        if trimmed.is_empty() {
            self.enabled = false;
            self.submitted_query.clear();
            self.clear_outcome();
            self.invalidate();
            return Submission::Cleared;
        }

        let changed = !self.enabled || self.submitted_query != trimmed;
        self.enabled = true;
        self.submitted_query = trimmed.to_string();

        if !changed {
            return Submission::Unchanged;
        }

        let seq = self.invalidate();
        Submission::Armed {
            seq,
            query: trimmed.to_string(),
        }
    }

    /// 무조건 Idle로 복귀, 모든 필드 초기화, 진행 중 요청 무효화
    pub fn reset(&mut self) {
        self.query_draft.clear();
        self.submitted_query.clear();
        self.enabled = false;
        self.clear_outcome();
        self.invalidate();
    }

    /// 디스패치 시작
    ///
    /// 시퀀스가 여전히 최신일 때만 Pending으로 전환합니다.
    pub fn begin(&mut self, seq: u64) -> bool {
        if seq != self.seq {
            return false;
        }
        self.error = None;
        self.results.clear();
        self.answered = false;
        self.pending = true;
        true
    }

    /// 응답 반영 (시퀀스 게이트)
    ///
    /// 오래된 응답이면 `false`를 반환하고 상태를 건드리지 않습니다.
    pub fn apply(&mut self, seq: u64, outcome: SearchOutcome, failure_message: &str) -> bool {
        if seq != self.seq {
            return false;
        }

        match outcome {
            Ok(results) => {
                self.results = results.unwrap_or_default();
                self.error = None;
            }
            Err(_) => {
                self.results.clear();
                self.error = Some(failure_message.to_string());
            }
        }
        self.pending = false;
        self.answered = true;
        true
    }

    fn clear_outcome(&mut self) {
        self.results.clear();
        self.error = None;
        self.pending = false;
        self.answered = false;
    }

    fn invalidate(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

// ============================================================================
// Tests
// ============================================================================
