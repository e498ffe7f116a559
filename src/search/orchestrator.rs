//! 하이브리드 검색 오케스트레이터
//!
//! `HybridState` 상태 머신을 디바운스 타이머와 원격 검색 호출로 구동합니다.
//!
//! - 제출 후 조용한 구간(기본 350ms)이 지나야 요청을 보냄
//! - 구간 안의 새 제출은 이전 타이머를 완전히 대체 (이전 타이머는 발사되지 않음)
//! - 진행 중 요청은 중단하지 않고 시퀀스 게이트로 결과만 버림

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::client::RemoteSearchClient;

use super::hybrid::{HybridState, Submission, DEFAULT_FAILURE_MESSAGE};
use super::lock;

/// 디바운스 조용한 구간
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(350);

/// 원격 요청 최대 결과 수
pub const DEFAULT_REMOTE_LIMIT: usize = 5;

/// 상태 변경 콜백 (변경 직후 스냅샷 전달)
pub type ChangeHook = Arc<dyn Fn(&HybridState) + Send + Sync>;

// ============================================================================
// Settings
// ============================================================================

/// 오케스트레이터 설정
#[derive(Debug, Clone)]
pub struct HybridSettings {
    pub debounce: Duration,
    pub limit: usize,
    /// 실패 시 표시할 (로컬라이즈된) 메시지
    pub failure_message: String,
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            limit: DEFAULT_REMOTE_LIMIT,
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

// ============================================================================
// HybridSearch
// ============================================================================

struct Shared {
    state: Mutex<HybridState>,
    client: Arc<dyn RemoteSearchClient>,
    settings: HybridSettings,
    available: AtomicBool,
    hook: Mutex<Option<ChangeHook>>,
    /// 콜백 호출과 `with_snapshot`을 한 줄로 세우는 락
    notify_lock: Mutex<()>,
    timer: Mutex<Option<JoinHandle<()>>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

/// 하이브리드 검색 오케스트레이터
///
/// 복제해도 같은 상태를 공유합니다. 타이머와 요청은 tokio 태스크로 실행되므로
/// 런타임 안에서 사용해야 합니다.
#[derive(Clone)]
pub struct HybridSearch {
    shared: Arc<Shared>,
}

impl HybridSearch {
    /// 새 오케스트레이터 생성
    ///
    /// # Arguments
    /// * `client` - 원격 검색 클라이언트
    /// * `settings` - 디바운스/결과 수/실패 메시지
    /// * `available` - 하이브리드 검색 기능 플래그
    pub fn new(
        client: Arc<dyn RemoteSearchClient>,
        settings: HybridSettings,
        available: bool,
    ) -> Self {
        Self::with_state(client, settings, available, HybridState::new())
    }

    /// 복원된 상태로 생성 (네트워크 호출 없음)
    pub fn with_state(
        client: Arc<dyn RemoteSearchClient>,
        settings: HybridSettings,
        available: bool,
        state: HybridState,
    ) -> Self {
        let state = if available { state } else { HybridState::new() };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                client,
                settings,
                available: AtomicBool::new(available),
                hook: Mutex::new(None),
                notify_lock: Mutex::new(()),
                timer: Mutex::new(None),
                in_flight: Mutex::new(Vec::new()),
            }),
        }
    }

    /// 상태 변경 콜백 등록
    pub fn set_change_hook(&self, hook: ChangeHook) {
        *lock(&self.shared.hook) = Some(hook);
    }

    /// 현재 상태 스냅샷
    pub fn snapshot(&self) -> HybridState {
        lock(&self.shared.state).clone()
    }

    /// 변경 콜백과 같은 락 아래에서 최신 스냅샷으로 `f` 실행
    ///
    /// 콜백 안에서 호출하면 교착되므로 콜백 밖에서만 사용합니다.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&HybridState) -> R) -> R {
        let _guard = lock(&self.shared.notify_lock);
        let snapshot = self.snapshot();
        f(&snapshot)
    }

    pub fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst)
    }

    /// 원격 결과가 기본 목록을 대체하는지
    pub fn is_active(&self) -> bool {
        self.is_available() && lock(&self.shared.state).has_submission()
    }

    /// 입력창 값 변경
    pub fn set_draft(&self, draft: &str) {
        let invalidated = lock(&self.shared.state).set_draft(draft);
        if invalidated {
            self.cancel_timer();
            tracing::debug!("Hybrid query cleared from input");
        }
        self.shared.notify();
    }

    /// 검색어 제출
    pub fn submit(&self, draft: &str) {
        if !self.is_available() {
            tracing::debug!("Hybrid search unavailable, forcing idle");
            self.force_idle();
            return;
        }

        let submission = lock(&self.shared.state).submit(draft);
        match submission {
            Submission::Armed { seq, query } => {
                tracing::debug!(seq, query = %query, "Hybrid search armed");
                self.arm(seq, query);
            }
            Submission::Cleared => {
                tracing::debug!("Empty hybrid query, back to idle");
                self.cancel_timer();
            }
            Submission::Unchanged => {}
        }
        self.shared.notify();
    }

    /// Idle로 복귀하고 진행 중 요청 무효화
    pub fn reset(&self) {
        self.force_idle();
    }

    /// 기능 플래그 변경
    ///
    /// 꺼지면 즉시 Idle로 전환되고, 진행 중 요청 결과는 반영되지 않습니다.
    pub fn set_available(&self, available: bool) {
        let previous = self.shared.available.swap(available, Ordering::SeqCst);
        if previous && !available {
            tracing::info!("Hybrid search disabled");
            self.force_idle();
        }
    }

    /// 걸려 있는 타이머와 진행 중 요청이 모두 끝날 때까지 대기
    pub async fn settle(&self) {
        let timer = lock(&self.shared.timer).take();
        if let Some(timer) = timer {
            // 취소된 타이머는 JoinError -> 무시
            let _ = timer.await;
        }

        let handles = std::mem::take(&mut *lock(&self.shared.in_flight));
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn force_idle(&self) {
        self.cancel_timer();
        lock(&self.shared.state).reset();
        self.shared.notify();
    }

    fn arm(&self, seq: u64, query: String) {
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(shared.settings.debounce).await;
            Shared::dispatch(&shared, seq, query);
        });

        if let Some(previous) = lock(&self.shared.timer).replace(handle) {
            previous.abort();
        }
    }

    fn cancel_timer(&self) {
        if let Some(timer) = lock(&self.shared.timer).take() {
            timer.abort();
        }
    }
}

impl Shared {
    /// 타이머 만료 후 요청 발송
    fn dispatch(shared: &Arc<Shared>, seq: u64, query: String) {
        if !shared.available.load(Ordering::SeqCst) {
            return;
        }
        if !lock(&shared.state).begin(seq) {
            tracing::debug!(seq, "Stale hybrid timer, skipping dispatch");
            return;
        }
        shared.notify();

        tracing::info!(seq, query = %query, limit = shared.settings.limit, "Dispatching hybrid search");

        let task = Arc::clone(shared);
        let handle = tokio::spawn(async move {
            let outcome = task.client.search(&query, task.settings.limit).await;

            match &outcome {
                Ok(results) => tracing::info!(
                    seq,
                    count = results.as_ref().map_or(0, Vec::len),
                    "Hybrid search completed"
                ),
                Err(e) => tracing::warn!(seq, "Hybrid search failed: {}", e),
            }

            let applied = lock(&task.state).apply(seq, outcome, &task.settings.failure_message);
            if applied {
                task.notify();
            } else {
                tracing::debug!(seq, "Discarding stale hybrid response");
            }
        });

        let mut in_flight = lock(&shared.in_flight);
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    fn notify(&self) {
        let hook = lock(&self.hook).clone();
        if let Some(hook) = hook {
            let _guard = lock(&self.notify_lock);
            let snapshot = lock(&self.state).clone();
            hook(&snapshot);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::error::SearchError;
    use crate::knowledge::KnowledgeItem;
    use crate::search::hybrid::{HybridPhase, SearchOutcome};

    fn item(id: i64) -> KnowledgeItem {
        KnowledgeItem {
            id,
            title: format!("Item {}", id),
            topic: String::new(),
            content: String::new(),
            tags: vec![],
            created_at: None,
            updated_at: None,
        }
    }

    /// 검색어별 지연/응답을 지정할 수 있는 테스트 클라이언트
    #[derive(Default)]
    struct MockClient {
        calls: Mutex<Vec<(String, usize)>>,
        delays: HashMap<String, Duration>,
        results: HashMap<String, Vec<KnowledgeItem>>,
        failing: bool,
    }

    impl MockClient {
        fn calls(&self) -> Vec<(String, usize)> {
            lock(&self.calls).clone()
        }
    }

    #[async_trait]
    impl RemoteSearchClient for MockClient {
        async fn search(&self, query: &str, limit: usize) -> SearchOutcome {
            lock(&self.calls).push((query.to_string(), limit));

            if let Some(delay) = self.delays.get(query) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing {
                return Err(SearchError::Server {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(self.results.get(query).cloned())
        }
    }

    fn orchestrator(client: Arc<MockClient>) -> HybridSearch {
        HybridSearch::new(client, HybridSettings::default(), true)
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_dispatches_after_quiet_period() {
        let mut client = MockClient::default();
        client
            .results
            .insert("cats".to_string(), vec![item(1), item(2)]);
        let client = Arc::new(client);
        let hybrid = orchestrator(Arc::clone(&client));

        hybrid.submit("cats");
        tokio::time::sleep(Duration::from_millis(349)).await;
        assert!(client.calls().is_empty());

        hybrid.settle().await;

        assert_eq!(client.calls(), vec![("cats".to_string(), DEFAULT_REMOTE_LIMIT)]);
        let state = hybrid.snapshot();
        assert_eq!(state.results().len(), 2);
        assert!(!state.is_pending());
        assert!(state.error().is_none());
        assert_eq!(state.phase(), HybridPhase::Success);
        assert!(hybrid.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_dispatches_last_value_once() {
        let client = Arc::new(MockClient::default());
        let hybrid = orchestrator(Arc::clone(&client));

        hybrid.submit("c");
        tokio::time::sleep(Duration::from_millis(100)).await;
        hybrid.submit("ca");
        tokio::time::sleep(Duration::from_millis(300)).await;
        hybrid.submit("cat");
        hybrid.settle().await;

        assert_eq!(client.calls(), vec![("cat".to_string(), DEFAULT_REMOTE_LIMIT)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_before_timer_prevents_dispatch() {
        let client = Arc::new(MockClient::default());
        let hybrid = orchestrator(Arc::clone(&client));

        hybrid.submit("x");
        hybrid.reset();
        tokio::time::sleep(Duration::from_secs(2)).await;
        hybrid.settle().await;

        assert!(client.calls().is_empty());
        assert_eq!(hybrid.snapshot().phase(), HybridPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_earlier_response_never_overwrites_later() {
        let mut client = MockClient::default();
        client
            .delays
            .insert("slow".to_string(), Duration::from_millis(1000));
        client
            .delays
            .insert("fast".to_string(), Duration::from_millis(10));
        client.results.insert("slow".to_string(), vec![item(1)]);
        client.results.insert("fast".to_string(), vec![item(2)]);
        let client = Arc::new(client);
        let hybrid = orchestrator(Arc::clone(&client));

        hybrid.submit("slow");
        tokio::time::sleep(Duration::from_millis(360)).await;
        assert_eq!(client.calls().len(), 1);
        assert!(hybrid.snapshot().is_pending());

        hybrid.submit("fast");
        tokio::time::sleep(Duration::from_millis(400)).await;
        let ids: Vec<i64> = hybrid.snapshot().results().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2]);

        // 느린 첫 응답 도착 후에도 그대로
        hybrid.settle().await;
        let state = hybrid.snapshot();
        assert_eq!(client.calls().len(), 2);
        assert_eq!(state.results().iter().map(|i| i.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(state.submitted_query(), "fast");
        assert!(!state.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_sets_message() {
        let client = Arc::new(MockClient {
            failing: true,
            ..MockClient::default()
        });
        let settings = HybridSettings {
            failure_message: "검색에 실패했습니다".to_string(),
            ..HybridSettings::default()
        };
        let hybrid = HybridSearch::new(client, settings, true);

        hybrid.submit("cats");
        hybrid.settle().await;

        let state = hybrid.snapshot();
        assert_eq!(state.error(), Some("검색에 실패했습니다"));
        assert!(state.results().is_empty());
        assert!(!state.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_never_dispatches() {
        let client = Arc::new(MockClient::default());
        let hybrid = HybridSearch::new(
            Arc::clone(&client) as Arc<dyn RemoteSearchClient>,
            HybridSettings::default(),
            false,
        );

        hybrid.submit("cats");
        hybrid.settle().await;

        assert!(client.calls().is_empty());
        let state = hybrid.snapshot();
        assert_eq!(state.phase(), HybridPhase::Idle);
        assert!(state.submitted_query().is_empty());
        assert!(!hybrid.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_mid_flight_discards_response() {
        let mut client = MockClient::default();
        client
            .delays
            .insert("cats".to_string(), Duration::from_millis(500));
        client.results.insert("cats".to_string(), vec![item(1)]);
        let client = Arc::new(client);
        let hybrid = orchestrator(Arc::clone(&client));

        hybrid.submit("cats");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(hybrid.snapshot().is_pending());

        hybrid.set_available(false);
        hybrid.settle().await;

        let state = hybrid.snapshot();
        assert_eq!(client.calls().len(), 1);
        assert!(state.results().is_empty());
        assert!(!state.is_pending());
        assert!(state.submitted_query().is_empty());
        assert_eq!(state.phase(), HybridPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_draft_cancels_armed_timer() {
        let client = Arc::new(MockClient::default());
        let hybrid = orchestrator(Arc::clone(&client));

        hybrid.submit("cats");
        hybrid.set_draft("");
        hybrid.settle().await;

        assert!(client.calls().is_empty());
        assert!(!hybrid.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_hook_sees_every_transition() {
        let mut client = MockClient::default();
        client.results.insert("cats".to_string(), vec![item(1)]);
        let client = Arc::new(client);
        let hybrid = orchestrator(client);

        let seen: Arc<Mutex<Vec<HybridPhase>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        hybrid.set_change_hook(Arc::new(move |state: &HybridState| {
            lock(&sink).push(state.phase());
        }));

        hybrid.submit("cats");
        hybrid.settle().await;

        let phases = lock(&seen).clone();
        assert_eq!(
            phases,
            vec![HybridPhase::Idle, HybridPhase::Pending, HybridPhase::Success]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restored_state_does_not_fetch() {
        let client = Arc::new(MockClient::default());
        let restored = HybridState::restored(
            "cats".to_string(),
            "cats".to_string(),
            vec![item(1), item(2)],
        );
        let hybrid = HybridSearch::with_state(
            Arc::clone(&client) as Arc<dyn RemoteSearchClient>,
            HybridSettings::default(),
            true,
            restored,
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        hybrid.settle().await;

        assert!(client.calls().is_empty());
        assert!(hybrid.is_active());
        assert_eq!(hybrid.snapshot().results().len(), 2);

        // 같은 검색어를 다시 제출하면 요청 발생
        hybrid.submit("cats");
        hybrid.settle().await;
        assert_eq!(client.calls().len(), 1);
    }
}
