//! CLI 모듈
//!
//! hippo-search CLI 명령어 정의 및 구현
//!
//! 매 실행마다 저장된 세션을 복원하고, 명령을 적용한 뒤 결과를 출력하고 다시 저장합니다.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::client::{HttpKnowledgeClient, OfflineClient, RemoteSearchClient};
use crate::config::SearchConfig;
use crate::knowledge::{JsonFileSource, KnowledgeListSource};
use crate::search::{normalize_topic, SearchFilterField, TopicKey, NO_TOPIC_KEY};
use crate::session::{
    DurableKeyValueStore, MemoryStore, SessionPersister, SqliteStore, SESSION_DB_FILE,
};
use crate::view::{KnowledgeSearch, Messages, SearchOptions, SearchView};

/// 기본 출력 행 수
const DEFAULT_MAX_ROWS: usize = 20;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "hippo-search")]
#[command(version, about = "하이브리드 지식 검색 CLI", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// 모든 명령에 공통인 옵션
#[derive(Debug, Clone, clap::Args)]
pub struct GlobalArgs {
    /// API 대신 읽을 지식 목록 JSON 파일
    #[arg(long, global = true)]
    pub items: Option<PathBuf>,

    /// API 오리진 (HIPPOBOX_API_URL 대체)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// 하이브리드 검색 끄기
    #[arg(long, global = true)]
    pub no_hybrid: bool,

    /// 출력 언어 (ko, en)
    #[arg(long, global = true, default_value = "ko")]
    pub lang: String,

    /// 최대 출력 행 수
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ROWS)]
    pub max_rows: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 로컬 검색어/필드/토픽 설정 후 결과 출력
    Search {
        /// 검색어 (`#tag`로 시작하면 태그 검색)
        query: Option<String>,

        /// 매칭 필드 (쉼표 구분: title,topic,tags,content,created_at,updated_at)
        #[arg(short, long, value_delimiter = ',')]
        fields: Option<Vec<String>>,

        /// 토픽 선택 (`__no_topic__`은 토픽 없음)
        #[arg(short, long)]
        topic: Option<String>,

        /// 토픽 선택 해제
        #[arg(long, conflicts_with = "topic")]
        all_topics: bool,
    },

    /// 태그로 검색 (검색어를 `#tag`로 설정)
    Tag {
        tag: String,
    },

    /// 원격 시맨틱 검색
    Hyper {
        /// 검색어 (비우면 하이브리드 검색 해제)
        query: String,
    },

    /// 토픽 목록
    Topics,

    /// 현재 세션 화면 출력
    Show,

    /// 전체 보기 (하이브리드/검색어/토픽 초기화)
    Reset,

    /// 저장된 세션 관리
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// 상태 확인
    Status,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// 저장된 세션 JSON 출력
    Show,
    /// 저장된 세션 삭제
    Clear,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli.global);
    let global = cli.global;

    match cli.command {
        Commands::Search {
            query,
            fields,
            topic,
            all_topics,
        } => cmd_search(&config, &global, query, fields, topic, all_topics).await,
        Commands::Tag { tag } => cmd_tag(&config, &global, &tag).await,
        Commands::Hyper { query } => cmd_hyper(&config, &global, &query).await,
        Commands::Topics => cmd_topics(&config, &global).await,
        Commands::Show => cmd_show(&config, &global).await,
        Commands::Reset => cmd_reset(&config, &global).await,
        Commands::Session { action } => cmd_session(&config, action),
        Commands::Status => cmd_status(&config).await,
    }
}

/// 환경변수 + CLI 옵션
fn resolve_config(global: &GlobalArgs) -> SearchConfig {
    let mut config = SearchConfig::from_env();
    if let Some(ref url) = global.api_url {
        config.api_origin = url.trim().trim_end_matches('/').to_string();
    }
    if global.no_hybrid {
        config.features.hybrid_search_enabled = false;
    }
    config
}

// ============================================================================
// Session Setup
// ============================================================================

/// 세션 저장소 열기 (실패 시 메모리 저장소)
fn open_persister(config: &SearchConfig) -> SessionPersister {
    let store: Arc<dyn DurableKeyValueStore> = match SqliteStore::open_in(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Session store unavailable, using memory: {:#}", e);
            Arc::new(MemoryStore::new())
        }
    };
    SessionPersister::new(store)
}

/// 검색 세션 마운트
async fn open_session(config: &SearchConfig, global: &GlobalArgs) -> Result<KnowledgeSearch> {
    let http = if config.api_origin.is_empty() {
        None
    } else {
        Some(HttpKnowledgeClient::from_config(config)?)
    };

    let source: Box<dyn KnowledgeListSource> = match (&global.items, &http) {
        (Some(path), _) => Box::new(JsonFileSource::new(path)),
        (None, Some(client)) => Box::new(client.clone()),
        (None, None) => anyhow::bail!(
            "지식 목록을 가져올 곳이 없습니다.\n\
             설정: export HIPPOBOX_API_URL=http://localhost:8000 또는 --items <file>"
        ),
    };
    let items = source.load_items().await?;
    tracing::info!("Loaded {} knowledge items from {}", items.len(), source.name());

    let mut hybrid_available = config.features.hybrid_search_enabled && http.is_some();
    if hybrid_available {
        if let Some(ref client) = http {
            match client.fetch_features().await {
                Ok(features) => hybrid_available = features.hybrid_search_enabled,
                Err(e) => tracing::debug!("Server feature flags unavailable: {:#}", e),
            }
        }
    }

    let remote: Arc<dyn RemoteSearchClient> = match http {
        Some(client) => Arc::new(client),
        None => Arc::new(OfflineClient),
    };

    let options = SearchOptions {
        hybrid_available,
        debounce: config.debounce,
        remote_limit: config.remote_limit,
        messages: Messages::for_lang(&global.lang),
    };

    Ok(KnowledgeSearch::mount(
        &items,
        remote,
        open_persister(config),
        options,
    ))
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 검색 명령어 (search)
async fn cmd_search(
    config: &SearchConfig,
    global: &GlobalArgs,
    query: Option<String>,
    fields: Option<Vec<String>>,
    topic: Option<String>,
    all_topics: bool,
) -> Result<()> {
    let search = open_session(config, global).await?;

    if let Some(query) = query {
        search.set_query(&query);
    }

    if let Some(names) = fields {
        let wanted = parse_fields(&names)?;
        let current = search.selected_fields();
        for field in SearchFilterField::ALL {
            if current.contains(field) != wanted.contains(&field) {
                search.toggle_field(field);
            }
        }
    }

    if all_topics {
        if let Some(active) = search.active_topic() {
            search.select_topic(active);
        }
    } else if let Some(raw) = topic {
        let key = topic_arg(&raw);
        if search.active_topic().as_ref() != Some(&key) {
            search.select_topic(key);
        }
    }

    print_view(&search.view(), &search, global.max_rows);
    Ok(())
}

/// 태그 명령어 (tag)
async fn cmd_tag(config: &SearchConfig, global: &GlobalArgs, tag: &str) -> Result<()> {
    let search = open_session(config, global).await?;
    search.click_tag(tag.trim_start_matches('#'));
    print_view(&search.view(), &search, global.max_rows);
    Ok(())
}

/// 원격 검색 명령어 (hyper)
async fn cmd_hyper(config: &SearchConfig, global: &GlobalArgs, query: &str) -> Result<()> {
    let search = open_session(config, global).await?;

    if !search.view().hybrid.available {
        println!("[!] 하이브리드 검색을 사용할 수 없습니다.");
        return Ok(());
    }

    if !query.trim().is_empty() {
        println!("[*] 검색 중: \"{}\"", query.trim());
    }

    search.set_hyper_draft(query);
    search.submit_hyper(query);
    search.settle().await;

    print_view(&search.view(), &search, global.max_rows);
    Ok(())
}

/// 토픽 명령어 (topics)
async fn cmd_topics(config: &SearchConfig, global: &GlobalArgs) -> Result<()> {
    let search = open_session(config, global).await?;
    let view = search.view();

    if view.topics.is_empty() {
        println!("[!] 토픽이 없습니다.");
        return Ok(());
    }

    println!("[OK] 토픽 ({} 개):\n", view.topics.len());
    for topic in &view.topics {
        let marker = if topic.active { "*" } else { " " };
        println!(
            " {} {:<24} {:>4}   ({})",
            marker,
            truncate_text(&topic.label, 24),
            topic.count,
            topic.key
        );
    }
    Ok(())
}

/// 화면 출력 명령어 (show)
async fn cmd_show(config: &SearchConfig, global: &GlobalArgs) -> Result<()> {
    let search = open_session(config, global).await?;
    print_view(&search.view(), &search, global.max_rows);
    Ok(())
}

/// 전체 보기 명령어 (reset)
async fn cmd_reset(config: &SearchConfig, global: &GlobalArgs) -> Result<()> {
    let search = open_session(config, global).await?;
    search.show_all();
    println!("[OK] 검색 상태를 초기화했습니다.\n");
    print_view(&search.view(), &search, global.max_rows);
    Ok(())
}

/// 세션 명령어 (session)
fn cmd_session(config: &SearchConfig, action: SessionAction) -> Result<()> {
    let persister = open_persister(config);

    match action {
        SessionAction::Show => match persister.load() {
            Some(session) => {
                let json = serde_json::to_string_pretty(&session)
                    .context("세션 직렬화 실패")?;
                println!("{}", json);
            }
            None => println!("[!] 저장된 세션이 없습니다."),
        },
        SessionAction::Clear => {
            persister.clear();
            println!("[OK] 저장된 세션을 삭제했습니다.");
        }
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(config: &SearchConfig) -> Result<()> {
    println!("hippo-search v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!(
        "[*] 세션 DB: {}",
        config.data_dir.join(SESSION_DB_FILE).display()
    );

    if config.api_origin.is_empty() {
        println!("[!] API: 미설정");
        println!("    설정: export HIPPOBOX_API_URL=http://localhost:8000");
    } else {
        println!("[OK] API: {}", config.api_url("/", &[]));
        if config.access_token.is_some() {
            println!("[OK] 액세스 토큰: 설정됨");
        } else {
            println!("[*] 액세스 토큰: 미설정");
        }
    }

    let mut hybrid = config.features.hybrid_search_enabled;
    if hybrid && !config.api_origin.is_empty() {
        match HttpKnowledgeClient::from_config(config)?.fetch_features().await {
            Ok(features) => hybrid = features.hybrid_search_enabled,
            Err(e) => println!("[!] 서버 설정 조회 실패: {:#}", e),
        }
    }
    println!(
        "[{}] 하이브리드 검색: {}",
        if hybrid { "OK" } else { "!" },
        if hybrid { "사용" } else { "사용 안 함" }
    );

    match open_persister(config).load() {
        Some(session) => {
            println!("[OK] 저장된 세션: 있음");
            if !session.query.is_empty() {
                println!("     검색어: {}", session.query);
            }
            if !session.hyper_submitted_query.is_empty() {
                println!(
                    "     하이브리드: \"{}\" ({} 건)",
                    session.hyper_submitted_query,
                    session.hyper_results.len()
                );
            }
        }
        None => println!("[*] 저장된 세션: 없음"),
    }

    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_view(view: &SearchView, search: &KnowledgeSearch, max_rows: usize) {
    let messages = search.messages();

    let active_fields: Vec<&str> = view
        .filters
        .iter()
        .filter(|f| f.active)
        .map(|f| f.label.as_str())
        .collect();
    println!(
        "[*] 검색어: \"{}\" | 필드: {}",
        view.query,
        if active_fields.is_empty() {
            "-".to_string()
        } else {
            active_fields.join(", ")
        }
    );

    if let Some(topic) = view.topics.iter().find(|t| t.active) {
        println!("[*] 토픽: {}", topic.label);
    }

    if view.hybrid.active {
        println!("[*] 하이브리드: \"{}\"", view.hybrid.submitted_query);
    }
    if view.hybrid.loading {
        println!("[*] 검색 중...");
    }
    if let Some(ref error) = view.hybrid.error {
        println!("[!] {}", error);
    }

    if view.empty {
        println!("\n[!] {}", messages.empty);
        return;
    }
    if view.rows.is_empty() {
        return;
    }

    println!("\n[OK] 결과 ({} 건):\n", view.rows.len());

    for (i, row) in view.rows.iter().take(max_rows).enumerate() {
        let tags = if row.tags.is_empty() {
            messages.no_tags.clone()
        } else {
            row.tags
                .iter()
                .map(|t| format!("#{}", t))
                .collect::<Vec<_>>()
                .join(" ")
        };

        println!("{}. #{} {}  {}", i + 1, row.id, row.title, tags);
        if !row.topic.is_empty() {
            println!("   {}", row.topic);
        }
        if !row.preview.is_empty() {
            println!("   {}", row.preview);
        }
        println!(
            "   {} {} | {} {}",
            messages.field_label(SearchFilterField::CreatedAt),
            row.created,
            messages.field_label(SearchFilterField::UpdatedAt),
            row.updated
        );
        println!();
    }

    if view.rows.len() > max_rows {
        println!("   ... 외 {} 건", view.rows.len() - max_rows);
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 필드 이름 목록 해석
fn parse_fields(names: &[String]) -> Result<Vec<SearchFilterField>> {
    names
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<SearchFilterField>()
                .map_err(|e| anyhow::anyhow!("{}", e))
        })
        .collect()
}

/// 토픽 인자 해석 (패싯 집계와 같은 키로 정규화)
///
/// 빈 값과 "uncategorized"는 토픽 없음 버킷입니다.
fn topic_arg(raw: &str) -> TopicKey {
    if raw.trim() == NO_TOPIC_KEY {
        TopicKey::NoTopic
    } else {
        normalize_topic(raw)
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "hippo-search",
            "--items",
            "dump.json",
            "search",
            "setup",
            "--fields",
            "title,tags",
            "--topic",
            "Guides",
        ])
        .unwrap();

        assert_eq!(cli.global.items, Some(PathBuf::from("dump.json")));
        assert_eq!(cli.global.max_rows, DEFAULT_MAX_ROWS);
        match cli.command {
            Commands::Search {
                query,
                fields,
                topic,
                all_topics,
            } => {
                assert_eq!(query.as_deref(), Some("setup"));
                assert_eq!(fields, Some(vec!["title".to_string(), "tags".to_string()]));
                assert_eq!(topic.as_deref(), Some("Guides"));
                assert!(!all_topics);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["hippo-search", "hyper", "cats", "--no-hybrid"]).unwrap();
        assert!(cli.global.no_hybrid);
        assert!(matches!(cli.command, Commands::Hyper { .. }));
    }

    #[test]
    fn test_parse_fields() {
        let fields = parse_fields(&["title".to_string(), " created_at ".to_string()]).unwrap();
        assert_eq!(
            fields,
            vec![SearchFilterField::Title, SearchFilterField::CreatedAt]
        );
        assert!(parse_fields(&["bogus".to_string()]).is_err());
    }

    #[test]
    fn test_topic_arg() {
        assert_eq!(topic_arg("Uncategorized"), TopicKey::NoTopic);
        assert_eq!(topic_arg(""), TopicKey::NoTopic);
        assert_eq!(topic_arg(NO_TOPIC_KEY), TopicKey::NoTopic);
        assert_eq!(topic_arg(" Guides "), TopicKey::Topic("guides".to_string()));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }
}
