//! Integration tests for the crawler
//!
//! These tests drive the coordinator against a scripted in-memory portal that
//! implements `BrowserDriver`, with no pacing delays and a clock fixed at
//! noon, and check the full search, paginate and download cycle end-to-end.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;
use wenshu_trawl::config::{parse_config, Config, SelectorConfig};
use wenshu_trawl::crawler::{
    ActionKind, Coordinator, FixedClock, NoDelay, PacingPolicy, RunSummary, Shutdown, SkipScope,
};
use wenshu_trawl::driver::{BrowserDriver, Cookie, FingerprintProfile, Navigation, WaitPolicy};
use wenshu_trawl::state::{CrawlUnit, UnitStatus};
use wenshu_trawl::storage::{open_ledger, Ledger, RunStatus};
use wenshu_trawl::{DriverError, DriverResult};

const DOC_PATH: &str = "https://wenshu.court.gov.cn/website/wenshu/181107ANFZ0BXSK4/index.html";

#[derive(Debug, Clone, PartialEq)]
enum Screen {
    Blank,
    Landing,
    Results,
    Document(String),
    Blocked(String),
}

#[derive(Debug, Clone)]
enum FakeElement {
    AdvancedSearch,
    DateStart,
    DateEnd,
    SearchButton,
    PageSize,
    Option(String),
    NextPage { enabled: bool },
}

#[derive(Debug)]
struct PortalState {
    calls: usize,
    sessions_opened: usize,
    sessions_closed: usize,
    screen: Screen,
    date: Option<String>,
    region: Option<String>,
    page: usize,
    cookies_added: usize,
    screenshots: usize,
    /// Set by result-list clicks until the page settles
    loading: bool,
    settles: usize,
    document_visits: HashMap<String, usize>,
}

impl Default for PortalState {
    fn default() -> Self {
        Self {
            calls: 0,
            sessions_opened: 0,
            sessions_closed: 0,
            screen: Screen::Blank,
            date: None,
            region: None,
            page: 0,
            cookies_added: 0,
            screenshots: 0,
            loading: false,
            settles: 0,
            document_visits: HashMap::new(),
        }
    }
}

/// A judgment portal scripted page by page
struct ScriptedPortal {
    base_url: String,
    selectors: SelectorConfig,
    regions: Vec<String>,
    /// Result pages per region, each a list of document IDs
    results: HashMap<String, Vec<Vec<String>>>,
    /// Documents answered with a block page on their first visit
    block_first_visit: HashSet<String>,
    /// Documents answered with HTTP 404
    missing_documents: HashSet<String>,
    /// Documents served without a content container
    hollow_documents: HashSet<String>,
    /// Answer every result page with a block page
    block_results: bool,
    /// Number of leading `new_session` calls that fail
    failing_sessions: usize,
    /// Hide the advanced search control
    break_search: bool,
    state: Mutex<PortalState>,
}

impl ScriptedPortal {
    fn new(config: &Config) -> Self {
        Self {
            base_url: config.site.base_url.clone(),
            selectors: config.site.selectors.clone(),
            regions: config.crawl.regions.clone(),
            results: HashMap::new(),
            block_first_visit: HashSet::new(),
            missing_documents: HashSet::new(),
            hollow_documents: HashSet::new(),
            block_results: false,
            failing_sessions: 0,
            break_search: false,
            state: Mutex::new(PortalState::default()),
        }
    }

    fn with_pages(mut self, region: &str, pages: &[&[&str]]) -> Self {
        let pages = pages
            .iter()
            .map(|page| page.iter().map(|id| id.to_string()).collect())
            .collect();
        self.results.insert(region.to_string(), pages);
        self
    }

    fn results_url(&self) -> String {
        format!("{}#list", self.base_url)
    }

    fn touch(&self) -> MutexGuard<'_, PortalState> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state
    }

    fn record_call(&self) {
        self.state.lock().unwrap().calls += 1;
    }

    fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    fn page_count(&self, state: &PortalState) -> usize {
        state
            .region
            .as_ref()
            .and_then(|region| self.results.get(region))
            .map(|pages| pages.len())
            .unwrap_or(1)
    }

    fn results_markup(&self, state: &PortalState) -> String {
        let ids = state
            .region
            .as_ref()
            .and_then(|region| self.results.get(region))
            .and_then(|pages| pages.get(state.page))
            .cloned()
            .unwrap_or_default();

        let items: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<div class="LM_list"><h4><a class="caseName" href="../181107ANFZ0BXSK4/index.html?docId={}">{}</a></h4></div>"#,
                    id,
                    title_for(id)
                )
            })
            .collect();

        format!("<html><body><div id=\"list\">{}</div></body></html>", items)
    }
}

fn title_for(id: &str) -> String {
    format!("案例{}民事判决书", id)
}

fn document_markup(id: &str) -> String {
    format!(
        r##"<html><body>
        <div class="gaiyao_center"><h4>案由：<a href="#">合同纠纷</a></h4></div>
        <div class="PDF_pox">
            <div>北京市第一中级人民法院</div>
            <div>民事判决书</div>
            <div>（2024）京01民初{id}号</div>
            <div>原告张三，男。</div>
            <div>被告李四，男。</div>
            <div>本院认为，双方合同合法有效。</div>
            <div>判决如下：</div>
            <div>驳回原告诉讼请求。</div>
            <div>审判员王五</div>
            <div>二〇二四年三月一日</div>
        </div>
        </body></html>"##,
        id = id
    )
}

fn hollow_document_markup(id: &str) -> String {
    format!(
        "<html><body><div class=\"gaiyao_center\"><h4>{}</h4></div></body></html>",
        title_for(id)
    )
}

fn doc_id(url: &str) -> Option<String> {
    url.split("docId=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .map(|id| id.to_string())
}

#[async_trait]
impl BrowserDriver for ScriptedPortal {
    type Session = u32;
    type Element = FakeElement;

    async fn new_session(&self, _profile: &FingerprintProfile, _cookies: &[Cookie]) -> DriverResult<u32> {
        let mut state = self.touch();
        state.sessions_opened += 1;
        if state.sessions_opened <= self.failing_sessions {
            return Err(DriverError::Launch("browser exited during startup".to_string()));
        }
        state.screen = Screen::Blank;
        state.region = None;
        state.date = None;
        state.page = 0;
        Ok(state.sessions_opened as u32)
    }

    async fn navigate(
        &self,
        _session: &u32,
        url: &str,
        _wait: WaitPolicy,
        _timeout: Duration,
    ) -> DriverResult<Navigation> {
        let mut state = self.touch();

        if url == self.base_url {
            state.screen = Screen::Landing;
        } else if url == self.results_url() {
            state.screen = Screen::Results;
        } else if let Some(id) = doc_id(url) {
            let visits = {
                let visits = state.document_visits.entry(id.clone()).or_insert(0);
                *visits += 1;
                *visits
            };
            if self.missing_documents.contains(&id) {
                return Ok(Navigation {
                    status: 404,
                    final_url: url.to_string(),
                });
            }
            state.screen = if self.block_first_visit.contains(&id) && visits == 1 {
                Screen::Blocked(id)
            } else {
                Screen::Document(id)
            };
        } else {
            return Ok(Navigation {
                status: 404,
                final_url: url.to_string(),
            });
        }

        Ok(Navigation {
            status: 200,
            final_url: url.to_string(),
        })
    }

    async fn query_one(&self, session: &u32, selector: &str) -> DriverResult<Option<FakeElement>> {
        Ok(self.query_all(session, selector).await?.into_iter().next())
    }

    async fn query_all(&self, _session: &u32, selector: &str) -> DriverResult<Vec<FakeElement>> {
        let state = self.touch();
        let s = &self.selectors;

        let elements = if selector == s.advanced_search {
            if self.break_search {
                vec![]
            } else {
                vec![FakeElement::AdvancedSearch]
            }
        } else if selector == s.date_start {
            vec![FakeElement::DateStart]
        } else if selector == s.date_end {
            vec![FakeElement::DateEnd]
        } else if selector == s.search_button {
            vec![FakeElement::SearchButton]
        } else if selector == s.page_size {
            vec![FakeElement::PageSize]
        } else if selector == s.region_options {
            self.regions.iter().cloned().map(FakeElement::Option).collect()
        } else if selector == s.next_page && state.screen == Screen::Results {
            vec![FakeElement::NextPage {
                enabled: state.page + 1 < self.page_count(&state),
            }]
        } else {
            vec![]
        };

        Ok(elements)
    }

    async fn click(&self, element: &FakeElement) -> DriverResult<()> {
        let mut state = self.touch();
        match element {
            FakeElement::SearchButton if state.date.is_some() => {
                state.screen = Screen::Results;
                state.page = 0;
                state.loading = true;
            }
            FakeElement::Option(region) => {
                state.region = Some(region.clone());
                state.page = 0;
            }
            FakeElement::NextPage { enabled: true } => {
                state.page += 1;
                state.loading = true;
            }
            _ => {}
        }
        Ok(())
    }

    async fn fill(&self, element: &FakeElement, text: &str) -> DriverResult<()> {
        let mut state = self.touch();
        if matches!(element, FakeElement::DateStart | FakeElement::DateEnd) {
            state.date = Some(text.to_string());
        }
        Ok(())
    }

    async fn select_option(&self, _element: &FakeElement, _value: &str) -> DriverResult<()> {
        self.record_call();
        Ok(())
    }

    async fn scroll_into_view(&self, _element: &FakeElement) -> DriverResult<()> {
        self.record_call();
        Ok(())
    }

    async fn text(&self, element: &FakeElement) -> DriverResult<String> {
        self.record_call();
        Ok(match element {
            FakeElement::Option(name) => format!(" {} ", name),
            FakeElement::NextPage { .. } => "下一页".to_string(),
            _ => String::new(),
        })
    }

    async fn attribute(&self, element: &FakeElement, name: &str) -> DriverResult<Option<String>> {
        self.record_call();
        Ok(match (element, name) {
            (FakeElement::NextPage { enabled: true }, "class") => Some("pageButton".to_string()),
            (FakeElement::NextPage { enabled: false }, "class") => {
                Some("pageButton disabled".to_string())
            }
            _ => None,
        })
    }

    async fn wait_for_idle(&self, _session: &u32, _timeout: Duration) -> DriverResult<()> {
        let mut state = self.touch();
        state.loading = false;
        state.settles += 1;
        Ok(())
    }

    async fn content(&self, _session: &u32) -> DriverResult<String> {
        let state = self.touch();
        Ok(match &state.screen {
            Screen::Blank => String::new(),
            Screen::Landing => "<html><head><title>裁判文书网</title></head><body>裁判文书网</body></html>".to_string(),
            Screen::Results if self.block_results => {
                "<html><body><p>访问过于频繁，请稍后再试</p></body></html>".to_string()
            }
            Screen::Results if state.loading => "<html><body><div id=\"list\"></div></body></html>".to_string(),
            Screen::Results => self.results_markup(&state),
            Screen::Document(id) if self.hollow_documents.contains(id) => hollow_document_markup(id),
            Screen::Document(id) => document_markup(id),
            Screen::Blocked(_) => "<html><body><p>请输入验证码</p></body></html>".to_string(),
        })
    }

    async fn title(&self, _session: &u32) -> DriverResult<String> {
        self.record_call();
        Ok("裁判文书网".to_string())
    }

    async fn current_url(&self, _session: &u32) -> DriverResult<String> {
        let state = self.touch();
        Ok(match &state.screen {
            Screen::Document(id) | Screen::Blocked(id) => format!("{}?docId={}", DOC_PATH, id),
            Screen::Results => self.results_url(),
            _ => self.base_url.clone(),
        })
    }

    async fn cookies(&self, _session: &u32) -> DriverResult<Vec<Cookie>> {
        self.record_call();
        Ok(Vec::new())
    }

    async fn add_cookies(&self, _session: &u32, cookies: &[Cookie]) -> DriverResult<()> {
        let mut state = self.touch();
        state.cookies_added += cookies.len();
        Ok(())
    }

    async fn screenshot(&self, _session: &u32, _path: &Path) -> DriverResult<()> {
        let mut state = self.touch();
        state.screenshots += 1;
        Ok(())
    }

    async fn close(&self, _session: u32) -> DriverResult<()> {
        let mut state = self.touch();
        state.sessions_closed += 1;
        state.screen = Screen::Blank;
        Ok(())
    }
}

fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn crawl_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// Creates a test configuration writing everything under `dir`
fn create_test_config(dir: &Path, regions: &[&str], max_pages: u32, extra: &str) -> Config {
    let regions: Vec<String> = regions.iter().map(|r| format!("\"{}\"", r)).collect();
    let toml = format!(
        r#"
[crawl]
regions = [{regions}]
start-date = "2024-03-01"
end-date = "2024-03-01"
max-pages = {max_pages}

[identity]
cookie-header = "SESSION=abc123; wzws_cid=xyz"

[output]
url-dir = "{dir}/urls"
doc-dir = "{dir}/docs"
database-path = "{dir}/ledger.db"
summary-path = "{dir}/summary.md"
{extra}
"#,
        regions = regions.join(", "),
        max_pages = max_pages,
        dir = dir.display().to_string().replace('\\', "/"),
        extra = extra,
    );
    parse_config(&toml).expect("test config should be valid")
}

/// Never waits, and skips everything in one scope
struct AlwaysSkip(SkipScope);

impl PacingPolicy for AlwaysSkip {
    fn delay_for(&self, _kind: ActionKind) -> Duration {
        Duration::ZERO
    }

    fn cooldown(&self) -> Duration {
        Duration::ZERO
    }

    fn should_skip(&self, scope: SkipScope) -> bool {
        scope == self.0
    }
}

fn coordinator(
    config: &Config,
    portal: ScriptedPortal,
    shutdown: Shutdown,
) -> Coordinator<ScriptedPortal, NoDelay, FixedClock> {
    coordinator_with(config, portal, NoDelay, shutdown)
}

fn coordinator_with<P: PacingPolicy>(
    config: &Config,
    portal: ScriptedPortal,
    policy: P,
    shutdown: Shutdown,
) -> Coordinator<ScriptedPortal, P, FixedClock> {
    Coordinator::new(
        config.clone(),
        "test-hash".to_string(),
        portal,
        policy,
        FixedClock(noon()),
        shutdown,
    )
    .expect("coordinator should initialize")
}

fn two_region_portal(config: &Config) -> ScriptedPortal {
    ScriptedPortal::new(config)
        .with_pages("北京市", &[&["A", "B"], &["B", "C"], &["D"]])
        .with_pages("上海市", &[&["C", "E"]])
}

async fn run<P: PacingPolicy>(coordinator: &mut Coordinator<ScriptedPortal, P, FixedClock>) -> RunSummary {
    coordinator.run().await.expect("run should succeed")
}

#[tokio::test]
async fn test_full_crawl_collects_and_saves_documents() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市", "上海市"], 5, "");

    let mut coordinator = coordinator(&config, two_region_portal(&config), Shutdown::new());
    let summary = run(&mut coordinator).await;

    assert!(!summary.interrupted);
    assert_eq!(summary.units_total, 2);
    assert_eq!(summary.count(UnitStatus::Completed), 2);
    assert_eq!(summary.documents.links_found, 5);
    assert_eq!(summary.documents.documents_saved, 5);
    assert_eq!(summary.documents.documents_failed, 0);

    // Each document URL appears in exactly one link list
    let store = coordinator.store();
    let beijing = store
        .read_link_list(&CrawlUnit::new(crawl_date(), "北京市", None))
        .unwrap();
    let shanghai = store
        .read_link_list(&CrawlUnit::new(crawl_date(), "上海市", None))
        .unwrap();
    assert_eq!(beijing.len(), 4);
    assert_eq!(shanghai, vec![format!("{}?docId=E", DOC_PATH)]);

    let all: HashSet<_> = beijing.iter().chain(shanghai.iter()).collect();
    assert_eq!(all.len(), 5);

    // Document files carry the header block and a cleaned body
    let doc_path = dir
        .path()
        .join("docs")
        .join("2024-03-01")
        .join(format!("{}.txt", title_for("A")));
    let text = std::fs::read_to_string(doc_path).unwrap();
    assert!(text.starts_with(&format!("# Title: {}\n", title_for("A"))));
    assert!(text.contains("# Case number: （2024）京01民初A号\n"));
    assert!(text.contains("# Case category: 合同纠纷\n"));
    assert!(text.contains(&format!("# Source URL: {}?docId=A\n", DOC_PATH)));
    assert!(text.contains("\n\n原告张三，男。\n"));

    // Every session was closed and the identity cookies were installed
    let state = coordinator.driver().state.lock().unwrap();
    assert_eq!(state.sessions_opened, 2);
    assert_eq!(state.sessions_closed, 2);
    assert_eq!(state.cookies_added, 4);
}

#[tokio::test]
async fn test_second_run_makes_no_driver_calls() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市", "上海市"], 5, "");

    let mut first = coordinator(&config, two_region_portal(&config), Shutdown::new());
    run(&mut first).await;

    let doc_path = dir
        .path()
        .join("docs")
        .join("2024-03-01")
        .join(format!("{}.txt", title_for("C")));
    let before = std::fs::read_to_string(&doc_path).unwrap();

    let mut second = coordinator(&config, two_region_portal(&config), Shutdown::new());
    let summary = run(&mut second).await;

    assert_eq!(summary.count(UnitStatus::AlreadyDone), 2);
    assert_eq!(summary.documents.documents_saved, 0);
    assert_eq!(second.driver().calls(), 0);
    assert_eq!(std::fs::read_to_string(&doc_path).unwrap(), before);

    let files = std::fs::read_dir(dir.path().join("docs").join("2024-03-01"))
        .unwrap()
        .count();
    assert_eq!(files, 5);
}

#[tokio::test]
async fn test_pagination_stops_at_max_pages_when_pages_are_empty() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市"], 3, "");

    let empty_pages: Vec<&[&str]> = vec![&[]; 50];
    let portal = ScriptedPortal::new(&config).with_pages("北京市", &empty_pages);

    let mut coordinator = coordinator(&config, portal, Shutdown::new());
    let summary = run(&mut coordinator).await;

    assert_eq!(summary.count(UnitStatus::Empty), 1);
    assert_eq!(summary.documents.pages_visited, 3);

    // Empty units leave no resume markers behind
    let unit = CrawlUnit::new(crawl_date(), "北京市", None);
    assert!(!coordinator.store().is_unit_complete(&unit));
    assert!(!coordinator.store().link_list_path(&unit).exists());
}

#[tokio::test]
async fn test_last_page_ends_pagination() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市"], 40, "");
    let portal = ScriptedPortal::new(&config).with_pages("北京市", &[&["A"], &["B"]]);

    let mut coordinator = coordinator(&config, portal, Shutdown::new());
    let summary = run(&mut coordinator).await;

    assert_eq!(summary.count(UnitStatus::Completed), 1);
    assert_eq!(summary.documents.pages_visited, 2);
    assert_eq!(summary.documents.documents_saved, 2);

    // The list settled after the search and after the page change
    let state = coordinator.driver().state.lock().unwrap();
    assert_eq!(state.settles, 2);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_block_page_triggers_cooldown_and_retry() {
    let dir = TempDir::new().unwrap();
    let extra = format!(
        "\n[browser]\nscreenshot-dir = \"{}/shots\"\n",
        dir.path().display().to_string().replace('\\', "/")
    );
    let config = create_test_config(dir.path(), &["北京市"], 5, &extra);

    let mut portal = ScriptedPortal::new(&config).with_pages("北京市", &[&["A", "B"]]);
    portal.block_first_visit.insert("B".to_string());

    let mut coordinator = coordinator(&config, portal, Shutdown::new());
    let summary = run(&mut coordinator).await;

    assert_eq!(summary.count(UnitStatus::Completed), 1);
    assert_eq!(summary.documents.documents_saved, 2);
    assert_eq!(summary.documents.documents_failed, 0);

    let state = coordinator.driver().state.lock().unwrap();
    assert_eq!(state.screenshots, 1);
    assert_eq!(state.document_visits.get("B"), Some(&2));
}

#[tokio::test]
async fn test_search_failure_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市", "上海市"], 5, "");

    let mut portal = two_region_portal(&config);
    portal.break_search = true;

    let mut coordinator = coordinator(&config, portal, Shutdown::new());
    let summary = run(&mut coordinator).await;

    assert!(!summary.interrupted);
    assert_eq!(summary.count(UnitStatus::SearchFailed), 2);
    assert_eq!(summary.documents.links_found, 0);

    let state = coordinator.driver().state.lock().unwrap();
    assert_eq!(state.sessions_opened, 2);
    assert_eq!(state.sessions_closed, 2);
}

#[tokio::test]
async fn test_shutdown_before_start_interrupts_run() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市", "上海市"], 5, "");

    let shutdown = Shutdown::new();
    shutdown.trigger();

    let mut coordinator = coordinator(&config, two_region_portal(&config), shutdown);
    let summary = run(&mut coordinator).await;

    assert!(summary.interrupted);
    assert_eq!(coordinator.driver().calls(), 0);

    let ledger = open_ledger(Path::new(&config.output.database_path)).unwrap();
    let latest = ledger.get_latest_run().unwrap().unwrap();
    assert_eq!(latest.status, RunStatus::Interrupted);
}

#[tokio::test]
async fn test_ledger_journals_units() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市", "上海市"], 5, "");

    let mut coordinator = coordinator(&config, two_region_portal(&config), Shutdown::new());
    let summary = run(&mut coordinator).await;
    let run_id = summary.run_id.expect("ledger should be available");

    let ledger = open_ledger(Path::new(&config.output.database_path)).unwrap();
    let run = ledger.get_run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");

    let units = ledger.units_for_run(run_id).unwrap();
    assert_eq!(units.len(), 2);
    assert!(units.iter().all(|unit| unit.status == UnitStatus::Completed));
    assert_eq!(ledger.document_totals().unwrap().saved, 5);
}

#[tokio::test]
async fn test_session_failure_abandons_unit_and_run_continues() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市", "上海市"], 5, "");

    let mut portal = two_region_portal(&config);
    portal.failing_sessions = 1;

    let mut coordinator = coordinator(&config, portal, Shutdown::new());
    let summary = run(&mut coordinator).await;

    assert!(!summary.interrupted);
    assert_eq!(summary.count(UnitStatus::Abandoned), 1);
    assert_eq!(summary.count(UnitStatus::Completed), 1);

    // The abandoned unit stays resumable
    let beijing = CrawlUnit::new(crawl_date(), "北京市", None);
    let shanghai = CrawlUnit::new(crawl_date(), "上海市", None);
    assert!(!coordinator.store().link_list_path(&beijing).exists());
    assert!(coordinator.store().is_unit_complete(&shanghai));
}

#[tokio::test]
async fn test_document_failures_are_counted_and_unit_completes() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市"], 5, "");

    let mut portal = ScriptedPortal::new(&config).with_pages("北京市", &[&["A", "B", "C"]]);
    portal.missing_documents.insert("A".to_string());
    portal.hollow_documents.insert("B".to_string());

    let mut coordinator = coordinator(&config, portal, Shutdown::new());
    let summary = run(&mut coordinator).await;

    assert_eq!(summary.count(UnitStatus::Completed), 1);
    assert_eq!(summary.documents.links_found, 3);
    assert_eq!(summary.documents.documents_saved, 1);
    assert_eq!(summary.documents.documents_failed, 2);

    let folder = dir.path().join("docs").join("2024-03-01");
    assert!(folder.join(format!("{}.txt", title_for("C"))).exists());
    assert!(!folder.join(format!("{}.txt", title_for("A"))).exists());
    assert!(!folder.join(format!("{}.txt", title_for("B"))).exists());

    // Failed documents are still listed, and neither was fetched twice
    let unit = CrawlUnit::new(crawl_date(), "北京市", None);
    assert_eq!(coordinator.store().read_link_list(&unit).unwrap().len(), 3);
    let state = coordinator.driver().state.lock().unwrap();
    assert_eq!(state.document_visits.get("A"), Some(&1));
    assert_eq!(state.document_visits.get("B"), Some(&1));
}

#[tokio::test]
async fn test_persistent_block_abandons_unit_without_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市"], 5, "");

    let mut portal = ScriptedPortal::new(&config).with_pages("北京市", &[&["A", "B"]]);
    portal.block_results = true;

    let mut coordinator = coordinator(&config, portal, Shutdown::new());
    let summary = run(&mut coordinator).await;
    let run_id = summary.run_id.expect("ledger should be available");

    assert!(!summary.interrupted);
    assert_eq!(summary.count(UnitStatus::Abandoned), 1);
    assert_eq!(summary.documents.links_found, 0);

    let unit = CrawlUnit::new(crawl_date(), "北京市", None);
    assert!(!coordinator.store().link_list_path(&unit).exists());
    assert!(!coordinator.store().date_folder(crawl_date()).exists());

    {
        let state = coordinator.driver().state.lock().unwrap();
        assert!(state.document_visits.is_empty());
        assert_eq!(state.sessions_closed, 1);
    }

    let ledger = open_ledger(Path::new(&config.output.database_path)).unwrap();
    let units = ledger.units_for_run(run_id).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].status, UnitStatus::Abandoned);
}

#[tokio::test]
async fn test_skipped_units_leave_no_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市", "上海市"], 5, "");

    let mut coordinator = coordinator_with(
        &config,
        two_region_portal(&config),
        AlwaysSkip(SkipScope::Unit),
        Shutdown::new(),
    );
    let summary = run(&mut coordinator).await;
    let run_id = summary.run_id.expect("ledger should be available");

    assert_eq!(summary.count(UnitStatus::Skipped), 2);
    assert_eq!(coordinator.driver().calls(), 0);

    for region in ["北京市", "上海市"] {
        let unit = CrawlUnit::new(crawl_date(), region, None);
        assert!(!coordinator.store().link_list_path(&unit).exists());
    }

    let ledger = open_ledger(Path::new(&config.output.database_path)).unwrap();
    let units = ledger.units_for_run(run_id).unwrap();
    assert!(units.iter().all(|unit| unit.status == UnitStatus::Skipped));
}

#[tokio::test]
async fn test_skipped_documents_are_not_failures() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &["北京市"], 5, "");
    let portal = ScriptedPortal::new(&config).with_pages("北京市", &[&["A", "B"]]);

    let mut coordinator = coordinator_with(
        &config,
        portal,
        AlwaysSkip(SkipScope::Document),
        Shutdown::new(),
    );
    let summary = run(&mut coordinator).await;

    assert_eq!(summary.count(UnitStatus::Completed), 1);
    assert_eq!(summary.documents.links_found, 2);
    assert_eq!(summary.documents.documents_skipped, 2);
    assert_eq!(summary.documents.documents_saved, 0);
    assert_eq!(summary.documents.documents_failed, 0);
    assert!(coordinator.driver().state.lock().unwrap().document_visits.is_empty());
}
